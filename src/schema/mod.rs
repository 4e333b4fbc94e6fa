//! The schema composition core.
//!
//! Split the way the concerns stack up: `types` is the data model,
//! `field_tree` the arena view over one blueprint's fields, `graph` the
//! pure read layer over embed edges, `cycles`/`conflicts` the two gate
//! validators, `materializer` the flatten-and-copy engine, and `composer`
//! the facade that drives them in order.

pub mod composer;
pub mod conflicts;
pub mod cycles;
pub mod field_tree;
pub mod graph;
pub mod materializer;
pub mod types;

pub use composer::SchemaComposer;
pub use conflicts::ConflictValidator;
pub use cycles::CycleValidator;
pub use field_tree::FieldTree;
pub use graph::DependencyGraph;
pub use materializer::{FlatField, Materializer};
pub use types::{
    Blueprint, BlueprintKind, BlueprintUpdate, DeleteCheck, Embed, FieldNode, FieldOrigin,
    FieldType, FieldUpdate, NewBlueprint, NewField, Provenance, ScalarType, SchemaError,
    ValidationRule,
};
