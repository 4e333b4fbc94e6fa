//! Stencil - a headless CMS core with a composable content model.
//!
//! Administrators author reusable field schemas ("blueprints") and let
//! blueprints embed other blueprints ("components"). The composition engine
//! in [`schema`] maintains the embed dependency graph, rejects cycles and
//! field-path collisions before anything is written, and materializes
//! embedded blueprints into read-only field copies that carry provenance
//! back to their ultimate source.
//!
//! The crate is synchronous by design: every composition operation runs to
//! completion inside the caller-supplied transaction boundary, and all
//! validation happens before the first write.

pub mod config;
pub mod db_operations;
pub mod error;
pub mod schema;

pub use config::StencilConfig;
pub use db_operations::DbOperations;
pub use error::{StencilError, StencilResult};
pub use schema::composer::SchemaComposer;
pub use schema::{
    Blueprint, BlueprintKind, BlueprintUpdate, DeleteCheck, Embed, FieldNode, FieldOrigin,
    FieldType, FieldUpdate, NewBlueprint, NewField, Provenance, ScalarType, SchemaError,
};
