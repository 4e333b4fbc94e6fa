//! Data model for the composition core: blueprints, fields, embed edges,
//! and the typed validation failures the facade surfaces.

pub mod blueprint;
pub mod embed;
pub mod errors;
pub mod field;

pub use blueprint::{Blueprint, BlueprintKind, BlueprintUpdate, DeleteCheck, NewBlueprint};
pub use embed::Embed;
pub use errors::SchemaError;
pub use field::{
    FieldNode, FieldOrigin, FieldType, FieldUpdate, NewField, Provenance, ScalarType,
    ValidationRule,
};
