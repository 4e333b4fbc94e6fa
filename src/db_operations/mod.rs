//! Persistence layer over sled.
//!
//! `DbOperations` holds the database handle plus one cached tree per entity
//! family; the per-entity operation modules add typed accessors on top of
//! the generic serde_json helpers in `core`. Deletion is always a soft
//! delete (the record is rewritten with `deleted_at` set), never a removal.

mod blueprint_operations;
mod core;
mod embed_operations;
mod field_operations;

pub use self::core::DbOperations;
