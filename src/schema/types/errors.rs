//! Typed validation failures raised by the composition core.
//!
//! Every variant here is caller-recoverable: the facade rejects the
//! operation before any write happens (or, for storage faults, propagates
//! the underlying error unchanged). Nothing in the core panics for these.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// Adding the embed edge would close a cycle (self-embeds included).
    #[error("cyclic dependency: embedding '{embedded}' into '{host}' would close a cycle")]
    CyclicDependency { host: String, embedded: String },

    /// The embed would introduce a field path that already exists in the host.
    #[error("path conflict: '{path}' already exists in '{host}' while embedding '{embedded}'")]
    PathConflict {
        path: String,
        host: String,
        embedded: String,
    },

    /// A composition chain exceeds the configured maximum depth.
    #[error("composition chain exceeds the maximum embed depth of {max}")]
    MaxDepthExceeded { max: usize },

    /// Direct mutation of a materialized (provenance-tagged) field.
    #[error("field '{0}' is a materialized copy and cannot be modified directly")]
    ReadOnlyField(String),

    /// Blueprint deletion blocked; `reasons` is machine-readable.
    #[error("blueprint '{blueprint}' is in use: {}", .reasons.join("; "))]
    SchemaInUse {
        blueprint: String,
        reasons: Vec<String>,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Unexpected persistence failure, propagated unchanged in message form.
    #[error("database error: {0}")]
    Database(String),
}
