//! Cyclic dependency validation for prospective embed edges.

use crate::schema::graph::DependencyGraph;
use crate::schema::types::{Blueprint, SchemaError};
use uuid::Uuid;

/// Rejects embed edges that would close a cycle, before anything is
/// persisted. Borrows a graph built from the current live edge set.
pub struct CycleValidator<'a> {
    graph: &'a DependencyGraph,
}

impl<'a> CycleValidator<'a> {
    pub fn new(graph: &'a DependencyGraph) -> Self {
        Self { graph }
    }

    /// Fails with `CyclicDependency` when the host and candidate are the
    /// same blueprint, or when the candidate already depends (directly or
    /// transitively) on the host.
    pub fn ensure_no_cycle(
        &self,
        host: &Blueprint,
        candidate: &Blueprint,
    ) -> Result<(), SchemaError> {
        if self.can_embed(host.id, candidate.id) {
            Ok(())
        } else {
            Err(SchemaError::CyclicDependency {
                host: host.code.clone(),
                embedded: candidate.code.clone(),
            })
        }
    }

    /// Non-throwing predicate form, used to compute "what may I still
    /// embed" listings.
    pub fn can_embed(&self, host_id: Uuid, candidate_id: Uuid) -> bool {
        host_id != candidate_id && !self.graph.has_path_to(candidate_id, host_id)
    }
}
