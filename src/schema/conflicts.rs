//! Field-path conflict validation.
//!
//! Every check reuses the materializer's own flattening, so the paths the
//! validator simulates and the paths materialization later writes cannot
//! disagree, and all of them see through arbitrarily nested composition.

use crate::db_operations::DbOperations;
use crate::schema::field_tree::FieldTree;
use crate::schema::graph::DependencyGraph;
use crate::schema::materializer::{join_path, FieldOverlay, Materializer};
use crate::schema::types::{Blueprint, Embed, FieldNode, SchemaError};
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

pub struct ConflictValidator<'a> {
    db: &'a DbOperations,
    materializer: Materializer<'a>,
}

impl<'a> ConflictValidator<'a> {
    pub fn new(db: &'a DbOperations, max_depth: usize) -> Self {
        Self {
            db,
            materializer: Materializer::new(db, max_depth),
        }
    }

    /// Rejects a prospective embed of `embedded` into `host` under
    /// `anchor_full_path` (or at host root) when any introduced path,
    /// including paths inherited through the embedded blueprint's own
    /// transitive embeds, collides with an existing live field of the
    /// host. Runs before the edge is persisted.
    pub fn validate_no_conflicts(
        &self,
        embedded: &Blueprint,
        host: &Blueprint,
        anchor_full_path: Option<&str>,
    ) -> Result<(), SchemaError> {
        let flat = self.materializer.flatten(embedded.id)?;
        let host_paths = FieldTree::from_fields(self.db.list_fields(host.id)?).paths();

        let prefix = anchor_full_path.unwrap_or("");
        for entry in &flat {
            let candidate = join_path(prefix, &entry.relative_path);
            if host_paths.contains(&candidate) {
                return Err(SchemaError::PathConflict {
                    path: candidate,
                    host: host.code.clone(),
                    embedded: embedded.code.clone(),
                });
            }
        }
        Ok(())
    }

    /// Full pre-write validation for a prospective embed edge: the direct
    /// host check above, plus a re-materialization simulation of every
    /// host further up the chain. An edge that is collision-free inside
    /// its own host can still introduce a path that a grandparent host
    /// re-exports onto one of its existing fields; the sweep after the
    /// write would then persist two live fields with the same `full_path`,
    /// so the collision has to be caught here.
    pub fn validate_new_embed(
        &self,
        host: &Blueprint,
        embedded: &Blueprint,
        anchor_full_path: Option<&str>,
        prospective: &Embed,
        graph: &DependencyGraph,
    ) -> Result<(), SchemaError> {
        self.validate_no_conflicts(embedded, host, anchor_full_path)?;
        self.validate_dependent_hosts(host.id, None, Some(prospective), graph)
    }

    /// Simulates replacing `blueprint_id`'s field set with `proposed` and
    /// verifies every dependent host would still re-materialize without a
    /// collision. Used by field create/rename so a deep, transitive
    /// conflict is caught before anything is written.
    pub fn validate_structural_change(
        &self,
        blueprint_id: Uuid,
        proposed: &[FieldNode],
        graph: &DependencyGraph,
    ) -> Result<(), SchemaError> {
        let overlay = FieldOverlay {
            blueprint_id,
            fields: proposed,
        };
        self.validate_dependent_hosts(blueprint_id, Some(&overlay), None, graph)
    }

    /// Re-flattens every embed whose embedded side lies in
    /// {changed} ∪ all_dependents(changed), grouped per host, and checks
    /// the result against the host paths that would survive the
    /// re-materialization sweep. Exactly the edge set the facade's sweep
    /// will rewrite afterwards.
    fn validate_dependent_hosts(
        &self,
        changed: Uuid,
        overlay: Option<&FieldOverlay<'_>>,
        extra_edge: Option<&Embed>,
        graph: &DependencyGraph,
    ) -> Result<(), SchemaError> {
        let mut affected: BTreeSet<Uuid> = graph.all_dependents(changed);
        affected.insert(changed);

        let embeds = self.db.list_embeds()?;
        let mut by_host: HashMap<Uuid, Vec<&Embed>> = HashMap::new();
        for embed in &embeds {
            if affected.contains(&embed.embedded_blueprint_id) {
                by_host
                    .entry(embed.host_blueprint_id)
                    .or_default()
                    .push(embed);
            }
        }

        for (host_id, host_embeds) in &by_host {
            let host = self.db.get_blueprint_required(*host_id)?;
            let host_fields = self.db.list_fields(*host_id)?;
            let host_tree = FieldTree::from_fields(host_fields.clone());
            let replaced: HashSet<Uuid> = host_embeds.iter().map(|e| e.id).collect();

            // Paths that survive the sweep untouched: authored fields plus
            // copies owned by embeds outside the affected set.
            let mut seen: HashSet<String> = host_fields
                .iter()
                .filter(|f| {
                    !f.provenance()
                        .map(|p| replaced.contains(&p.owning_embed_id))
                        .unwrap_or(false)
                })
                .map(|f| f.full_path.clone())
                .collect();

            for embed in host_embeds {
                let anchor_prefix = match embed.anchor_field_id {
                    Some(anchor_id) => host_tree
                        .get(anchor_id)
                        .map(|a| a.full_path.clone())
                        .ok_or_else(|| {
                            SchemaError::InvalidData(format!(
                                "embed {} anchor field {} is missing from host {}",
                                embed.id, anchor_id, host_id
                            ))
                        })?,
                    None => String::new(),
                };
                let embedded = self.db.get_blueprint_required(embed.embedded_blueprint_id)?;
                let flat = self.materializer.flatten_with(
                    embed.embedded_blueprint_id,
                    overlay,
                    extra_edge,
                )?;
                for entry in &flat {
                    let candidate = join_path(&anchor_prefix, &entry.relative_path);
                    if !seen.insert(candidate.clone()) {
                        return Err(SchemaError::PathConflict {
                            path: candidate,
                            host: host.code.clone(),
                            embedded: embedded.code.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
