//! The materialization engine: flattens an embedded blueprint's transitive
//! field set and writes read-only copies under the host anchor.
//!
//! `materialize` is the sole writer of provenance-tagged fields. It is
//! idempotent and total: the whole flattened copy set (including the depth
//! guard) is computed and validated before the first delete or insert, so a
//! failed run leaves zero writes behind.

use crate::db_operations::DbOperations;
use crate::schema::field_tree::FieldTree;
use crate::schema::types::{Embed, FieldNode, FieldOrigin, Provenance, SchemaError};
use chrono::Utc;
use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Joins a path prefix and a relative path with a dot; bare at root.
pub(crate) fn join_path(prefix: &str, rest: &str) -> String {
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{}.{}", prefix, rest)
    }
}

/// One entry of a flattened blueprint: the field copy to create, addressed
/// relative to the embed anchor, with its ultimate source.
#[derive(Debug, Clone)]
pub struct FlatField {
    pub relative_path: String,
    /// Relative path of the parent entry; `None` for entries that sit
    /// directly on the anchor.
    pub relative_parent: Option<String>,
    /// The authored source field whose attributes the copy inherits.
    pub template: FieldNode,
    /// Ultimate source, never an intermediate re-export.
    pub source_blueprint_id: Uuid,
    pub source_field_id: Uuid,
}

/// Replaces one blueprint's persisted field set during flattening, so a
/// prospective structural change can be simulated without writing it.
pub struct FieldOverlay<'a> {
    pub blueprint_id: Uuid,
    pub fields: &'a [FieldNode],
}

pub struct Materializer<'a> {
    db: &'a DbOperations,
    max_depth: usize,
}

impl<'a> Materializer<'a> {
    pub fn new(db: &'a DbOperations, max_depth: usize) -> Self {
        Self { db, max_depth }
    }

    /// Flattens a blueprint: its own authored fields plus, recursively,
    /// everything its embeds introduce, as a single relative-path list.
    pub fn flatten(&self, blueprint_id: Uuid) -> Result<Vec<FlatField>, SchemaError> {
        self.flatten_with(blueprint_id, None, None)
    }

    /// `flatten`, with one blueprint's field set replaced by an overlay
    /// and/or one prospective embed edge treated as if it were already
    /// persisted. Both hooks exist so validators can simulate a structural
    /// change or a new edge without writing either.
    ///
    /// Expansion runs over an explicit worklist of (blueprint, prefix,
    /// depth) entries rather than call-stack recursion, so the depth guard
    /// is exact and deep compositions cannot overflow the stack. Copies
    /// already materialized inside visited blueprints are skipped; their
    /// sources are re-expanded instead, which is what keeps provenance
    /// pointing at the ultimate origin.
    pub fn flatten_with(
        &self,
        blueprint_id: Uuid,
        overlay: Option<&FieldOverlay<'_>>,
        extra_edge: Option<&Embed>,
    ) -> Result<Vec<FlatField>, SchemaError> {
        let mut out = Vec::new();
        let mut work: VecDeque<(Uuid, String, usize)> = VecDeque::new();
        work.push_back((blueprint_id, String::new(), 1));

        while let Some((bp, prefix, depth)) = work.pop_front() {
            if depth > self.max_depth {
                return Err(SchemaError::MaxDepthExceeded {
                    max: self.max_depth,
                });
            }

            let fields = match overlay {
                Some(o) if o.blueprint_id == bp => o.fields.to_vec(),
                _ => self.db.list_fields(bp)?,
            };
            let tree = FieldTree::from_fields(fields);

            for node in tree.iter_top_down() {
                if node.is_readonly() {
                    continue;
                }
                let relative_parent = match node.parent_id.and_then(|pid| tree.get(pid)) {
                    Some(parent) => Some(join_path(&prefix, &parent.full_path)),
                    None if prefix.is_empty() => None,
                    None => Some(prefix.clone()),
                };
                out.push(FlatField {
                    relative_path: join_path(&prefix, &node.full_path),
                    relative_parent,
                    template: node.clone(),
                    source_blueprint_id: bp,
                    source_field_id: node.id,
                });
            }

            let mut nested_edges = self.db.list_embeds_for_host(bp)?;
            if let Some(extra) = extra_edge {
                if extra.host_blueprint_id == bp {
                    nested_edges.push(extra.clone());
                }
            }
            for nested in nested_edges {
                let nested_prefix = match nested.anchor_field_id {
                    Some(anchor_id) => {
                        let anchor = tree.get(anchor_id).ok_or_else(|| {
                            SchemaError::InvalidData(format!(
                                "embed {} anchor field {} is missing from blueprint {}",
                                nested.id, anchor_id, bp
                            ))
                        })?;
                        join_path(&prefix, &anchor.full_path)
                    }
                    None => prefix.clone(),
                };
                work.push_back((nested.embedded_blueprint_id, nested_prefix, depth + 1));
            }
        }

        Ok(out)
    }

    /// Re-derives the copy set for one embed edge: soft-deletes every host
    /// field owned by the edge, then recreates the flattened set under the
    /// anchor. Calling it twice without intervening changes yields the same
    /// paths and provenance.
    pub fn materialize(&self, embed: &Embed) -> Result<(), SchemaError> {
        let host = self.db.get_blueprint_required(embed.host_blueprint_id)?;

        // Everything below is computed before the first write.
        let mut flat = self.flatten(embed.embedded_blueprint_id)?;
        flat.sort_by(|a, b| {
            let da = a.relative_path.matches('.').count();
            let db_ = b.relative_path.matches('.').count();
            da.cmp(&db_).then_with(|| a.relative_path.cmp(&b.relative_path))
        });

        let host_fields = self.db.list_fields(host.id)?;
        let host_tree = FieldTree::from_fields(host_fields.clone());
        let anchor_path = match embed.anchor_field_id {
            Some(anchor_id) => {
                let anchor = host_tree.get(anchor_id).ok_or_else(|| {
                    SchemaError::NotFound(format!("anchor field {} in host {}", anchor_id, host.id))
                })?;
                Some(anchor.full_path.clone())
            }
            None => None,
        };
        let anchor_prefix = anchor_path.as_deref().unwrap_or("");

        // Step 1: drop the edge's previous copies.
        let mut dropped = 0usize;
        for field in &host_fields {
            let owned = field
                .provenance()
                .map(|p| p.owning_embed_id == embed.id)
                .unwrap_or(false);
            if owned {
                self.db.soft_delete_field(field)?;
                dropped += 1;
            }
        }

        // Step 2/3: create fresh copies, parents first.
        let mut created: HashMap<String, Uuid> = HashMap::new();
        let now = Utc::now();
        for entry in &flat {
            let parent_id = match &entry.relative_parent {
                Some(rel) => Some(*created.get(rel).ok_or_else(|| {
                    SchemaError::InvalidData(format!(
                        "materialization of embed {} lost parent entry '{}'",
                        embed.id, rel
                    ))
                })?),
                None => embed.anchor_field_id,
            };

            let copy = FieldNode {
                id: Uuid::new_v4(),
                blueprint_id: host.id,
                parent_id,
                name: entry.template.name.clone(),
                full_path: join_path(anchor_prefix, &entry.relative_path),
                field_type: entry.template.field_type,
                required: entry.template.required,
                indexed: entry.template.indexed,
                cardinality: entry.template.cardinality,
                validations: entry.template.validations.clone(),
                ui: entry.template.ui.clone(),
                origin: FieldOrigin::Materialized(Provenance {
                    source_blueprint_id: entry.source_blueprint_id,
                    source_field_id: entry.source_field_id,
                    owning_embed_id: embed.id,
                }),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            self.db.store_field(&copy)?;
            created.insert(entry.relative_path.clone(), copy.id);
        }

        debug!(
            "materialized embed {}: dropped {} stale copies",
            embed.id, dropped
        );
        info!(
            "materialized {} fields from blueprint {} into host '{}'",
            flat.len(),
            embed.embedded_blueprint_id,
            host.code
        );
        Ok(())
    }
}
