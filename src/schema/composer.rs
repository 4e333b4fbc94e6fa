//! Schema composition facade.
//!
//! Single entry point for blueprint, field, and embed CRUD. Every operation
//! follows the same discipline: load state, run every validator, and only
//! then write. The read-only invariant on materialized fields is enforced
//! here through one guard (`ensure_authored`) called by every field
//! mutation entry point.

use crate::config::StencilConfig;
use crate::db_operations::DbOperations;
use crate::error::StencilResult;
use crate::schema::conflicts::ConflictValidator;
use crate::schema::cycles::CycleValidator;
use crate::schema::field_tree::FieldTree;
use crate::schema::graph::DependencyGraph;
use crate::schema::materializer::Materializer;
use crate::schema::types::{
    Blueprint, BlueprintKind, BlueprintUpdate, DeleteCheck, Embed, FieldNode, FieldOrigin,
    FieldUpdate, NewBlueprint, NewField, SchemaError,
};
use chrono::Utc;
use log::{debug, info};
use std::collections::BTreeSet;
use uuid::Uuid;

/// The one guard between callers and provenance-tagged fields.
fn ensure_authored(field: &FieldNode) -> Result<(), SchemaError> {
    match &field.origin {
        FieldOrigin::Authored => Ok(()),
        FieldOrigin::Materialized(_) => Err(SchemaError::ReadOnlyField(field.full_path.clone())),
    }
}

fn validate_field_name(name: &str) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::InvalidField(
            "field name cannot be empty".to_string(),
        ));
    }
    if name.contains('.') {
        return Err(SchemaError::InvalidField(format!(
            "field name '{}' must not contain '.'",
            name
        )));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(SchemaError::InvalidField(format!(
            "field name '{}' must not contain whitespace",
            name
        )));
    }
    Ok(())
}

pub struct SchemaComposer {
    db: DbOperations,
    max_embed_depth: usize,
}

impl SchemaComposer {
    /// Opens the store described by the config.
    pub fn new(config: &StencilConfig) -> StencilResult<Self> {
        let db = DbOperations::open(&config.storage_path)?;
        Ok(Self::with_db(db, config.max_embed_depth))
    }

    /// Wraps an already-open store.
    pub fn with_db(db: DbOperations, max_embed_depth: usize) -> Self {
        Self {
            db,
            max_embed_depth,
        }
    }

    pub fn db(&self) -> &DbOperations {
        &self.db
    }

    fn load_graph(&self) -> Result<DependencyGraph, SchemaError> {
        Ok(DependencyGraph::from_edges(&self.db.list_embeds()?))
    }

    fn materializer(&self) -> Materializer<'_> {
        Materializer::new(&self.db, self.max_embed_depth)
    }

    fn conflicts(&self) -> ConflictValidator<'_> {
        ConflictValidator::new(&self.db, self.max_embed_depth)
    }

    // ==================== Blueprints ====================

    pub fn create_blueprint(&self, new: NewBlueprint) -> Result<Blueprint, SchemaError> {
        if new.name.is_empty() {
            return Err(SchemaError::InvalidData(
                "blueprint name cannot be empty".to_string(),
            ));
        }
        if new.code.is_empty() || new.code.chars().any(char::is_whitespace) {
            return Err(SchemaError::InvalidData(format!(
                "blueprint code '{}' must be a non-empty slug",
                new.code
            )));
        }
        if new.entry_type.is_some() && new.kind != BlueprintKind::Full {
            return Err(SchemaError::InvalidData(
                "only full blueprints can back a content-entry type".to_string(),
            ));
        }
        if self.db.get_blueprint_by_code(&new.code, new.kind)?.is_some() {
            return Err(SchemaError::InvalidData(format!(
                "blueprint code '{}' is already taken",
                new.code
            )));
        }

        let mut blueprint = Blueprint::new(new.name, new.code, new.kind);
        blueprint.entry_type = new.entry_type;
        self.db.store_blueprint(&blueprint)?;
        info!("created blueprint '{}' ({:?})", blueprint.code, blueprint.kind);
        Ok(blueprint)
    }

    pub fn update_blueprint(
        &self,
        id: Uuid,
        update: BlueprintUpdate,
    ) -> Result<Blueprint, SchemaError> {
        let mut blueprint = self.db.get_blueprint_required(id)?;

        if let Some(name) = update.name {
            if name.is_empty() {
                return Err(SchemaError::InvalidData(
                    "blueprint name cannot be empty".to_string(),
                ));
            }
            blueprint.name = name;
        }
        if let Some(entry_type) = update.entry_type {
            if entry_type.is_some() && blueprint.kind != BlueprintKind::Full {
                return Err(SchemaError::InvalidData(
                    "only full blueprints can back a content-entry type".to_string(),
                ));
            }
            blueprint.entry_type = entry_type;
        }

        blueprint.updated_at = Utc::now();
        self.db.store_blueprint(&blueprint)?;
        Ok(blueprint)
    }

    /// Reports whether a blueprint can be deleted and, if not, why.
    pub fn can_delete_blueprint(&self, id: Uuid) -> Result<DeleteCheck, SchemaError> {
        let blueprint = self.db.get_blueprint_required(id)?;
        let mut reasons = Vec::new();

        if let Some(entry_type) = &blueprint.entry_type {
            reasons.push(format!("backs content-entry type '{}'", entry_type));
        }
        let embedded_in = self.db.list_embeds_for_embedded(id)?;
        if !embedded_in.is_empty() {
            reasons.push(format!("embedded in {} blueprint(s)", embedded_in.len()));
        }

        Ok(DeleteCheck {
            can_delete: reasons.is_empty(),
            reasons,
        })
    }

    pub fn delete_blueprint(&self, id: Uuid) -> Result<(), SchemaError> {
        let blueprint = self.db.get_blueprint_required(id)?;
        let check = self.can_delete_blueprint(id)?;
        if !check.can_delete {
            return Err(SchemaError::SchemaInUse {
                blueprint: blueprint.code,
                reasons: check.reasons,
            });
        }

        for embed in self.db.list_embeds_for_host(id)? {
            self.db.soft_delete_embed(&embed)?;
        }
        for field in self.db.list_fields(id)? {
            self.db.soft_delete_field(&field)?;
        }
        self.db.soft_delete_blueprint(id)?;
        info!("deleted blueprint '{}'", blueprint.code);
        Ok(())
    }

    pub fn get_blueprint(&self, id: Uuid) -> Result<Blueprint, SchemaError> {
        self.db.get_blueprint_required(id)
    }

    pub fn list_blueprints(&self) -> Result<Vec<Blueprint>, SchemaError> {
        let mut all = self.db.list_blueprints()?;
        all.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(all)
    }

    pub fn get_blueprint_by_code(
        &self,
        code: &str,
        kind: BlueprintKind,
    ) -> Result<Option<Blueprint>, SchemaError> {
        self.db.get_blueprint_by_code(code, kind)
    }

    /// The flattened field list the content editor and validator consume:
    /// authored fields and materialized copies together, path-sorted.
    pub fn list_fields(&self, blueprint_id: Uuid) -> Result<Vec<FieldNode>, SchemaError> {
        self.db.get_blueprint_required(blueprint_id)?;
        let mut fields = self.db.list_fields(blueprint_id)?;
        fields.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(fields)
    }

    // ==================== Fields ====================

    pub fn create_field(
        &self,
        blueprint_id: Uuid,
        new: NewField,
    ) -> Result<FieldNode, SchemaError> {
        let blueprint = self.db.get_blueprint_required(blueprint_id)?;
        validate_field_name(&new.name)?;

        let fields = self.db.list_fields(blueprint_id)?;
        let tree = FieldTree::from_fields(fields.clone());

        if let Some(parent_id) = new.parent_id {
            let parent = tree.get(parent_id).ok_or_else(|| {
                SchemaError::NotFound(format!(
                    "parent field {} in blueprint '{}'",
                    parent_id, blueprint.code
                ))
            })?;
            ensure_authored(parent)?;
            if !parent.field_type.is_group() {
                return Err(SchemaError::InvalidField(format!(
                    "parent field '{}' is not a group",
                    parent.full_path
                )));
            }
        }

        let full_path = tree.path_under(new.parent_id, &new.name);
        if tree.contains_path(&full_path) {
            return Err(SchemaError::InvalidField(format!(
                "field path '{}' already exists in blueprint '{}'",
                full_path, blueprint.code
            )));
        }

        let now = Utc::now();
        let field = FieldNode {
            id: Uuid::new_v4(),
            blueprint_id,
            parent_id: new.parent_id,
            name: new.name,
            full_path,
            field_type: new.field_type,
            required: new.required,
            indexed: new.indexed,
            cardinality: new.cardinality,
            validations: new.validations,
            ui: new.ui,
            origin: FieldOrigin::Authored,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        // The new path must also be collision-free inside every host that
        // (transitively) embeds this blueprint, before anything is written.
        let graph = self.load_graph()?;
        let mut proposed = fields;
        proposed.push(field.clone());
        self.conflicts()
            .validate_structural_change(blueprint_id, &proposed, &graph)?;

        self.db.store_field(&field)?;
        self.rematerialize_dependents(blueprint_id)?;
        debug!(
            "created field '{}' in blueprint '{}'",
            field.full_path, blueprint.code
        );
        Ok(field)
    }

    pub fn update_field(
        &self,
        field_id: Uuid,
        update: FieldUpdate,
    ) -> Result<FieldNode, SchemaError> {
        let field = self.db.get_field_required(field_id)?;
        ensure_authored(&field)?;
        let blueprint = self.db.get_blueprint_required(field.blueprint_id)?;

        let fields = self.db.list_fields(field.blueprint_id)?;
        let mut tree = FieldTree::from_fields(fields);

        if let Some(name) = &update.name {
            validate_field_name(name)?;
        }
        if let Some(Some(parent_id)) = update.parent_id {
            if parent_id == field_id {
                return Err(SchemaError::InvalidField(
                    "a field cannot be its own parent".to_string(),
                ));
            }
            if tree.is_descendant_of(parent_id, field_id) {
                return Err(SchemaError::InvalidField(
                    "a field cannot be moved under its own descendant".to_string(),
                ));
            }
            let parent = tree.get(parent_id).ok_or_else(|| {
                SchemaError::NotFound(format!(
                    "parent field {} in blueprint '{}'",
                    parent_id, blueprint.code
                ))
            })?;
            ensure_authored(parent)?;
            if !parent.field_type.is_group() {
                return Err(SchemaError::InvalidField(format!(
                    "parent field '{}' is not a group",
                    parent.full_path
                )));
            }
        }

        let structural = update.name.is_some() || update.parent_id.is_some();
        let mut changed = tree.apply_move(field_id, update.name.as_deref(), update.parent_id);
        if !tree.paths_are_unique() {
            let path = tree
                .get(field_id)
                .map(|f| f.full_path.clone())
                .unwrap_or_default();
            return Err(SchemaError::InvalidField(format!(
                "renaming to '{}' collides with an existing field in blueprint '{}'",
                path, blueprint.code
            )));
        }

        if structural {
            let graph = self.load_graph()?;
            self.conflicts().validate_structural_change(
                field.blueprint_id,
                tree.nodes(),
                &graph,
            )?;
        }

        let now = Utc::now();
        let mut result = tree
            .get(field_id)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(format!("field {}", field_id)))?;
        if let Some(required) = update.required {
            result.required = required;
        }
        if let Some(indexed) = update.indexed {
            result.indexed = indexed;
        }
        if let Some(cardinality) = update.cardinality {
            result.cardinality = cardinality;
        }
        if let Some(validations) = update.validations {
            result.validations = validations;
        }
        if let Some(ui) = update.ui {
            result.ui = ui;
        }
        result.updated_at = now;

        changed.retain(|f| f.id != field_id);
        for mut node in changed {
            node.updated_at = now;
            self.db.store_field(&node)?;
        }
        self.db.store_field(&result)?;

        // Copies inherit attributes, so every dependent embed is refreshed
        // even for non-structural edits.
        self.rematerialize_dependents(field.blueprint_id)?;
        debug!(
            "updated field '{}' in blueprint '{}'",
            result.full_path, blueprint.code
        );
        Ok(result)
    }

    pub fn delete_field(&self, field_id: Uuid) -> Result<(), SchemaError> {
        let field = self.db.get_field_required(field_id)?;
        ensure_authored(&field)?;
        let blueprint = self.db.get_blueprint_required(field.blueprint_id)?;

        let tree = FieldTree::from_fields(self.db.list_fields(field.blueprint_id)?);
        let mut doomed: Vec<FieldNode> = vec![field.clone()];
        doomed.extend(tree.descendants_of(field_id).into_iter().cloned());
        let doomed_ids: BTreeSet<Uuid> = doomed.iter().map(|f| f.id).collect();

        // Embeds anchored inside the doomed subtree go with it.
        for embed in self.db.list_embeds_for_host(field.blueprint_id)? {
            if let Some(anchor_id) = embed.anchor_field_id {
                if doomed_ids.contains(&anchor_id) {
                    self.db.soft_delete_embed(&embed)?;
                }
            }
        }
        for node in &doomed {
            self.db.soft_delete_field(node)?;
        }

        // Cascades the soft-delete to every materialized copy that traces
        // back to this field, across all dependent blueprints.
        self.rematerialize_dependents(field.blueprint_id)?;
        debug!(
            "deleted field '{}' ({} node(s)) from blueprint '{}'",
            field.full_path,
            doomed.len(),
            blueprint.code
        );
        Ok(())
    }

    // ==================== Embeds ====================

    pub fn create_embed(
        &self,
        host_id: Uuid,
        embedded_id: Uuid,
        anchor_field_id: Option<Uuid>,
    ) -> Result<Embed, SchemaError> {
        let host = self.db.get_blueprint_required(host_id)?;
        let embedded = self.db.get_blueprint_required(embedded_id)?;

        if embedded.kind != BlueprintKind::Component {
            return Err(SchemaError::InvalidData(format!(
                "blueprint '{}' is not a component and cannot be embedded",
                embedded.code
            )));
        }

        let anchor_path = match anchor_field_id {
            Some(anchor_id) => {
                let host_tree = FieldTree::from_fields(self.db.list_fields(host_id)?);
                let anchor = host_tree.get(anchor_id).ok_or_else(|| {
                    SchemaError::NotFound(format!(
                        "anchor field {} in blueprint '{}'",
                        anchor_id, host.code
                    ))
                })?;
                // Copies get fresh ids on every re-materialization, so an
                // anchor must be an authored group to stay stable.
                ensure_authored(anchor)?;
                if !anchor.field_type.is_group() {
                    return Err(SchemaError::InvalidField(format!(
                        "anchor field '{}' is not a group",
                        anchor.full_path
                    )));
                }
                Some(anchor.full_path.clone())
            }
            None => None,
        };

        let duplicate = self
            .db
            .list_embeds_for_host(host_id)?
            .into_iter()
            .any(|e| e.embedded_blueprint_id == embedded_id && e.anchor_field_id == anchor_field_id);
        if duplicate {
            return Err(SchemaError::InvalidData(format!(
                "'{}' is already embedded in '{}' under this anchor",
                embedded.code, host.code
            )));
        }

        let graph = self.load_graph()?;
        CycleValidator::new(&graph).ensure_no_cycle(&host, &embedded)?;

        // Worst-case expansion depth over the whole affected chain: the
        // longest host-side chain above, joined to the longest chain below
        // the embedded side. Checked here so no dependent re-run can fail
        // after writes have started.
        let chain = graph.depth_above(host_id) - 1 + graph.depth_below(embedded_id);
        if chain > self.max_embed_depth {
            return Err(SchemaError::MaxDepthExceeded {
                max: self.max_embed_depth,
            });
        }

        // Conflict check covers the direct host and every host further up
        // the chain, since the sweep below rewrites all of them.
        let embed = Embed::new(host_id, embedded_id, anchor_field_id);
        self.conflicts().validate_new_embed(
            &host,
            &embedded,
            anchor_path.as_deref(),
            &embed,
            &graph,
        )?;

        self.db.store_embed(&embed)?;
        self.materializer().materialize(&embed)?;
        self.rematerialize_dependents(host_id)?;
        info!(
            "embedded '{}' into '{}' at {}",
            embedded.code,
            host.code,
            anchor_path.as_deref().unwrap_or("<root>")
        );
        Ok(embed)
    }

    pub fn delete_embed(&self, embed_id: Uuid) -> Result<(), SchemaError> {
        let embed = self.db.get_embed_required(embed_id)?;
        let host = self.db.get_blueprint_required(embed.host_blueprint_id)?;

        self.db.soft_delete_embed(&embed)?;
        for field in self
            .db
            .list_fields_for_embed(embed.host_blueprint_id, embed.id)?
        {
            self.db.soft_delete_field(&field)?;
        }
        // Re-exports of this edge's fields in dependent hosts disappear
        // with the sweep.
        self.rematerialize_dependents(embed.host_blueprint_id)?;
        info!(
            "removed embed of {} from '{}'",
            embed.embedded_blueprint_id, host.code
        );
        Ok(())
    }

    /// Components that may still be embedded into the given blueprint
    /// without creating a cycle.
    pub fn embeddable_blueprints_for(&self, id: Uuid) -> Result<Vec<Blueprint>, SchemaError> {
        let blueprint = self.db.get_blueprint_required(id)?;
        let graph = self.load_graph()?;
        let validator = CycleValidator::new(&graph);

        let mut candidates: Vec<Blueprint> = self
            .db
            .list_blueprints()?
            .into_iter()
            .filter(|bp| bp.kind == BlueprintKind::Component)
            .filter(|bp| bp.id != blueprint.id && validator.can_embed(blueprint.id, bp.id))
            .collect();
        candidates.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(candidates)
    }

    // ==================== Internal ====================

    /// Re-materializes every embed whose embedded side lies in
    /// {changed} ∪ all_dependents(changed). Flattening always re-reads the
    /// source trees, so the per-embed runs are order-independent.
    fn rematerialize_dependents(&self, changed: Uuid) -> Result<(), SchemaError> {
        let graph = self.load_graph()?;
        let mut affected = graph.all_dependents(changed);
        affected.insert(changed);

        let materializer = self.materializer();
        let mut refreshed = 0usize;
        for embed in self.db.list_embeds()? {
            if affected.contains(&embed.embedded_blueprint_id) {
                materializer.materialize(&embed)?;
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            debug!(
                "re-materialized {} embed(s) after change to blueprint {}",
                refreshed, changed
            );
        }
        Ok(())
    }
}
