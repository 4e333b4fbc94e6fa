use super::core::DbOperations;
use crate::schema::types::{FieldNode, SchemaError};
use chrono::Utc;
use uuid::Uuid;

fn field_key(blueprint_id: Uuid, field_id: Uuid) -> String {
    format!("{}:{}", blueprint_id, field_id)
}

impl DbOperations {
    /// Stores (or replaces) a field record.
    pub fn store_field(&self, field: &FieldNode) -> Result<(), SchemaError> {
        self.store_in_tree(
            &self.fields_tree,
            &field_key(field.blueprint_id, field.id),
            field,
        )
    }

    /// Fetches a field by id regardless of owning blueprint or deletion.
    ///
    /// Fields are keyed by blueprint, so this is a scan; callers that know
    /// the blueprint should prefer `list_fields`.
    pub fn get_field(&self, id: Uuid) -> Result<Option<FieldNode>, SchemaError> {
        let all: Vec<FieldNode> = self.list_items_in_tree(&self.fields_tree)?;
        Ok(all.into_iter().find(|f| f.id == id))
    }

    /// Fetches a live field by id or fails with `NotFound`.
    pub fn get_field_required(&self, id: Uuid) -> Result<FieldNode, SchemaError> {
        match self.get_field(id)? {
            Some(f) if f.is_live() => Ok(f),
            _ => Err(SchemaError::NotFound(format!("field {}", id))),
        }
    }

    /// Lists all live fields of one blueprint.
    pub fn list_fields(&self, blueprint_id: Uuid) -> Result<Vec<FieldNode>, SchemaError> {
        let all: Vec<FieldNode> =
            self.list_items_with_prefix(&self.fields_tree, &format!("{}:", blueprint_id))?;
        Ok(all.into_iter().filter(|f| f.is_live()).collect())
    }

    /// Lists the live fields of a blueprint owned by one embed edge.
    pub fn list_fields_for_embed(
        &self,
        blueprint_id: Uuid,
        embed_id: Uuid,
    ) -> Result<Vec<FieldNode>, SchemaError> {
        Ok(self
            .list_fields(blueprint_id)?
            .into_iter()
            .filter(|f| {
                f.provenance()
                    .map(|p| p.owning_embed_id == embed_id)
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Soft-deletes one field record.
    pub fn soft_delete_field(&self, field: &FieldNode) -> Result<(), SchemaError> {
        if !field.is_live() {
            return Ok(());
        }
        let mut deleted = field.clone();
        deleted.deleted_at = Some(Utc::now());
        self.store_field(&deleted)
    }
}
