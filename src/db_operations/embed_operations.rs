use super::core::DbOperations;
use crate::schema::types::{Embed, SchemaError};
use chrono::Utc;
use uuid::Uuid;

impl DbOperations {
    /// Stores (or replaces) an embed edge.
    pub fn store_embed(&self, embed: &Embed) -> Result<(), SchemaError> {
        self.store_in_tree(&self.embeds_tree, &embed.id.to_string(), embed)
    }

    /// Fetches an embed edge by id, deleted or not.
    pub fn get_embed(&self, id: Uuid) -> Result<Option<Embed>, SchemaError> {
        self.get_from_tree(&self.embeds_tree, &id.to_string())
    }

    /// Fetches a live embed edge by id or fails with `NotFound`.
    pub fn get_embed_required(&self, id: Uuid) -> Result<Embed, SchemaError> {
        match self.get_embed(id)? {
            Some(e) if e.is_live() => Ok(e),
            _ => Err(SchemaError::NotFound(format!("embed {}", id))),
        }
    }

    /// Lists every live embed edge. The edge set is small (one row per
    /// composition), so the graph layer rebuilds from a full scan.
    pub fn list_embeds(&self) -> Result<Vec<Embed>, SchemaError> {
        let all: Vec<Embed> = self.list_items_in_tree(&self.embeds_tree)?;
        Ok(all.into_iter().filter(|e| e.is_live()).collect())
    }

    /// Live embeds originating from (hosted by) the given blueprint.
    pub fn list_embeds_for_host(&self, host_id: Uuid) -> Result<Vec<Embed>, SchemaError> {
        Ok(self
            .list_embeds()?
            .into_iter()
            .filter(|e| e.host_blueprint_id == host_id)
            .collect())
    }

    /// Live embeds whose embedded side is the given blueprint.
    pub fn list_embeds_for_embedded(&self, embedded_id: Uuid) -> Result<Vec<Embed>, SchemaError> {
        Ok(self
            .list_embeds()?
            .into_iter()
            .filter(|e| e.embedded_blueprint_id == embedded_id)
            .collect())
    }

    /// Soft-deletes one embed edge.
    pub fn soft_delete_embed(&self, embed: &Embed) -> Result<(), SchemaError> {
        if !embed.is_live() {
            return Ok(());
        }
        let mut deleted = embed.clone();
        deleted.deleted_at = Some(Utc::now());
        self.store_embed(&deleted)
    }
}
