use super::core::DbOperations;
use crate::schema::types::{Blueprint, BlueprintKind, SchemaError};
use chrono::Utc;
use uuid::Uuid;

impl DbOperations {
    /// Stores (or replaces) a blueprint record.
    pub fn store_blueprint(&self, blueprint: &Blueprint) -> Result<(), SchemaError> {
        self.store_in_tree(&self.blueprints_tree, &blueprint.id.to_string(), blueprint)
    }

    /// Fetches a blueprint by id, deleted or not.
    pub fn get_blueprint(&self, id: Uuid) -> Result<Option<Blueprint>, SchemaError> {
        self.get_from_tree(&self.blueprints_tree, &id.to_string())
    }

    /// Fetches a live blueprint by id or fails with `NotFound`.
    pub fn get_blueprint_required(&self, id: Uuid) -> Result<Blueprint, SchemaError> {
        match self.get_blueprint(id)? {
            Some(bp) if bp.is_live() => Ok(bp),
            _ => Err(SchemaError::NotFound(format!("blueprint {}", id))),
        }
    }

    /// Lists all live blueprints.
    pub fn list_blueprints(&self) -> Result<Vec<Blueprint>, SchemaError> {
        let all: Vec<Blueprint> = self.list_items_in_tree(&self.blueprints_tree)?;
        Ok(all.into_iter().filter(|bp| bp.is_live()).collect())
    }

    /// Looks up a live blueprint by (code, kind). Codes are unique per kind.
    pub fn get_blueprint_by_code(
        &self,
        code: &str,
        kind: BlueprintKind,
    ) -> Result<Option<Blueprint>, SchemaError> {
        Ok(self
            .list_blueprints()?
            .into_iter()
            .find(|bp| bp.code == code && bp.kind == kind))
    }

    /// Soft-deletes a blueprint record.
    pub fn soft_delete_blueprint(&self, id: Uuid) -> Result<(), SchemaError> {
        let mut bp = self
            .get_blueprint(id)?
            .ok_or_else(|| SchemaError::NotFound(format!("blueprint {}", id)))?;
        if bp.is_live() {
            bp.deleted_at = Some(Utc::now());
            self.store_blueprint(&bp)?;
        }
        Ok(())
    }
}
