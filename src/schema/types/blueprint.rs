use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a blueprint backs content entries directly or exists only to be
/// embedded into other blueprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintKind {
    Full,
    Component,
}

/// A named, versionless definition of fields.
///
/// Blueprints are soft-deleted: `deleted_at` is set and the row is kept.
/// A blueprint cannot be deleted while it is embedded into another
/// blueprint or while a content-entry type still points at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: Uuid,
    pub name: String,
    /// Unique slug, unique per kind among live blueprints.
    pub code: String,
    pub kind: BlueprintKind,
    /// Content-entry type backed by this blueprint (full blueprints only).
    pub entry_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Blueprint {
    pub fn new(name: impl Into<String>, code: impl Into<String>, kind: BlueprintKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: code.into(),
            kind,
            entry_type: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Attributes accepted by `SchemaComposer::create_blueprint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBlueprint {
    pub name: String,
    pub code: String,
    pub kind: BlueprintKind,
    pub entry_type: Option<String>,
}

impl NewBlueprint {
    pub fn new(name: impl Into<String>, code: impl Into<String>, kind: BlueprintKind) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            kind,
            entry_type: None,
        }
    }

    pub fn with_entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = Some(entry_type.into());
        self
    }
}

/// Partial update for `SchemaComposer::update_blueprint`. `None` leaves the
/// attribute untouched; `entry_type` is doubly optional so the link can be
/// cleared explicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlueprintUpdate {
    pub name: Option<String>,
    pub entry_type: Option<Option<String>>,
}

/// Result of `SchemaComposer::can_delete_blueprint`, serializable for the
/// administrative layer to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCheck {
    pub can_delete: bool,
    pub reasons: Vec<String>,
}
