use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed composition edge: the host blueprint embeds a component
/// blueprint, optionally anchored at one of the host's group fields
/// (`anchor_field_id = None` means "at host root").
///
/// At most one live edge may exist per (host, embedded, anchor) triple.
/// Deleting the edge removes every field whose `owning_embed_id` matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embed {
    pub id: Uuid,
    pub host_blueprint_id: Uuid,
    pub embedded_blueprint_id: Uuid,
    pub anchor_field_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new(
        host_blueprint_id: Uuid,
        embedded_blueprint_id: Uuid,
        anchor_field_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            host_blueprint_id,
            embedded_blueprint_id,
            anchor_field_id,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}
