use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Primitive value types a leaf field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Json,
}

/// Shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Scalar(ScalarType),
    /// Nested object; the only type that may parent other fields.
    Group,
    ScalarList(ScalarType),
    GroupList,
    Reference,
    ReferenceList,
}

impl FieldType {
    /// Groups are the only fields allowed to have children (and therefore
    /// the only valid embed anchors).
    pub fn is_group(&self) -> bool {
        matches!(self, FieldType::Group | FieldType::GroupList)
    }
}

/// A single validation rule attached to a field, interpreted by the
/// content-entry validator (out of scope here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub rule: String,
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Where a materialized copy ultimately came from.
///
/// `source_blueprint_id`/`source_field_id` always point at the original
/// authored field, never at an intermediate re-export; `owning_embed_id` is
/// the embed edge whose materialization created this copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_blueprint_id: Uuid,
    pub source_field_id: Uuid,
    pub owning_embed_id: Uuid,
}

/// Origin of a field. Materialized copies carry provenance and are
/// read-only by construction: only the materialization engine writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOrigin {
    Authored,
    Materialized(Provenance),
}

/// One node of a blueprint's field tree.
///
/// `full_path` is derived: the dot-joined ancestor names plus the field's
/// own name, recomputed (and propagated to descendants) whenever name or
/// parent changes. It is unique among live fields of one blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldNode {
    pub id: Uuid,
    pub blueprint_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub full_path: String,
    pub field_type: FieldType,
    pub required: bool,
    pub indexed: bool,
    /// Maximum number of values for list-shaped fields.
    pub cardinality: Option<u32>,
    pub validations: Vec<ValidationRule>,
    /// Opaque editor hints (widget, placeholder, help text, ...).
    pub ui: HashMap<String, serde_json::Value>,
    pub origin: FieldOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FieldNode {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// True for materialized copies, which reject direct mutation.
    pub fn is_readonly(&self) -> bool {
        matches!(self.origin, FieldOrigin::Materialized(_))
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match &self.origin {
            FieldOrigin::Authored => None,
            FieldOrigin::Materialized(p) => Some(p),
        }
    }
}

/// Attributes accepted by `SchemaComposer::create_field`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewField {
    pub name: String,
    pub field_type: FieldType,
    pub parent_id: Option<Uuid>,
    pub required: bool,
    pub indexed: bool,
    pub cardinality: Option<u32>,
    pub validations: Vec<ValidationRule>,
    pub ui: HashMap<String, serde_json::Value>,
}

impl NewField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            parent_id: None,
            required: false,
            indexed: false,
            cardinality: None,
            validations: Vec::new(),
            ui: HashMap::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Partial update for `SchemaComposer::update_field`. Doubly-optional
/// attributes (`parent_id`, `cardinality`) distinguish "leave alone" from
/// "clear".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub name: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub required: Option<bool>,
    pub indexed: Option<bool>,
    pub cardinality: Option<Option<u32>>,
    pub validations: Option<Vec<ValidationRule>>,
    pub ui: Option<HashMap<String, serde_json::Value>>,
}

impl FieldUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}
