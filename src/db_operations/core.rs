use crate::schema::SchemaError;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

/// Unified access to the underlying sled store.
///
/// One tree per entity family, cached at open time. All values are
/// serde_json-encoded; keys are uuid strings (fields are keyed as
/// `{blueprint_id}:{field_id}` so one blueprint's fields can be listed with
/// a prefix scan).
#[derive(Clone)]
pub struct DbOperations {
    db: sled::Db,
    pub(crate) blueprints_tree: sled::Tree,
    pub(crate) fields_tree: sled::Tree,
    pub(crate) embeds_tree: sled::Tree,
}

impl DbOperations {
    /// Creates a new DbOperations instance with all required trees.
    pub fn new(db: sled::Db) -> Result<Self, sled::Error> {
        let blueprints_tree = db.open_tree("blueprints")?;
        let fields_tree = db.open_tree("fields")?;
        let embeds_tree = db.open_tree("embeds")?;

        Ok(Self {
            db,
            blueprints_tree,
            fields_tree,
            embeds_tree,
        })
    }

    /// Opens (or creates) the store at the given directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Self::new(db)
    }

    /// Gets a reference to the underlying database.
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    /// Stores a serializable item in the given tree.
    pub(crate) fn store_in_tree<T: Serialize>(
        &self,
        tree: &sled::Tree,
        key: &str,
        item: &T,
    ) -> Result<(), SchemaError> {
        let bytes = serde_json::to_vec(item)
            .map_err(|e| SchemaError::Database(format!("Failed to serialize item: {}", e)))?;

        tree.insert(key.as_bytes(), bytes)
            .map_err(|e| SchemaError::Database(format!("Failed to insert item: {}", e)))?;

        // Ensure the data is durably written to disk.
        tree.flush()
            .map_err(|e| SchemaError::Database(format!("Failed to flush tree: {}", e)))?;

        Ok(())
    }

    /// Retrieves a deserializable item from the given tree.
    pub(crate) fn get_from_tree<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
        key: &str,
    ) -> Result<Option<T>, SchemaError> {
        match tree.get(key.as_bytes()) {
            Ok(Some(bytes)) => {
                let item = serde_json::from_slice(&bytes).map_err(|e| {
                    SchemaError::Database(format!("Failed to deserialize item: {}", e))
                })?;
                Ok(Some(item))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(SchemaError::Database(format!(
                "Failed to retrieve item: {}",
                e
            ))),
        }
    }

    /// Lists every item in the given tree.
    pub(crate) fn list_items_in_tree<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
    ) -> Result<Vec<T>, SchemaError> {
        let mut items = Vec::new();
        for result in tree.iter() {
            let (_, bytes) = result
                .map_err(|e| SchemaError::Database(format!("Failed to scan tree: {}", e)))?;
            let item = serde_json::from_slice(&bytes)
                .map_err(|e| SchemaError::Database(format!("Failed to deserialize item: {}", e)))?;
            items.push(item);
        }
        Ok(items)
    }

    /// Lists every item whose key starts with the given prefix.
    pub(crate) fn list_items_with_prefix<T: DeserializeOwned>(
        &self,
        tree: &sled::Tree,
        prefix: &str,
    ) -> Result<Vec<T>, SchemaError> {
        let mut items = Vec::new();
        for result in tree.scan_prefix(prefix.as_bytes()) {
            let (_, bytes) = result
                .map_err(|e| SchemaError::Database(format!("Failed to scan prefix: {}", e)))?;
            let item = serde_json::from_slice(&bytes)
                .map_err(|e| SchemaError::Database(format!("Failed to deserialize item: {}", e)))?;
            items.push(item);
        }
        Ok(items)
    }
}
