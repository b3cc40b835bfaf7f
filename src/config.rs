//! Mapping configuration.
//!
//! Constructed once by the caller and shared by every component; nothing
//! here is read from process-wide state.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_ENTITY_LABEL: &str = "Entity";
pub const DEFAULT_VALUE_LABEL: &str = "Value";
pub const DEFAULT_VALUE_KEY: &str = "name";
pub const DEFAULT_TYPE_KEY: &str = "type";
pub const DEFAULT_CREATED_KEY: &str = "createdDate";

/// Labels and property keys used when generating traversal patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Category label of entity nodes (default: "Entity").
    pub entity_label: String,

    /// Category label of value nodes (default: "Value").
    pub value_label: String,

    /// Property on a value node holding its scalar payload (default: "name").
    pub value_key: String,

    /// Property on a value node recording the originating scalar type
    /// (default: "type").
    pub type_key: String,

    /// Property stamped on new entity nodes with the creation time in epoch
    /// milliseconds (default: "createdDate", `None` disables it).
    pub created_key: Option<String>,

    /// Wrap every write operation in one store-level transaction
    /// (default: false).
    pub batch_writes: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            entity_label: DEFAULT_ENTITY_LABEL.to_string(),
            value_label: DEFAULT_VALUE_LABEL.to_string(),
            value_key: DEFAULT_VALUE_KEY.to_string(),
            type_key: DEFAULT_TYPE_KEY.to_string(),
            created_key: Some(DEFAULT_CREATED_KEY.to_string()),
            batch_writes: false,
        }
    }
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_entity_label(mut self, label: impl Into<String>) -> Self {
        self.entity_label = label.into();
        self
    }

    pub fn with_value_label(mut self, label: impl Into<String>) -> Self {
        self.value_label = label.into();
        self
    }

    pub fn with_value_key(mut self, key: impl Into<String>) -> Self {
        self.value_key = key.into();
        self
    }

    pub fn with_type_key(mut self, key: impl Into<String>) -> Self {
        self.type_key = key.into();
        self
    }

    pub fn with_created_key(mut self, key: Option<String>) -> Self {
        self.created_key = key;
        self
    }

    pub fn with_batch_writes(mut self, enabled: bool) -> Self {
        self.batch_writes = enabled;
        self
    }

    /// Reject labels and keys that cannot be embedded in a pattern as bare
    /// identifiers, and an entity label equal to the value label.
    pub fn validate(&self) -> Result<()> {
        let mut names = vec![
            ("entity_label", self.entity_label.as_str()),
            ("value_label", self.value_label.as_str()),
            ("value_key", self.value_key.as_str()),
            ("type_key", self.type_key.as_str()),
        ];
        if let Some(created) = &self.created_key {
            names.push(("created_key", created.as_str()));
        }
        for (field, name) in names {
            if !crate::cypher::is_identifier(name) {
                return Err(Error::Config(format!("{field} '{name}' is not a valid identifier")));
            }
        }
        if self.entity_label == self.value_label {
            return Err(Error::Config(format!(
                "entity and value labels must differ (both '{}')",
                self.entity_label
            )));
        }
        Ok(())
    }
}
