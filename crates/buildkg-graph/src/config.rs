//! Configuration for graph loading

use serde::{Deserialize, Serialize};

/// How entity vertices are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadMode {
    /// Always create new vertices and edges; reloading duplicates them
    #[default]
    Create,
    /// Merge on label + synthetic id; reloading converges
    Upsert,
}

/// Configuration for the graph loader and store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Name of the AGE graph
    pub graph_name: String,

    /// String properties are truncated to this many characters
    pub max_property_chars: usize,

    /// Vertex write mode
    pub mode: LoadMode,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            graph_name: "knowledge_graph".to_string(),
            max_property_chars: 500,
            mode: LoadMode::Create,
        }
    }
}

impl GraphConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.graph_name.is_empty() {
            return Err("graph_name must not be empty".to_string());
        }
        if !self
            .graph_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(format!(
                "graph_name '{}' may only contain letters, digits and underscores",
                self.graph_name
            ));
        }
        if self.max_property_chars == 0 {
            return Err("max_property_chars must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GraphConfig::default().validate().is_ok());
        assert_eq!(GraphConfig::default().mode, LoadMode::Create);
    }

    #[test]
    fn test_invalid_graph_name() {
        let config = GraphConfig {
            graph_name: "kg'; DROP".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = GraphConfig {
            graph_name: "regulations".to_string(),
            max_property_chars: 200,
            mode: LoadMode::Upsert,
        };
        let parsed = GraphConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = GraphConfig::from_toml("mode = \"upsert\"\n").unwrap();
        assert_eq!(parsed.mode, LoadMode::Upsert);
        assert_eq!(parsed.graph_name, "knowledge_graph");
    }
}
