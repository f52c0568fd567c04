//! Extraction result → graph mutations

use buildkg_domain::{
    synthetic_id, GraphEntity, GraphMutation, GraphRelationship, GraphStore, Properties,
    PropertyValue,
};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{GraphConfig, LoadMode};
use crate::cypher::sanitize_identifier;
use crate::error::GraphError;
use crate::payload::ExtractionPayload;

/// Label for entities without `_label` when the ontology has no root node
pub const DEFAULT_ROOT_LABEL: &str = "Entity";

/// Label for relationships without `_label`
pub const DEFAULT_EDGE_LABEL: &str = "RELATES_TO";

/// Resolved entities and edges for one fragment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadPlan {
    /// Entities, in response order
    pub entities: Vec<GraphEntity>,
    /// Edges whose endpoints are both valid entity positions
    pub relationships: Vec<GraphRelationship>,
}

impl LoadPlan {
    /// Mutations for this plan: all vertices first, then all edges.
    pub fn mutations(&self, mode: LoadMode) -> Vec<GraphMutation> {
        let vertices = self.entities.iter().map(|entity| match mode {
            LoadMode::Create => GraphMutation::CreateVertex {
                label: entity.label.clone(),
                properties: entity.properties.clone(),
            },
            LoadMode::Upsert => GraphMutation::MergeVertex {
                label: entity.label.clone(),
                id: entity.id.clone(),
                properties: entity.properties.clone(),
            },
        });

        let edges = self.relationships.iter().map(|rel| {
            let from = self.entities[rel.from_index].vertex_ref();
            let to = self.entities[rel.to_index].vertex_ref();
            let label = rel.label.clone();
            match mode {
                LoadMode::Create => GraphMutation::CreateEdge { label, from, to },
                LoadMode::Upsert => GraphMutation::MergeEdge { label, from, to },
            }
        });

        vertices.chain(edges).collect()
    }
}

/// Loads extraction results for one ontology into a graph store
#[derive(Debug, Clone)]
pub struct GraphLoader {
    root_label: String,
    mode: LoadMode,
    max_property_chars: usize,
}

impl GraphLoader {
    /// Create a loader. An empty `root_node` falls back to [`DEFAULT_ROOT_LABEL`].
    pub fn new(root_node: &str, config: &GraphConfig) -> Self {
        let root_label = if root_node.trim().is_empty() {
            DEFAULT_ROOT_LABEL.to_string()
        } else {
            sanitize_identifier(root_node)
        };
        Self {
            root_label,
            mode: config.mode,
            max_property_chars: config.max_property_chars,
        }
    }

    /// Label used for untyped entities
    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    /// Vertex write mode
    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    /// Resolve labels, synthetic ids and properties without touching a store.
    pub fn plan(&self, fragment_id: &str, doc_id: &str, payload: &ExtractionPayload) -> LoadPlan {
        let entities: Vec<GraphEntity> = payload
            .entities
            .iter()
            .enumerate()
            .map(|(idx, entity)| self.resolve_entity(fragment_id, doc_id, idx, entity))
            .collect();

        let relationships = payload
            .relationships
            .iter()
            .filter_map(|spec| {
                let (from_index, to_index) = match (spec.from_index, spec.to_index) {
                    (Some(from), Some(to)) if from < entities.len() && to < entities.len() => {
                        (from, to)
                    }
                    _ => {
                        debug!(
                            "Skipping relationship {:?}: endpoints out of range for {} entities",
                            spec,
                            entities.len()
                        );
                        return None;
                    }
                };
                let label = spec
                    .label
                    .as_deref()
                    .map(sanitize_identifier)
                    .unwrap_or_else(|| DEFAULT_EDGE_LABEL.to_string());
                Some(GraphRelationship {
                    label,
                    from_index,
                    to_index,
                })
            })
            .collect();

        LoadPlan {
            entities,
            relationships,
        }
    }

    /// Write one fragment's extraction result.
    ///
    /// Returns `Ok(false)` when there are no entities (nothing is written)
    /// and `Ok(true)` once every mutation has been applied.
    pub async fn load<G: GraphStore>(
        &self,
        store: &mut G,
        fragment_id: &str,
        doc_id: &str,
        payload: &ExtractionPayload,
    ) -> Result<bool, GraphError> {
        if payload.is_empty() {
            return Ok(false);
        }

        let plan = self.plan(fragment_id, doc_id, payload);
        let mutations = plan.mutations(self.mode);
        store.apply(&mutations).await.map_err(|e| {
            warn!("Graph load failed for fragment {}: {}", fragment_id, e);
            GraphError::Query(e.to_string())
        })?;

        debug!(
            "Loaded fragment {}: {} entities, {} relationships",
            fragment_id,
            plan.entities.len(),
            plan.relationships.len()
        );
        Ok(true)
    }

    fn resolve_entity(
        &self,
        fragment_id: &str,
        doc_id: &str,
        index: usize,
        entity: &Map<String, Value>,
    ) -> GraphEntity {
        let label = entity
            .get("_label")
            .and_then(Value::as_str)
            .filter(|label| !label.trim().is_empty())
            .map(sanitize_identifier)
            .unwrap_or_else(|| self.root_label.clone());
        let id = synthetic_id(&label, fragment_id, index);

        let mut properties: Properties = vec![
            ("id".to_string(), PropertyValue::String(id.clone())),
            (
                "fragment_id".to_string(),
                PropertyValue::String(fragment_id.to_string()),
            ),
            ("doc_id".to_string(), PropertyValue::String(doc_id.to_string())),
        ];

        // Keys are compared after sanitizing, so provenance keys always win
        // and the first of two colliding keys is kept.
        for (raw_key, value) in entity {
            if raw_key.starts_with('_') {
                continue;
            }
            let key = sanitize_identifier(raw_key);
            if properties.iter().any(|(existing, _)| *existing == key) {
                debug!("Ignoring entity property '{}': '{}' is already set", raw_key, key);
                continue;
            }
            if let Some(value) = self.property_value(value) {
                properties.push((key, value));
            }
        }

        GraphEntity {
            label,
            id,
            properties,
        }
    }

    fn property_value(&self, value: &Value) -> Option<PropertyValue> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => PropertyValue::Integer(i),
                None => PropertyValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Value::String(s) => Some(PropertyValue::String(self.truncate(s))),
            Value::Array(_) | Value::Object(_) => {
                Some(PropertyValue::String(self.truncate(&value.to_string())))
            }
        }
    }

    fn truncate(&self, text: &str) -> String {
        text.chars().take(self.max_property_chars).collect()
    }
}
