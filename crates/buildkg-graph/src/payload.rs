//! Parsed extraction results

use serde_json::{Map, Value};

use crate::error::GraphError;

/// Entities and relationships returned by the model for one fragment.
///
/// Entities are JSON objects; keys starting with `_` are directives
/// (`_label`) rather than properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionPayload {
    /// Entity objects, in response order
    pub entities: Vec<Map<String, Value>>,
    /// Relationship directives
    pub relationships: Vec<RelationshipSpec>,
}

/// One relationship directive.
///
/// Indices that are absent default to 0; indices that are present but not
/// non-negative integers become `None` and the edge is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipSpec {
    /// Edge label (`_label`), if the model gave one
    pub label: Option<String>,
    /// Source entity index (`_from_index`)
    pub from_index: Option<usize>,
    /// Target entity index (`_to_index`)
    pub to_index: Option<usize>,
}

impl ExtractionPayload {
    /// Interpret a parsed JSON response.
    ///
    /// Missing or null `entities` / `relationships` are treated as empty.
    pub fn from_value(value: Value) -> Result<Self, GraphError> {
        let Value::Object(mut root) = value else {
            return Err(GraphError::InvalidPayload(
                "expected a JSON object at the top level".to_string(),
            ));
        };

        let entities = match root.remove("entities") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::Object(map) => Ok(map),
                    _ => Err(GraphError::InvalidPayload(format!(
                        "entity {} is not an object",
                        idx
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(GraphError::InvalidPayload(
                    "'entities' must be an array".to_string(),
                ))
            }
        };

        let relationships = match root.remove("relationships") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_object)
                .map(RelationshipSpec::from_object)
                .collect(),
            Some(_) => {
                return Err(GraphError::InvalidPayload(
                    "'relationships' must be an array".to_string(),
                ))
            }
        };

        Ok(Self {
            entities,
            relationships,
        })
    }

    /// Whether there is anything to load
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl RelationshipSpec {
    fn from_object(object: &Map<String, Value>) -> Self {
        let index = |key: &str| match object.get(key) {
            None | Some(Value::Null) => Some(0),
            Some(value) => value.as_u64().map(|n| n as usize),
        };
        Self {
            label: object
                .get("_label")
                .and_then(Value::as_str)
                .filter(|label| !label.is_empty())
                .map(str::to_string),
            from_index: index("_from_index"),
            to_index: index("_to_index"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_entities_and_relationships() {
        let payload = ExtractionPayload::from_value(json!({
            "entities": [{"_label": "Provision", "text": "x"}, {"name": "y"}],
            "relationships": [{"_label": "DERIVED_FROM", "_from_index": 1, "_to_index": 0}]
        }))
        .unwrap();

        assert_eq!(payload.entities.len(), 2);
        assert_eq!(
            payload.relationships,
            vec![RelationshipSpec {
                label: Some("DERIVED_FROM".to_string()),
                from_index: Some(1),
                to_index: Some(0),
            }]
        );
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let payload = ExtractionPayload::from_value(json!({"entities": null})).unwrap();
        assert!(payload.is_empty());
        assert!(payload.relationships.is_empty());
    }

    #[test]
    fn test_relationship_defaults() {
        let payload = ExtractionPayload::from_value(json!({
            "entities": [{}],
            "relationships": [{}, {"_from_index": -1, "_to_index": "2"}]
        }))
        .unwrap();

        assert_eq!(payload.relationships[0].label, None);
        assert_eq!(payload.relationships[0].from_index, Some(0));
        assert_eq!(payload.relationships[1].from_index, None);
        assert_eq!(payload.relationships[1].to_index, None);
    }

    #[test]
    fn test_rejects_non_object_root() {
        assert!(ExtractionPayload::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_rejects_non_object_entity() {
        assert!(ExtractionPayload::from_value(json!({"entities": ["Provision"]})).is_err());
    }
}
