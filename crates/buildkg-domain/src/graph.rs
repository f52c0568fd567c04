//! Graph mutations
//!
//! Loaders describe what to write as [`GraphMutation`] values. Turning a
//! mutation into query text is the job of the store that executes it, which
//! is the only place escaping happens.

/// Number of leading fragment-id characters used in synthetic ids.
const FRAGMENT_PREFIX_CHARS: usize = 8;

/// A scalar property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Text
    String(String),
    /// Whole number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

/// Ordered property list. Order is preserved into the rendered query.
pub type Properties = Vec<(String, PropertyValue)>;

/// Identifies a vertex by label and synthetic id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexRef {
    /// Vertex label
    pub label: String,
    /// Synthetic id property
    pub id: String,
}

/// One write against the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphMutation {
    /// Create a new vertex (duplicates allowed)
    CreateVertex {
        /// Vertex label
        label: String,
        /// Properties, including `id`
        properties: Properties,
    },

    /// Create the vertex if no vertex with this label and id exists,
    /// otherwise update its properties
    MergeVertex {
        /// Vertex label
        label: String,
        /// Synthetic id
        id: String,
        /// Properties to set
        properties: Properties,
    },

    /// Connect two existing vertices
    CreateEdge {
        /// Edge label
        label: String,
        /// Source vertex
        from: VertexRef,
        /// Target vertex
        to: VertexRef,
    },

    /// Connect two existing vertices unless an edge with this label
    /// already joins them
    MergeEdge {
        /// Edge label
        label: String,
        /// Source vertex
        from: VertexRef,
        /// Target vertex
        to: VertexRef,
    },
}

impl GraphMutation {
    /// Label of the vertex or edge being written
    pub fn label(&self) -> &str {
        match self {
            GraphMutation::CreateVertex { label, .. }
            | GraphMutation::MergeVertex { label, .. }
            | GraphMutation::CreateEdge { label, .. }
            | GraphMutation::MergeEdge { label, .. } => label,
        }
    }

    /// Whether this mutation writes an edge
    pub fn is_edge(&self) -> bool {
        matches!(
            self,
            GraphMutation::CreateEdge { .. } | GraphMutation::MergeEdge { .. }
        )
    }
}

/// An entity ready to be written, with its resolved label and id.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEntity {
    /// Resolved label
    pub label: String,
    /// Synthetic id
    pub id: String,
    /// Properties, including the provenance keys
    pub properties: Properties,
}

impl GraphEntity {
    /// Reference this entity from an edge
    pub fn vertex_ref(&self) -> VertexRef {
        VertexRef {
            label: self.label.clone(),
            id: self.id.clone(),
        }
    }
}

/// An edge between two entities of the same extraction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRelationship {
    /// Edge label
    pub label: String,
    /// Position of the source in the entities array
    pub from_index: usize,
    /// Position of the target in the entities array
    pub to_index: usize,
}

/// Build the synthetic vertex id `{label}_{fragment_id[..8]}_{index}`.
///
/// The prefix is taken in characters, not bytes. Ids are deterministic for
/// the same inputs, so reloading a fragment reproduces the same ids.
pub fn synthetic_id(label: &str, fragment_id: &str, index: usize) -> String {
    let prefix: String = fragment_id.chars().take(FRAGMENT_PREFIX_CHARS).collect();
    format!("{}_{}_{}", label, prefix, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_synthetic_id_format() {
        assert_eq!(
            synthetic_id("Provision", "3f2a9c1e-aaaa-bbbb", 0),
            "Provision_3f2a9c1e_0"
        );
        assert_eq!(synthetic_id("Entity", "abc", 4), "Entity_abc_4");
    }

    #[test]
    fn test_vertex_ref() {
        let entity = GraphEntity {
            label: "Requirement".to_string(),
            id: "Requirement_f1_1".to_string(),
            properties: vec![],
        };
        let r = entity.vertex_ref();
        assert_eq!(r.label, "Requirement");
        assert_eq!(r.id, "Requirement_f1_1");
    }

    proptest! {
        #[test]
        fn prop_synthetic_id_is_deterministic(
            label in "[A-Za-z]{1,12}",
            fragment in "\\PC{0,20}",
            index in 0usize..1000,
        ) {
            prop_assert_eq!(
                synthetic_id(&label, &fragment, index),
                synthetic_id(&label, &fragment, index)
            );
        }

        #[test]
        fn prop_synthetic_id_distinguishes_indices(
            fragment in "[0-9a-f]{8,36}",
            a in 0usize..1000,
            b in 0usize..1000,
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(
                synthetic_id("Entity", &fragment, a),
                synthetic_id("Entity", &fragment, b)
            );
        }
    }
}
