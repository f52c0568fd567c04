//! In-process graph store

use buildkg_domain::{GraphMutation, GraphStore, Properties, PropertyValue, VertexRef};
use tracing::debug;

use crate::error::GraphError;

/// A vertex held by [`MemoryGraphStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVertex {
    /// Label
    pub label: String,
    /// Value of the `id` property
    pub id: String,
    /// All properties
    pub properties: Properties,
}

/// An edge held by [`MemoryGraphStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEdge {
    /// Label
    pub label: String,
    /// Source vertex
    pub from: VertexRef,
    /// Target vertex
    pub to: VertexRef,
}

/// Graph store backed by vectors.
///
/// Follows Cypher semantics closely enough for tests: `CREATE` always
/// appends, `MATCH` against duplicated vertices produces one edge per
/// matching pair, and an edge whose endpoints do not exist is silently not
/// created. [`GraphStore::apply`] is all-or-nothing.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    vertices: Vec<StoredVertex>,
    edges: Vec<StoredEdge>,
    fail_on_label: Option<String>,
    close_count: usize,
}

impl MemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every mutation that writes this label
    pub fn fail_on_label(mut self, label: impl Into<String>) -> Self {
        self.fail_on_label = Some(label.into());
        self
    }

    /// All vertices, in insertion order
    pub fn vertices(&self) -> &[StoredVertex] {
        &self.vertices
    }

    /// All edges, in insertion order
    pub fn edges(&self) -> &[StoredEdge] {
        &self.edges
    }

    /// Number of vertices with this label and id
    pub fn count_vertices(&self, label: &str, id: &str) -> usize {
        self.vertices
            .iter()
            .filter(|v| v.label == label && v.id == id)
            .count()
    }

    /// How many times `close` was called
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    fn check(&self, mutation: &GraphMutation) -> Result<(), GraphError> {
        match &self.fail_on_label {
            Some(label) if mutation.label() == label => Err(GraphError::Query(format!(
                "rejected write for label {}",
                label
            ))),
            _ => Ok(()),
        }
    }

    fn count_matches(&self, vertex: &VertexRef) -> usize {
        self.count_vertices(&vertex.label, &vertex.id)
    }

    fn write(&mut self, mutation: &GraphMutation) {
        match mutation {
            GraphMutation::CreateVertex { label, properties } => {
                let id = properties
                    .iter()
                    .find_map(|(key, value)| match (key.as_str(), value) {
                        ("id", PropertyValue::String(id)) => Some(id.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                self.vertices.push(StoredVertex {
                    label: label.clone(),
                    id,
                    properties: properties.clone(),
                });
            }
            GraphMutation::MergeVertex {
                label,
                id,
                properties,
            } => {
                let existing = self
                    .vertices
                    .iter_mut()
                    .find(|v| &v.label == label && &v.id == id);
                match existing {
                    Some(vertex) => {
                        for (key, value) in properties {
                            match vertex.properties.iter_mut().find(|(k, _)| k == key) {
                                Some(slot) => slot.1 = value.clone(),
                                None => vertex.properties.push((key.clone(), value.clone())),
                            }
                        }
                    }
                    None => self.vertices.push(StoredVertex {
                        label: label.clone(),
                        id: id.clone(),
                        properties: properties.clone(),
                    }),
                }
            }
            GraphMutation::CreateEdge { label, from, to } => {
                let pairs = self.count_matches(from) * self.count_matches(to);
                if pairs == 0 {
                    debug!("No vertices matched for edge {} {:?} -> {:?}", label, from, to);
                }
                for _ in 0..pairs {
                    self.edges.push(StoredEdge {
                        label: label.clone(),
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
            GraphMutation::MergeEdge { label, from, to } => {
                let exists = self
                    .edges
                    .iter()
                    .any(|e| &e.label == label && &e.from == from && &e.to == to);
                if !exists && self.count_matches(from) > 0 && self.count_matches(to) > 0 {
                    self.edges.push(StoredEdge {
                        label: label.clone(),
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }
    }
}

impl GraphStore for MemoryGraphStore {
    type Error = GraphError;

    async fn execute(&mut self, mutation: &GraphMutation) -> Result<(), GraphError> {
        self.check(mutation)?;
        self.write(mutation);
        Ok(())
    }

    async fn apply(&mut self, mutations: &[GraphMutation]) -> Result<(), GraphError> {
        for mutation in mutations {
            self.check(mutation)?;
        }
        for mutation in mutations {
            self.write(mutation);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), GraphError> {
        self.close_count += 1;
        Ok(())
    }
}
