use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A complete workflow definition as exchanged with the n8n server.
///
/// Fields the engine manipulates are typed; everything else the server
/// attaches (id, active, tags, timestamps, ...) lands in `extra` so a
/// fetched document round-trips and the sanitizer can strip it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionSet>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The server-assigned workflow identifier, if this document came
    /// from (or was confirmed by) the server.
    pub fn server_id(&self) -> Option<&str> {
        self.extra.get("id").and_then(|v| v.as_str())
    }

    pub fn find_node(&self, key: &NodeKey) -> Option<&NodeDocument> {
        self.nodes.iter().find(|n| n.key() == *key)
    }
}

/// A typed unit of work within a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 2]>,
    #[serde(
        default,
        rename = "typeVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_version: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeDocument {
    /// Merge identity: two nodes are the same node iff name AND type match.
    pub fn key(&self) -> NodeKey {
        NodeKey {
            name: self.name.clone(),
            node_type: self.node_type.clone(),
        }
    }
}

/// Identity key for node reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub name: String,
    pub node_type: String,
}

/// Outgoing connections of a single source node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSet {
    #[serde(default)]
    pub main: Vec<ConnectionBranch>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An ordered group of edges leaving one output slot.
pub type ConnectionBranch = Vec<ConnectionTarget>;

/// A directed edge into a downstream node's input slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTarget {
    pub node: String,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub index: u32,
}
