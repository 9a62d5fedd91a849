use crate::WorkflowDocument;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Workflow name is empty")]
    EmptyName,

    #[error("Workflow has no nodes")]
    NoNodes,

    #[error("Node at index {0} has no name")]
    NodeWithoutName(usize),

    #[error("Node '{0}' has no type")]
    NodeWithoutType(String),

    #[error("Connections reference unknown source node '{0}'")]
    UnknownConnectionSource(String),

    #[error("Connection from '{from}' targets unknown node '{target}'")]
    UnknownConnectionTarget { from: String, target: String },
}

/// Check the structural invariants the server enforces on write.
///
/// The merge core assumes well-formed inputs; callers run this first.
pub fn validate_document(doc: &WorkflowDocument) -> Result<(), ValidationError> {
    if doc.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if doc.nodes.is_empty() {
        return Err(ValidationError::NoNodes);
    }

    for (i, node) in doc.nodes.iter().enumerate() {
        if node.name.trim().is_empty() {
            return Err(ValidationError::NodeWithoutName(i));
        }
        if node.node_type.trim().is_empty() {
            return Err(ValidationError::NodeWithoutType(node.name.clone()));
        }
    }

    let names: HashSet<&str> = doc.nodes.iter().map(|n| n.name.as_str()).collect();
    for (source, set) in &doc.connections {
        if !names.contains(source.as_str()) {
            return Err(ValidationError::UnknownConnectionSource(source.clone()));
        }
        for branch in &set.main {
            for edge in branch {
                if !names.contains(edge.node.as_str()) {
                    return Err(ValidationError::UnknownConnectionTarget {
                        from: source.clone(),
                        target: edge.node.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}
