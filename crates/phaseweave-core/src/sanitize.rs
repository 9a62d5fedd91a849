use crate::WorkflowDocument;

/// Top-level fields the server computes or owns. Echoing any of these
/// back on a create/update request gets the write rejected.
pub const WORKFLOW_READ_ONLY_FIELDS: &[&str] = &[
    "id",
    "active",
    "tags",
    "version",
    "versionId",
    "createdAt",
    "updatedAt",
    "isArchived",
    "meta",
    "pinData",
    "staticData",
    "activeVersionId",
    "versionCounter",
    "triggerCount",
    "shared",
    "activeVersion",
];

/// Node-level fields assigned by the server.
pub const NODE_READ_ONLY_FIELDS: &[&str] = &["id"];

/// Strips server-owned fields from a document before a write. The
/// denylists are configurable; the defaults track the current n8n API.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    workflow_denylist: Vec<String>,
    node_denylist: Vec<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            workflow_denylist: WORKFLOW_READ_ONLY_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            node_denylist: NODE_READ_ONLY_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Sanitizer {
    pub fn new(
        workflow_denylist: impl IntoIterator<Item = String>,
        node_denylist: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            workflow_denylist: workflow_denylist.into_iter().collect(),
            node_denylist: node_denylist.into_iter().collect(),
        }
    }

    /// Produce a copy of `doc` acceptable for server write operations.
    ///
    /// Idempotent: a sanitized document passes through unchanged. The
    /// structurally required `settings` and `connections` containers are
    /// concrete fields on [`WorkflowDocument`], so they are always
    /// present (and serialized) whether or not the input carried them.
    pub fn sanitize(&self, mut doc: WorkflowDocument) -> WorkflowDocument {
        for field in &self.workflow_denylist {
            doc.extra.remove(field);
        }
        for node in &mut doc.nodes {
            for field in &self.node_denylist {
                node.extra.remove(field);
            }
        }
        doc
    }
}

/// Sanitize with the default read-only denylists.
pub fn sanitize_for_write(doc: WorkflowDocument) -> WorkflowDocument {
    Sanitizer::default().sanitize(doc)
}
