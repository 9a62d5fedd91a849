use phaseweave_core::{WorkflowDocument, merge};
use phaseweave_n8n::{ApiError, WorkflowStore};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Phase {declared} is out of order (last submitted phase was {current})")]
    OutOfOrderPhase { declared: u32, current: u32 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Bookkeeping for one workflow-building session. A plain value, not
/// ambient state: `submit_phase` consumes a context and returns the
/// updated one.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub workflow_id: Option<String>,
    pub workflow_name: Option<String>,
    /// Highest phase submitted so far; 0 before the first submission.
    pub phase: u32,
    pub history: Vec<PhaseRecord>,
}

#[derive(Debug, Clone)]
pub struct PhaseRecord {
    pub phase: u32,
    pub workflow_id: String,
    pub name: String,
}

#[derive(Debug)]
pub enum PhaseOutcome {
    Created {
        workflow_id: String,
        editor_url: String,
        phase: u32,
    },
    Updated {
        workflow_id: String,
        editor_url: String,
        phase: u32,
    },
}

/// Submit a drafted phase document to the server.
///
/// The first submission of a session creates the workflow. Every later
/// submission fetches the current server document, merges the phase into
/// it, and writes the merged document back in full: the update contract
/// is whole-document replacement, so the merge is what keeps phase N
/// intact while phase N+1 lands.
pub async fn submit_phase(
    store: &impl WorkflowStore,
    mut ctx: SessionContext,
    mut document: WorkflowDocument,
) -> Result<(SessionContext, PhaseOutcome), SessionError> {
    if document.name.trim().is_empty() {
        document.name = default_workflow_name();
    }

    let phase = check_phase_order(&ctx, extract_phase_number(&document.name))?;

    let (confirmed, created) = match ctx.workflow_id.clone() {
        None => (store.create(document).await?, true),
        Some(id) => {
            let existing = store.fetch(&id).await?;
            let merged = merge(existing, document);
            (store.replace(&id, merged).await?, false)
        }
    };

    let workflow_id = confirmed
        .server_id()
        .map(str::to_string)
        .ok_or_else(|| ApiError::Unexpected("server response carries no workflow id".into()))?;

    info!(
        phase,
        workflow = %workflow_id,
        created,
        "phase submitted"
    );

    ctx.workflow_id = Some(workflow_id.clone());
    ctx.workflow_name = Some(confirmed.name.clone());
    ctx.phase = phase;
    ctx.history.push(PhaseRecord {
        phase,
        workflow_id: workflow_id.clone(),
        name: confirmed.name,
    });

    let editor_url = store.editor_url(&workflow_id);
    let outcome = if created {
        PhaseOutcome::Created {
            workflow_id,
            editor_url,
            phase,
        }
    } else {
        PhaseOutcome::Updated {
            workflow_id,
            editor_url,
            phase,
        }
    };

    Ok((ctx, outcome))
}

/// Decide the effective phase number before anything touches the network.
///
/// Re-submitting the current phase (a revision) and advancing to the next
/// phase are both fine; regressions and skipped numbers are rejected.
fn check_phase_order(ctx: &SessionContext, declared: Option<u32>) -> Result<u32, SessionError> {
    let next = ctx.phase + 1;
    match declared {
        None => Ok(next),
        Some(p) if p == next || (p == ctx.phase && ctx.phase > 0) => Ok(p),
        Some(p) => Err(SessionError::OutOfOrderPhase {
            declared: p,
            current: ctx.phase,
        }),
    }
}

/// Parse a "Phase N" marker out of a workflow title.
pub fn extract_phase_number(name: &str) -> Option<u32> {
    static PHASE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PHASE_RE.get_or_init(|| Regex::new(r"(?i)phase\s+(\d+)").expect("valid phase regex"));
    re.captures(name).and_then(|c| c[1].parse().ok())
}

/// Give an unnamed draft a name: recover one from the raw reply if the
/// model mentioned it outside the parsed JSON, else use a timestamped
/// default.
pub fn ensure_named(document: &mut WorkflowDocument, raw_reply: &str) {
    if !document.name.trim().is_empty() {
        return;
    }
    document.name = recover_name_from_reply(raw_reply).unwrap_or_else(default_workflow_name);
}

fn recover_name_from_reply(reply: &str) -> Option<String> {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = NAME_RE
        .get_or_init(|| Regex::new(r#""name"\s*:\s*"([^"]+)""#).expect("valid name regex"));
    re.captures(reply).map(|c| c[1].to_string())
}

fn default_workflow_name() -> String {
    format!(
        "Drafted Workflow - {}",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use phaseweave_core::NodeDocument;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory store standing in for the n8n API.
    struct MockStore {
        on_server: Mutex<Option<WorkflowDocument>>,
        created: Mutex<Vec<WorkflowDocument>>,
        replaced: Mutex<Vec<(String, WorkflowDocument)>>,
    }

    impl MockStore {
        fn new(on_server: Option<WorkflowDocument>) -> Self {
            Self {
                on_server: Mutex::new(on_server),
                created: Mutex::new(Vec::new()),
                replaced: Mutex::new(Vec::new()),
            }
        }

        fn confirm(mut doc: WorkflowDocument) -> WorkflowDocument {
            doc.extra.insert("id".into(), json!("wf-1"));
            doc
        }
    }

    impl WorkflowStore for MockStore {
        async fn fetch(&self, id: &str) -> Result<WorkflowDocument, ApiError> {
            self.on_server
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ApiError::NotFound(id.to_string()))
        }

        async fn create(&self, doc: WorkflowDocument) -> Result<WorkflowDocument, ApiError> {
            self.created.lock().unwrap().push(doc.clone());
            let confirmed = Self::confirm(doc);
            *self.on_server.lock().unwrap() = Some(confirmed.clone());
            Ok(confirmed)
        }

        async fn replace(
            &self,
            id: &str,
            doc: WorkflowDocument,
        ) -> Result<WorkflowDocument, ApiError> {
            self.replaced.lock().unwrap().push((id.to_string(), doc.clone()));
            let confirmed = Self::confirm(doc);
            *self.on_server.lock().unwrap() = Some(confirmed.clone());
            Ok(confirmed)
        }

        fn editor_url(&self, id: &str) -> String {
            format!("http://localhost:5678/workflow/{id}")
        }
    }

    fn phase_doc(name: &str, nodes: &[(&str, &str)]) -> WorkflowDocument {
        let mut doc = WorkflowDocument::new(name);
        doc.nodes = nodes
            .iter()
            .map(|(name, node_type)| NodeDocument {
                name: (*name).into(),
                node_type: (*node_type).into(),
                ..Default::default()
            })
            .collect();
        doc
    }

    #[tokio::test]
    async fn first_submission_creates() {
        let store = MockStore::new(None);
        let doc = phase_doc(
            "Email Alerts - Phase 1",
            &[("Gmail Trigger", "n8n-nodes-base.gmailTrigger")],
        );

        let (ctx, outcome) = submit_phase(&store, SessionContext::default(), doc)
            .await
            .unwrap();

        assert_eq!(store.created.lock().unwrap().len(), 1);
        assert!(store.replaced.lock().unwrap().is_empty());
        assert_eq!(ctx.workflow_id.as_deref(), Some("wf-1"));
        assert_eq!(ctx.phase, 1);
        assert_eq!(ctx.history.len(), 1);
        assert!(matches!(outcome, PhaseOutcome::Created { phase: 1, .. }));
    }

    #[tokio::test]
    async fn later_submission_fetches_merges_and_replaces() {
        let mut existing = phase_doc(
            "Email Alerts",
            &[("Gmail Trigger", "n8n-nodes-base.gmailTrigger")],
        );
        existing.nodes[0]
            .parameters
            .insert("triggerOn".into(), json!("newEmail"));
        existing.extra.insert("id".into(), json!("wf-1"));

        let store = MockStore::new(Some(existing));
        let ctx = SessionContext {
            workflow_id: Some("wf-1".into()),
            workflow_name: Some("Email Alerts".into()),
            phase: 1,
            history: Vec::new(),
        };

        let mut phase2 = phase_doc(
            "Email Alerts - Phase 2",
            &[
                ("Gmail Trigger", "n8n-nodes-base.gmailTrigger"),
                ("Send Slack Message", "n8n-nodes-base.slack"),
            ],
        );
        phase2.nodes[0]
            .parameters
            .insert("includeLabels".into(), json!(true));

        let (ctx, outcome) = submit_phase(&store, ctx, phase2).await.unwrap();

        let replaced = store.replaced.lock().unwrap();
        assert_eq!(replaced.len(), 1);
        let (id, merged) = &replaced[0];
        assert_eq!(id, "wf-1");
        // The merge happened before the write: phase 1 parameters survive
        // next to the phase 2 addition, and the new node was appended.
        assert_eq!(merged.nodes.len(), 2);
        assert_eq!(merged.nodes[0].parameters["triggerOn"], json!("newEmail"));
        assert_eq!(merged.nodes[0].parameters["includeLabels"], json!(true));
        assert_eq!(merged.name, "Email Alerts");

        assert_eq!(ctx.phase, 2);
        assert!(matches!(outcome, PhaseOutcome::Updated { phase: 2, .. }));
    }

    #[tokio::test]
    async fn out_of_order_phase_is_rejected_before_any_call() {
        let store = MockStore::new(None);
        let ctx = SessionContext {
            workflow_id: Some("wf-1".into()),
            phase: 1,
            ..Default::default()
        };
        let doc = phase_doc(
            "Email Alerts - Phase 3",
            &[("Gmail Trigger", "n8n-nodes-base.gmailTrigger")],
        );

        let err = submit_phase(&store, ctx, doc).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::OutOfOrderPhase {
                declared: 3,
                current: 1
            }
        ));
        assert!(store.created.lock().unwrap().is_empty());
        assert!(store.replaced.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resubmitting_current_phase_is_a_revision() {
        let existing = phase_doc(
            "Email Alerts",
            &[("Gmail Trigger", "n8n-nodes-base.gmailTrigger")],
        );
        let store = MockStore::new(Some(existing));
        let ctx = SessionContext {
            workflow_id: Some("wf-1".into()),
            phase: 2,
            ..Default::default()
        };
        let doc = phase_doc(
            "Email Alerts - Phase 2",
            &[("Gmail Trigger", "n8n-nodes-base.gmailTrigger")],
        );

        let (ctx, _) = submit_phase(&store, ctx, doc).await.unwrap();
        assert_eq!(ctx.phase, 2);
    }

    #[tokio::test]
    async fn unnamed_document_gets_a_default_name() {
        let store = MockStore::new(None);
        let doc = phase_doc("", &[("Gmail Trigger", "n8n-nodes-base.gmailTrigger")]);

        let (ctx, _) = submit_phase(&store, SessionContext::default(), doc)
            .await
            .unwrap();

        let name = ctx.workflow_name.unwrap();
        assert!(name.starts_with("Drafted Workflow - "));
    }

    #[test]
    fn phase_number_extraction() {
        assert_eq!(extract_phase_number("Email Alerts - Phase 2"), Some(2));
        assert_eq!(extract_phase_number("phase 10: cleanup"), Some(10));
        assert_eq!(extract_phase_number("Email Alerts"), None);
    }

    #[test]
    fn ensure_named_recovers_from_reply() {
        let mut doc = WorkflowDocument::new("");
        ensure_named(&mut doc, r#"I called it "name": "Inbox Triage" in the JSON."#);
        assert_eq!(doc.name, "Inbox Triage");

        let mut doc = WorkflowDocument::new("Already Named");
        ensure_named(&mut doc, r#""name": "Something Else""#);
        assert_eq!(doc.name, "Already Named");
    }
}
