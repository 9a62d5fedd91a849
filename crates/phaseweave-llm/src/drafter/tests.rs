use super::draft::draft_phase_with_backend;
use super::parse::{fenced_json, find_embedded_workflow};
use super::prompt::drafter_system_prompt;
use crate::conversation::ConversationSession;
use crate::{ChatBackend, ChatResponse, Choice, Message};
use phaseweave_core::WorkflowDocument;
use std::sync::Mutex;

// ── Test helpers ────────────────────────────────────────────────

/// Mock backend that returns a sequence of responses (for testing repair pass).
struct MockBackend {
    responses: Mutex<Vec<String>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockBackend {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn single(response: &str) -> Self {
        Self::new(vec![response])
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn system_prompt_of_call(&self, call: usize) -> String {
        self.calls.lock().unwrap()[call][0]
            .text_content()
            .unwrap_or_default()
            .to_string()
    }
}

impl ChatBackend for MockBackend {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, messages: Vec<Message>) -> anyhow::Result<ChatResponse> {
        self.calls.lock().unwrap().push(messages);
        let mut responses = self.responses.lock().unwrap();
        let text = if responses.is_empty() {
            "Sounds good.".to_string()
        } else {
            responses.remove(0)
        };
        Ok(ChatResponse {
            id: "mock".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(&text),
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        })
    }
}

const PHASE_ONE: &str = r##"Here is Phase 1 of your email alerting workflow:

```json
{
  "name": "Email Alerts - Phase 1",
  "nodes": [
    {
      "name": "Gmail Trigger",
      "type": "n8n-nodes-base.gmailTrigger",
      "typeVersion": 1,
      "position": [260, 300],
      "parameters": {"triggerOn": "newEmail", "status": "unread"}
    },
    {
      "name": "Send Slack Message",
      "type": "n8n-nodes-base.slack",
      "typeVersion": 2,
      "position": [480, 300],
      "parameters": {"channel": "#alerts"}
    }
  ],
  "connections": {
    "Gmail Trigger": {
      "main": [[{"node": "Send Slack Message", "type": "main", "index": 0}]]
    }
  },
  "settings": {}
}
```

Test it in n8n, then come back for Phase 2."##;

fn existing_workflow() -> WorkflowDocument {
    serde_json::from_value(serde_json::json!({
        "name": "Email Alerts",
        "nodes": [{
            "name": "Gmail Trigger",
            "type": "n8n-nodes-base.gmailTrigger",
            "parameters": {"triggerOn": "newEmail"}
        }],
        "connections": {}
    }))
    .unwrap()
}

// ── Unit tests ──────────────────────────────────────────────────

#[test]
fn test_fenced_json_variants() {
    assert_eq!(
        fenced_json("```json\n{\"nodes\": []}\n```"),
        Some(r#"{"nodes": []}"#)
    );
    assert_eq!(
        fenced_json("```\n{\"nodes\": []}\n```"),
        Some(r#"{"nodes": []}"#)
    );
    // Plain text and non-object fences are not candidates.
    assert_eq!(fenced_json("just an answer"), None);
    assert_eq!(fenced_json("```\nnpm install n8n\n```"), None);
}

#[test]
fn test_find_embedded_workflow_in_prose() {
    let text = r#"The plan (no fence, the model inlined it):
{"name": "X", "nodes": [], "connections": {}} and that's it."#;
    let value = find_embedded_workflow(text).unwrap();
    assert_eq!(value["name"], "X");
}

#[test]
fn test_find_embedded_workflow_skips_non_workflow_objects() {
    let text = r#"Config is {"retries": 3}. No workflow here."#;
    assert!(find_embedded_workflow(text).is_none());
}

#[test]
fn test_system_prompt_for_new_session_mentions_phase_one() {
    let prompt = drafter_system_prompt(None);
    assert!(prompt.contains("Phase 1"));
    assert!(prompt.contains("```json"));
}

#[test]
fn test_system_prompt_embeds_existing_node_keys() {
    let doc = existing_workflow();
    let prompt = drafter_system_prompt(Some(&doc));
    assert!(prompt.contains("Gmail Trigger"));
    assert!(prompt.contains("n8n-nodes-base.gmailTrigger"));
    assert!(prompt.contains("NEXT PHASE"));
}

// ── Drafting integration tests ──────────────────────────────────

#[tokio::test]
async fn test_draft_parses_fenced_document() {
    let mock = MockBackend::single(PHASE_ONE);
    let result =
        draft_phase_with_backend(&mock, "Alert me on Slack for new email", None, &ConversationSession::new())
            .await
            .unwrap();

    let doc = result.document.unwrap();
    assert_eq!(doc.name, "Email Alerts - Phase 1");
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.connections.len(), 1);
    assert!(result.reply.contains("come back for Phase 2"));
    assert!(result.warnings.is_empty());
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_draft_without_json_is_conversational() {
    let mock = MockBackend::single("n8n is a workflow automation platform.");
    let result = draft_phase_with_backend(&mock, "What is n8n?", None, &ConversationSession::new())
        .await
        .unwrap();

    assert!(result.document.is_none());
    assert_eq!(result.reply, "n8n is a workflow automation platform.");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_draft_sends_existing_workflow_context() {
    let mock = MockBackend::single("Sure, what should Phase 2 add?");
    let doc = existing_workflow();
    let mut history = ConversationSession::new();
    history.push_user("Alert me on Slack".into());
    history.push_assistant("Done, Phase 1 created.".into());

    draft_phase_with_backend(&mock, "Now label the emails", Some(&doc), &history)
        .await
        .unwrap();

    let system = mock.system_prompt_of_call(0);
    assert!(system.contains("Gmail Trigger"));
    // History rides along between system and the new user message.
    let calls = mock.calls.lock().unwrap();
    assert_eq!(calls[0].len(), 4);
    assert_eq!(calls[0][1].role, "user");
    assert_eq!(calls[0][3].text_content(), Some("Now label the emails"));
}

#[tokio::test]
async fn test_repair_pass_fixes_broken_fence() {
    let bad = "```json\n{\"name\": \"X\", \"nodes\": [broken]}\n```";
    let mock = MockBackend::new(vec![bad, PHASE_ONE]);

    let result = draft_phase_with_backend(&mock, "Alert me", None, &ConversationSession::new())
        .await
        .unwrap();

    assert!(result.document.is_some());
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_repair_pass_fails_after_max_attempts() {
    let bad = "```json\nnot even close\n```";
    let mock = MockBackend::new(vec![bad, bad]);

    let result =
        draft_phase_with_backend(&mock, "Alert me", None, &ConversationSession::new()).await;

    assert!(result.is_err());
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_structural_validation_triggers_repair() {
    // Parses fine but has zero nodes; the repair pass gets the
    // validation message and the second attempt succeeds.
    let empty = "```json\n{\"name\": \"Empty\", \"nodes\": [], \"connections\": {}}\n```";
    let mock = MockBackend::new(vec![empty, PHASE_ONE]);

    let result = draft_phase_with_backend(&mock, "Alert me", None, &ConversationSession::new())
        .await
        .unwrap();

    assert_eq!(result.document.unwrap().nodes.len(), 2);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_unnamed_draft_warns_but_succeeds() {
    let unnamed = r#"```json
{
  "nodes": [{"name": "Gmail Trigger", "type": "n8n-nodes-base.gmailTrigger", "parameters": {}}],
  "connections": {}
}
```"#;
    let mock = MockBackend::single(unnamed);
    let result = draft_phase_with_backend(&mock, "Alert me", None, &ConversationSession::new())
        .await
        .unwrap();

    let doc = result.document.unwrap();
    assert!(doc.name.is_empty());
    assert_eq!(result.warnings.len(), 1);
}
