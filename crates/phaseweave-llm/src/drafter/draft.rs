use super::DraftResult;
use super::parse::{fenced_json, find_embedded_workflow};
use super::prompt::drafter_system_prompt;
use super::repair::chat_with_repair;
use crate::conversation::ConversationSession;
use crate::{ChatBackend, LlmClient, LlmConfig, Message};
use anyhow::{Context, Result};
use phaseweave_core::{WorkflowDocument, validate_document};
use serde_json::Value;
use tracing::info;

/// Draft the next phase using the drafter LLM.
pub async fn draft_phase(
    user_prompt: &str,
    drafter_config: LlmConfig,
    current: Option<&WorkflowDocument>,
    history: &ConversationSession,
) -> Result<DraftResult> {
    let drafter = LlmClient::new(drafter_config);
    draft_phase_with_backend(&drafter, user_prompt, current, history).await
}

/// Draft a phase using a given ChatBackend (for testability).
/// On parse or validation failure, retries once with the error message appended.
pub async fn draft_phase_with_backend(
    backend: &impl ChatBackend,
    user_prompt: &str,
    current: Option<&WorkflowDocument>,
    history: &ConversationSession,
) -> Result<DraftResult> {
    let system = drafter_system_prompt(current);

    info!("Drafting phase for prompt: {}", user_prompt);

    let mut messages = vec![Message::system(&system)];
    messages.extend(history.context_messages(None));
    messages.push(Message::user(user_prompt));

    let result = chat_with_repair(backend, "Drafter", messages, parse_draft).await?;

    match &result.document {
        Some(doc) => info!(
            "Drafted phase '{}': {} nodes, {} connection sources, {} warnings",
            doc.name,
            doc.nodes.len(),
            doc.connections.len(),
            result.warnings.len(),
        ),
        None => info!("Conversational reply, no workflow drafted"),
    }

    Ok(result)
}

/// Locate and decode the workflow document in a drafter reply.
///
/// A fenced block that fails to parse is an error and goes to the repair
/// pass. A reply with no candidate at all is a conversational turn.
fn parse_draft(content: &str) -> Result<DraftResult> {
    if let Some(json_str) = fenced_json(content) {
        let value: Value =
            serde_json::from_str(json_str).context("Fenced JSON did not parse")?;
        return document_from_value(value, content);
    }

    if let Some(value) = find_embedded_workflow(content) {
        return document_from_value(value, content);
    }

    Ok(DraftResult {
        reply: content.to_string(),
        document: None,
        warnings: Vec::new(),
    })
}

fn document_from_value(value: Value, reply: &str) -> Result<DraftResult> {
    let document: WorkflowDocument =
        serde_json::from_value(value).context("JSON is not a workflow document")?;

    let mut warnings = Vec::new();
    if document.name.trim().is_empty() {
        // Naming is recovered by the session layer; only the structural
        // checks should send the draft back for repair.
        warnings.push("Drafted workflow has no name; a session default will be used".to_string());
        let mut named = document.clone();
        named.name = "unnamed".to_string();
        validate_document(&named)?;
    } else {
        validate_document(&document)?;
    }

    Ok(DraftResult {
        reply: reply.to_string(),
        document: Some(document),
        warnings,
    })
}
