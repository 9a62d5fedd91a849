use crate::session::{PhaseOutcome, SessionContext, SessionError, ensure_named, submit_phase};
use anyhow::Result;
use phaseweave_core::WorkflowDocument;
use phaseweave_llm::{LlmClient, conversation::ConversationSession, drafter};
use phaseweave_n8n::N8nClient;
use std::io::{BufRead, Write};
use tracing::warn;

/// Line-oriented chat front-end: each user turn drafts a phase and, when
/// the reply carries a workflow document, submits it to n8n.
pub struct ChatApp {
    llm: LlmClient,
    n8n: N8nClient,
    ctx: SessionContext,
    history: ConversationSession,
}

impl ChatApp {
    pub fn new(llm: LlmClient, n8n: N8nClient) -> Self {
        Self {
            llm,
            n8n,
            ctx: SessionContext::default(),
            history: ConversationSession::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("phaseweave: describe an automation; I'll build it in n8n phase by phase.");
        println!("Commands: status, reset, quit\n");

        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            print!("you> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next() else { break };
            let line = line?;
            let input = line.trim();

            match input {
                "" => continue,
                "quit" | "exit" => break,
                "reset" => {
                    self.ctx = SessionContext::default();
                    self.history = ConversationSession::new();
                    println!("Session cleared; the next phase starts a new workflow.\n");
                }
                "status" => self.print_status(),
                _ => {
                    if let Err(err) = self.turn(input).await {
                        eprintln!("error: {err:#}\n");
                    }
                }
            }
        }

        Ok(())
    }

    fn print_status(&self) {
        match &self.ctx.workflow_id {
            Some(id) => {
                println!(
                    "Workflow '{}' ({}), phase {}",
                    self.ctx.workflow_name.as_deref().unwrap_or("unnamed"),
                    id,
                    self.ctx.phase,
                );
                for record in &self.ctx.history {
                    println!("  phase {}: {} [{}]", record.phase, record.name, record.workflow_id);
                }
                println!("  {}\n", self.n8n.workflow_url(id));
            }
            None => println!("No active workflow yet.\n"),
        }
    }

    async fn turn(&mut self, prompt: &str) -> Result<()> {
        self.history.push_user(prompt.to_string());

        let current = self.fetch_current().await;
        let result =
            drafter::draft_phase_with_backend(&self.llm, prompt, current.as_ref(), &self.history)
                .await?;

        println!("\n{}\n", result.reply);
        for warning in &result.warnings {
            println!("note: {warning}");
        }
        self.history.push_assistant(result.reply.clone());

        let Some(mut document) = result.document else {
            return Ok(());
        };
        ensure_named(&mut document, &result.reply);

        match submit_phase(&self.n8n, self.ctx.clone(), document).await {
            Ok((ctx, outcome)) => {
                self.ctx = ctx;
                report_outcome(&outcome);
            }
            Err(SessionError::Api(err)) => {
                println!("Failed to push the phase to n8n: {err}");
                println!("Suggestion: {}\n", err.suggestion());
            }
            Err(err @ SessionError::OutOfOrderPhase { .. }) => {
                println!("{err}");
                println!("Suggestion: re-draft the phase with the expected number, or 'reset' to start over.\n");
            }
        }

        Ok(())
    }

    /// The server-side document gives the drafter its node-identity
    /// context. Losing it (e.g. the workflow was deleted out from under
    /// the session) degrades to a fresh draft rather than failing the turn.
    async fn fetch_current(&self) -> Option<WorkflowDocument> {
        let id = self.ctx.workflow_id.as_ref()?;
        match self.n8n.get_workflow(id).await {
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!(%id, %err, "could not fetch current workflow for drafting context");
                None
            }
        }
    }
}

fn report_outcome(outcome: &PhaseOutcome) {
    match outcome {
        PhaseOutcome::Created {
            workflow_id,
            editor_url,
            phase,
        } => {
            println!("Phase {phase} created in n8n (workflow {workflow_id}): {editor_url}");
            println!("Test it there, then come back to describe phase {}.\n", phase + 1);
        }
        PhaseOutcome::Updated {
            workflow_id,
            editor_url,
            phase,
        } => {
            println!("Phase {phase} merged into workflow {workflow_id}: {editor_url}");
            println!("Test the updated workflow, then continue with phase {}.\n", phase + 1);
        }
    }
}
