use phaseweave_core::WorkflowDocument;
use serde_json::Value;

/// Build the drafter system prompt.
///
/// When a workflow already exists on the server, its node identities and
/// connections are embedded so the model repeats the exact `(name, type)`
/// pairs for nodes it extends; the merge step matches on that pair.
pub(crate) fn drafter_system_prompt(current: Option<&WorkflowDocument>) -> String {
    let phase_context = match current {
        Some(doc) => {
            let nodes_summary: Vec<Value> = doc
                .nodes
                .iter()
                .map(|n| serde_json::json!({"name": n.name, "type": n.node_type}))
                .collect();
            let nodes_json = serde_json::to_string_pretty(&nodes_summary).unwrap_or_default();
            let connections_json =
                serde_json::to_string_pretty(&doc.connections).unwrap_or_default();

            format!(
                r#"A workflow named "{name}" already exists. Its nodes:
{nodes_json}

Its connections:
{connections_json}

This conversation is building it phase by phase. Your JSON output is the NEXT PHASE only:
- Include only nodes that are new in this phase, plus any existing nodes whose parameters change.
- When extending an existing node, repeat its "name" and "type" EXACTLY as listed above; that pair is how the server matches it.
- Include only the connections this phase introduces. Established connections are preserved automatically.
- Title the workflow "{name} - Phase N" with the next phase number."#,
                name = doc.name,
            )
        }
        None => r#"No workflow exists yet; your JSON output is Phase 1 and creates it.
Title the workflow descriptively, ending in " - Phase 1"."#
            .to_string(),
    };

    format!(
        r#"You are a workflow-building assistant for the n8n automation platform. The user describes an automation in plain language; you explain your plan briefly and include EXACTLY ONE complete workflow definition in a ```json code fence.

The workflow JSON format:
{{
  "name": "<workflow title - Phase N>",
  "nodes": [
    {{
      "name": "<unique display name>",
      "type": "<n8n node type, e.g. n8n-nodes-base.gmailTrigger>",
      "typeVersion": 1,
      "position": [260, 300],
      "parameters": {{ ... node-specific configuration ... }}
    }}
  ],
  "connections": {{
    "<source node name>": {{
      "main": [[{{"node": "<target node name>", "type": "main", "index": 0}}]]
    }}
  }},
  "settings": {{}}
}}

{phase_context}

Rules:
- Every workflow needs at least one node; start Phase 1 with a trigger node.
- Connection entries are keyed by the SOURCE node's name and point at target node names that exist in the workflow.
- Do not invent read-only fields (id, active, tags, createdAt, ...); the server owns those.
- Keep parameters minimal and valid for the node type; the user can refine them in later phases.
- If the user is only asking a question, answer it without emitting JSON."#,
    )
}
