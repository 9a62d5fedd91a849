use crate::{NodeKey, WorkflowDocument};
use serde_json::{Map, Value, map::Entry};
use std::collections::HashMap;
use tracing::debug;

/// Combine an existing server-side workflow with a newly drafted phase.
///
/// Nodes are matched by `(name, type)` identity. Matched nodes keep their
/// original index and every field except `parameters` (deep-merged, the
/// phase wins on conflict) and `position` (adopted when the phase carries
/// one). Unmatched phase nodes are appended in order. Connections are
/// unioned per source node with whole-branch structural dedup.
///
/// `name`, `settings`, and all other top-level fields come from
/// `existing`; the incoming phase's `settings` are dropped. Both inputs
/// are consumed.
pub fn merge(existing: WorkflowDocument, incoming: WorkflowDocument) -> WorkflowDocument {
    let mut merged = existing;

    // Lookup covers the pre-merge nodes only: a phase that repeats a key
    // it introduced itself appends twice, exactly like the server would
    // see it.
    let index_by_key: HashMap<NodeKey, usize> = merged
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.key(), i))
        .collect();

    for node in incoming.nodes {
        match index_by_key.get(&node.key()) {
            Some(&i) => {
                let slot = &mut merged.nodes[i];
                let base = std::mem::take(&mut slot.parameters);
                slot.parameters = deep_merge_parameters(base, node.parameters);
                if node.position.is_some() {
                    slot.position = node.position;
                }
                debug!(node = %slot.name, "updated existing node");
            }
            None => {
                debug!(node = %node.name, "added new node");
                merged.nodes.push(node);
            }
        }
    }

    for (source, incoming_set) in incoming.connections {
        match merged.connections.entry(source) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(incoming_set);
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                let main = &mut slot.get_mut().main;
                for branch in incoming_set.main {
                    if !main.contains(&branch) {
                        main.push(branch);
                    }
                }
            }
        }
    }

    merged
}

/// Recursive parameter merge; `overlay` wins on every conflict.
///
/// Nested objects merge key-by-key. Sequences are replaced wholesale:
/// ordered arrays of heterogeneous condition/branch objects have no
/// per-element identity to merge on. Every other type combination takes
/// the overlay value. Total and deterministic; deliberately not
/// commutative.
pub fn deep_merge_parameters(
    base: Map<String, Value>,
    overlay: Map<String, Value>,
) -> Map<String, Value> {
    if base.is_empty() {
        return overlay;
    }
    if overlay.is_empty() {
        return base;
    }

    let mut merged = base;
    for (key, overlay_value) in overlay {
        match merged.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(overlay_value);
            }
            Entry::Occupied(mut slot) => {
                let value = match (slot.get_mut(), overlay_value) {
                    (Value::Object(base_obj), Value::Object(overlay_obj)) => {
                        let base_obj = std::mem::take(base_obj);
                        Value::Object(deep_merge_parameters(base_obj, overlay_obj))
                    }
                    (_, other) => other,
                };
                slot.insert(value);
            }
        }
    }
    merged
}
