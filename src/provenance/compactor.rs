//! Turns per-file ownership into blame ranges with colors and prompt numbers.

use crate::navigation::xref::MessageIndex;
use crate::provenance::line_ownership::LineOwner;
use crate::provenance::operation::{FileOperation, OperationKind};
use crate::provenance::replay::ReplayOutcome;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A maximal run of consecutive lines written by one operation.
/// Pre-session runs carry no attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlameRange {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub message_id: Option<String>,
    pub tool_id: Option<String>,
    pub timestamp: Option<String>,
    pub operation_kind: Option<OperationKind>,
    pub sequence_index: Option<u64>,
    pub context_id: Option<String>,
    pub color_index: Option<usize>,
    pub prompt_number: Option<u32>,
}

impl BlameRange {
    pub fn pre_session(path: &str, start_line: u32, end_line: u32) -> Self {
        BlameRange {
            path: path.to_string(),
            start_line,
            end_line,
            message_id: None,
            tool_id: None,
            timestamp: None,
            operation_kind: None,
            sequence_index: None,
            context_id: None,
            color_index: None,
            prompt_number: None,
        }
    }

    pub fn is_pre_session(&self) -> bool {
        self.message_id.is_none()
    }

    pub fn contains(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}

/// Hands out palette slots to context ids in first-seen order
#[derive(Debug, Clone)]
pub struct ColorAssigner {
    palette_size: usize,
    assigned: HashMap<String, usize>,
    next: usize,
}

impl ColorAssigner {
    pub fn new(palette_size: usize) -> Self {
        ColorAssigner {
            palette_size: palette_size.max(1),
            assigned: HashMap::new(),
            next: 0,
        }
    }

    pub fn assign(&mut self, context_id: &str) -> usize {
        if let Some(color) = self.assigned.get(context_id) {
            return *color;
        }
        let color = self.next % self.palette_size;
        self.next += 1;
        self.assigned.insert(context_id.to_string(), color);
        color
    }

    pub fn get(&self, context_id: &str) -> Option<usize> {
        self.assigned.get(context_id).copied()
    }

    /// Number of distinct context ids seen
    pub fn len(&self) -> usize {
        self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }
}

pub fn context_id_for(message_id: &str, context_ids: &HashMap<String, String>) -> String {
    context_ids
        .get(message_id)
        .cloned()
        .unwrap_or_else(|| message_id.to_string())
}

/// Assign colors by walking every operation that owns surviving lines in
/// global sequence order, so the result does not depend on which file
/// finished replaying first.
pub fn assign_colors(
    outcomes: &[ReplayOutcome],
    context_ids: &HashMap<String, String>,
    palette_size: usize,
) -> ColorAssigner {
    let mut owners: BTreeSet<(u64, &str, usize)> = BTreeSet::new();
    for outcome in outcomes.iter().filter(|o| o.is_present()) {
        for span in outcome.state.ownership() {
            if let LineOwner::Operation(op_ref) = span.owner {
                let op = outcome.operation(op_ref);
                owners.insert((op.sequence_index, outcome.path.as_str(), op_ref.0));
            }
        }
    }

    let mut colors = ColorAssigner::new(palette_size);
    let by_path: HashMap<&str, &ReplayOutcome> =
        outcomes.iter().map(|o| (o.path.as_str(), o)).collect();
    for (_, path, op_idx) in owners {
        if let Some(outcome) = by_path.get(path) {
            let op = &outcome.operations[op_idx];
            colors.assign(&context_id_for(&op.message_id, context_ids));
        }
    }
    colors
}

/// One range per ownership span of a replayed file
pub fn compact_file(
    outcome: &ReplayOutcome,
    messages: &MessageIndex,
    context_ids: &HashMap<String, String>,
    colors: &ColorAssigner,
) -> Vec<BlameRange> {
    outcome
        .state
        .ownership()
        .iter()
        .map(|span| match span.owner {
            LineOwner::PreSession => {
                BlameRange::pre_session(&outcome.path, span.start_line, span.end_line)
            }
            LineOwner::Operation(op_ref) => attributed_range(
                &outcome.path,
                span.start_line,
                span.end_line,
                outcome.operation(op_ref),
                messages,
                context_ids,
                colors,
            ),
        })
        .collect()
}

fn attributed_range(
    path: &str,
    start_line: u32,
    end_line: u32,
    op: &FileOperation,
    messages: &MessageIndex,
    context_ids: &HashMap<String, String>,
    colors: &ColorAssigner,
) -> BlameRange {
    let context_id = context_id_for(&op.message_id, context_ids);
    BlameRange {
        path: path.to_string(),
        start_line,
        end_line,
        message_id: Some(op.message_id.clone()),
        tool_id: Some(op.tool_id.clone()),
        timestamp: Some(op.timestamp.clone()).filter(|ts| !ts.is_empty()),
        operation_kind: Some(op.kind()),
        sequence_index: Some(op.sequence_index),
        color_index: colors.get(&context_id),
        prompt_number: messages.prompt_number_for_id(&op.message_id),
        context_id: Some(context_id),
    }
}
