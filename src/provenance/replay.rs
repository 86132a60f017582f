//! Replays a path's operations, maintaining content and line ownership.
//!
//! Write resets ownership wholesale. Edit replaces `old_string` and aligns the
//! affected lines with a longest-common-subsequence line diff: lines that are
//! textually unchanged keep their owner, everything else in the affected span
//! goes to the editing operation. Delete clears the file.

use crate::provenance::diagnostics::{Diagnostic, Diagnostics};
use crate::provenance::line_ownership::{FileState, LineId, LineOwner};
use crate::provenance::operation::{FileOperation, OperationPayload, OperationRef};
use crate::utils::{debug_log, line_count, split_lines};
use similar::{Algorithm, DiffTag, capture_diff_slices};

/// Configuration for the replay engine
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Affected spans longer than this many lines are aligned with Myers instead of LCS
    pub lcs_line_limit: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        ReplayConfig {
            lcs_line_limit: 2000,
        }
    }
}

/// Result of replaying one path
#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub path: String,
    /// The path's operations in replay order; `OperationRef` indexes into this
    pub operations: Vec<FileOperation>,
    pub state: FileState,
    pub diagnostics: Diagnostics,
    /// Set when an ownership invariant broke; replay of the path stopped there
    pub broken: bool,
}

impl ReplayOutcome {
    pub fn operation(&self, op_ref: OperationRef) -> &FileOperation {
        &self.operations[op_ref.0]
    }

    /// Whether the path exists after replay and is usable for output
    pub fn is_present(&self) -> bool {
        !self.broken && self.state.exists()
    }
}

/// Replay `operations` (already sorted by sequence index) against an absent file.
pub fn replay_file(path: &str, operations: Vec<FileOperation>, config: &ReplayConfig) -> ReplayOutcome {
    let mut replayer = Replayer {
        path,
        config,
        state: FileState::new(),
        diagnostics: Diagnostics::new(),
    };

    let mut broken = false;
    for (idx, op) in operations.iter().enumerate() {
        if let Err(detail) = replayer.apply(OperationRef(idx), op) {
            replayer.diagnostics.record(Diagnostic::InvariantViolation {
                path: path.to_string(),
                sequence_index: op.sequence_index,
                detail,
            });
            broken = true;
            break;
        }
    }

    ReplayOutcome {
        path: path.to_string(),
        operations,
        state: replayer.state,
        diagnostics: replayer.diagnostics,
        broken,
    }
}

struct Replayer<'a> {
    path: &'a str,
    config: &'a ReplayConfig,
    state: FileState,
    diagnostics: Diagnostics,
}

impl Replayer<'_> {
    fn apply(&mut self, op_ref: OperationRef, op: &FileOperation) -> Result<(), String> {
        let owner = LineOwner::Operation(op_ref);
        match &op.payload {
            OperationPayload::Write { content } => self.state.reset(content.clone(), owner),
            OperationPayload::Edit {
                old_string,
                new_string,
                replace_all,
                original_content,
            } => self.apply_edit(
                op,
                owner,
                old_string,
                new_string,
                *replace_all,
                original_content.as_deref(),
            ),
            OperationPayload::Delete { recursive } => {
                if self.state.exists() {
                    self.state.clear();
                } else if *recursive {
                    debug_log(&format!(
                        "{}: directory delete #{} before the file existed",
                        self.path, op.sequence_index
                    ));
                } else {
                    self.record_missing(op);
                }
                Ok(())
            }
        }
    }

    fn apply_edit(
        &mut self,
        op: &FileOperation,
        owner: LineOwner,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
        original_content: Option<&str>,
    ) -> Result<(), String> {
        if !self.state.exists() {
            match original_content {
                // Lines the tool saw before this edit predate the session
                Some(original) => self.state.reset(original.to_string(), LineOwner::PreSession)?,
                None => {
                    self.record_missing(op);
                    return Ok(());
                }
            }
        }

        let mut matches = find_matches(self.state.content(), old_string);

        if matches.is_empty()
            && let Some(original) = original_content
            && original.contains(old_string)
        {
            self.resync(original)?;
            self.diagnostics.record(Diagnostic::Resynced {
                path: self.path.to_string(),
                sequence_index: op.sequence_index,
            });
            matches = find_matches(self.state.content(), old_string);
        }

        if matches.is_empty() {
            return self.append_unattributed(op, owner, new_string);
        }

        let old_content = self.state.content().to_string();
        let (start, end, new_content) = if replace_all && !old_string.is_empty() {
            let first = matches[0];
            let last = matches[matches.len() - 1] + old_string.len();
            (first, last, old_content.replace(old_string, new_string))
        } else {
            let pos = nearest_match(&matches, self.state.last_edit_offset());
            if matches.len() > 1 {
                debug_log(&format!(
                    "{}: edit #{} matched {} times, using offset {}",
                    self.path,
                    op.sequence_index,
                    matches.len(),
                    pos
                ));
            }
            let end = pos + old_string.len();
            let mut replaced = String::with_capacity(old_content.len() + new_string.len());
            replaced.push_str(&old_content[..pos]);
            replaced.push_str(new_string);
            replaced.push_str(&old_content[end..]);
            (pos, end, replaced)
        };

        let (keep_prefix, keep_suffix) = unchanged_line_margins(&old_content, start, end);
        self.realign(&old_content, new_content, keep_prefix, keep_suffix, owner)?;
        self.state.set_last_edit_offset(start);
        Ok(())
    }

    /// Switch to `original` content. Lines equal to current lines keep
    /// their owners; the rest predate the session.
    fn resync(&mut self, original: &str) -> Result<(), String> {
        let old_content = self.state.content().to_string();
        self.realign(&old_content, original.to_string(), 0, 0, LineOwner::PreSession)
    }

    /// Best effort for an edit whose `old_string` is nowhere in the file:
    /// append `new_string` as a trailing region owned by the edit.
    fn append_unattributed(
        &mut self,
        op: &FileOperation,
        owner: LineOwner,
        new_string: &str,
    ) -> Result<(), String> {
        self.diagnostics.record(Diagnostic::UnattributedEdit {
            path: self.path.to_string(),
            sequence_index: op.sequence_index,
            message_id: op.message_id.clone(),
            tool_id: op.tool_id.clone(),
        });

        let mut content = self.state.content().to_string();
        let offset = content.len();
        if !new_string.is_empty() {
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(new_string);
        }

        let mut ids = self.state.line_ids().to_vec();
        let added = line_count(&content).saturating_sub(ids.len());
        for _ in 0..added {
            ids.push(self.state.alloc(owner));
        }
        self.state.rebuild(content, ids)?;
        self.state.set_last_edit_offset(offset);
        Ok(())
    }

    /// Move to `new_content`, keeping the first `keep_prefix` and last
    /// `keep_suffix` lines by position and diffing the lines in between.
    fn realign(
        &mut self,
        old_content: &str,
        new_content: String,
        keep_prefix: usize,
        keep_suffix: usize,
        owner: LineOwner,
    ) -> Result<(), String> {
        let old_ids: Vec<LineId> = self.state.line_ids().to_vec();
        let old_lines = split_lines(old_content);
        let new_lines = split_lines(&new_content);

        let prefix = keep_prefix.min(old_lines.len()).min(new_lines.len());
        let suffix = keep_suffix
            .min(old_lines.len() - prefix)
            .min(new_lines.len() - prefix);
        let old_window = &old_lines[prefix..old_lines.len() - suffix];
        let new_window = &new_lines[prefix..new_lines.len() - suffix];

        let algorithm = if old_window.len().max(new_window.len()) <= self.config.lcs_line_limit {
            Algorithm::Lcs
        } else {
            Algorithm::Myers
        };

        let mut ids = Vec::with_capacity(new_lines.len());
        ids.extend_from_slice(&old_ids[..prefix]);
        for diff_op in capture_diff_slices(algorithm, old_window, new_window) {
            let (tag, old_range, new_range) = diff_op.as_tag_tuple();
            match tag {
                DiffTag::Equal => {
                    ids.extend_from_slice(
                        &old_ids[prefix + old_range.start..prefix + old_range.end],
                    );
                }
                DiffTag::Delete => {}
                DiffTag::Insert | DiffTag::Replace => {
                    for _ in new_range {
                        ids.push(self.state.alloc(owner));
                    }
                }
            }
        }
        ids.extend_from_slice(&old_ids[old_ids.len() - suffix..]);

        self.state.rebuild(new_content, ids)
    }

    fn record_missing(&mut self, op: &FileOperation) {
        self.diagnostics.record(Diagnostic::MissingPath {
            path: self.path.to_string(),
            sequence_index: op.sequence_index,
            kind: op.kind(),
        });
    }
}

/// Byte offsets of every non-overlapping occurrence. An empty needle matches at 0.
fn find_matches(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return vec![0];
    }
    haystack.match_indices(needle).map(|(idx, _)| idx).collect()
}

/// The occurrence nearest to the previous edit; ties go to the earlier one.
fn nearest_match(matches: &[usize], last_edit_offset: usize) -> usize {
    let mut best = matches[0];
    for &candidate in &matches[1..] {
        if candidate.abs_diff(last_edit_offset) < best.abs_diff(last_edit_offset) {
            best = candidate;
        }
    }
    best
}

/// Lines wholly before `start` and wholly after the line containing `end`
/// are untouched by replacing `content[start..end]`.
fn unchanged_line_margins(content: &str, start: usize, end: usize) -> (usize, usize) {
    let prefix = content[..start].bytes().filter(|b| *b == b'\n').count();
    let tail = &content[end..];
    let suffix = match tail.find('\n') {
        Some(idx) => line_count(&tail[idx + 1..]),
        None => 0,
    };
    (prefix, suffix)
}
