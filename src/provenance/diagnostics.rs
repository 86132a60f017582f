use crate::observability;
use crate::provenance::operation::OperationKind;
use crate::utils::debug_log;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-fatal anomaly found while sequencing, replaying or indexing.
/// None of these stop processing of other files or messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Two operations on one path share a sequence index; extraction order breaks the tie
    OrderingError {
        path: String,
        sequence_index: u64,
        tool_ids: Vec<String>,
    },
    /// An Edit's `old_string` was not found; `new_string` was appended instead
    UnattributedEdit {
        path: String,
        sequence_index: u64,
        message_id: String,
        tool_id: String,
    },
    /// Edit or Delete against a path that does not exist at that point
    MissingPath {
        path: String,
        sequence_index: u64,
        kind: OperationKind,
    },
    /// A blame range or navigation target names a message that is not in the message list
    DanglingReference {
        message_id: String,
        path: Option<String>,
    },
    /// Content was resynchronised from an Edit's recorded original content
    Resynced {
        path: String,
        sequence_index: u64,
    },
    /// The ownership table stopped partitioning the file; the file is left out
    InvariantViolation {
        path: String,
        sequence_index: u64,
        detail: String,
    },
}

impl Diagnostic {
    pub fn path(&self) -> Option<&str> {
        match self {
            Diagnostic::OrderingError { path, .. }
            | Diagnostic::UnattributedEdit { path, .. }
            | Diagnostic::MissingPath { path, .. }
            | Diagnostic::Resynced { path, .. }
            | Diagnostic::InvariantViolation { path, .. } => Some(path),
            Diagnostic::DanglingReference { path, .. } => path.as_deref(),
        }
    }

    pub fn sequence_index(&self) -> Option<u64> {
        match self {
            Diagnostic::OrderingError { sequence_index, .. }
            | Diagnostic::UnattributedEdit { sequence_index, .. }
            | Diagnostic::MissingPath { sequence_index, .. }
            | Diagnostic::Resynced { sequence_index, .. }
            | Diagnostic::InvariantViolation { sequence_index, .. } => Some(*sequence_index),
            Diagnostic::DanglingReference { .. } => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Diagnostic::OrderingError { .. } => "ordering_error",
            Diagnostic::UnattributedEdit { .. } => "unattributed_edit",
            Diagnostic::MissingPath { .. } => "missing_path",
            Diagnostic::DanglingReference { .. } => "dangling_reference",
            Diagnostic::Resynced { .. } => "resynced",
            Diagnostic::InvariantViolation { .. } => "invariant_violation",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::OrderingError {
                path,
                sequence_index,
                tool_ids,
            } => write!(
                f,
                "{}: operations {} share sequence index {}, keeping extraction order",
                path,
                tool_ids.join(", "),
                sequence_index
            ),
            Diagnostic::UnattributedEdit {
                path,
                sequence_index,
                message_id,
                ..
            } => write!(
                f,
                "{}: edit #{} from {} did not match current content, appended instead",
                path, sequence_index, message_id
            ),
            Diagnostic::MissingPath {
                path,
                sequence_index,
                kind,
            } => write!(
                f,
                "{}: {} #{} on a path that does not exist, skipped",
                path, kind, sequence_index
            ),
            Diagnostic::DanglingReference { message_id, path } => match path {
                Some(path) => write!(f, "{}: message {} is not in the transcript", path, message_id),
                None => write!(f, "message {} is not in the transcript", message_id),
            },
            Diagnostic::Resynced {
                path,
                sequence_index,
            } => write!(
                f,
                "{}: resynced from recorded original content before edit #{}",
                path, sequence_index
            ),
            Diagnostic::InvariantViolation {
                path,
                sequence_index,
                detail,
            } => write!(
                f,
                "{}: ownership invariant broken after #{}: {}",
                path, sequence_index, detail
            ),
        }
    }
}

/// Collects diagnostics and reports each one as it is recorded
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        debug_log(&diagnostic.to_string());
        observability::log_diagnostic(&diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, label: &str) -> usize {
        self.entries.iter().filter(|d| d.label() == label).count()
    }

    /// Order by sequence index, then path; DanglingReference entries last.
    /// Stable, so entries for the same operation keep recording order.
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.entries.sort_by(|a, b| {
            let key_a = (a.sequence_index().unwrap_or(u64::MAX), a.path().unwrap_or(""));
            let key_b = (b.sequence_index().unwrap_or(u64::MAX), b.path().unwrap_or(""));
            key_a.cmp(&key_b)
        });
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_path_and_sequence() {
        let d = Diagnostic::UnattributedEdit {
            path: "src/a.rs".to_string(),
            sequence_index: 12,
            message_id: "msg-12".to_string(),
            tool_id: "toolu_12".to_string(),
        };
        let text = d.to_string();
        assert!(text.contains("src/a.rs"));
        assert!(text.contains("#12"));
        assert!(text.contains("msg-12"));
        assert_eq!(d.label(), "unattributed_edit");
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let d = Diagnostic::MissingPath {
            path: "gone.txt".to_string(),
            sequence_index: 3,
            kind: OperationKind::Delete,
        };
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["type"], "missing_path");
        assert_eq!(value["kind"], "delete");
    }

    #[test]
    fn test_into_sorted_orders_by_sequence_then_path() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(Diagnostic::DanglingReference {
            message_id: "ghost".to_string(),
            path: None,
        });
        diagnostics.record(Diagnostic::MissingPath {
            path: "b".to_string(),
            sequence_index: 5,
            kind: OperationKind::Edit,
        });
        diagnostics.record(Diagnostic::MissingPath {
            path: "a".to_string(),
            sequence_index: 5,
            kind: OperationKind::Edit,
        });
        diagnostics.record(Diagnostic::Resynced {
            path: "z".to_string(),
            sequence_index: 1,
        });
        assert_eq!(diagnostics.count("missing_path"), 2);

        let sorted = diagnostics.into_sorted();
        let paths: Vec<Option<&str>> = sorted.iter().map(|d| d.path()).collect();
        assert_eq!(paths, vec![Some("z"), Some("a"), Some("b"), None]);
    }
}
