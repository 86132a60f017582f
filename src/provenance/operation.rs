use crate::error::BlameError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Write,
    Edit,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Write => "write",
            OperationKind::Edit => "edit",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an operation does to its file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationPayload {
    Write {
        content: String,
    },
    Edit {
        old_string: String,
        new_string: String,
        /// Replace every occurrence instead of a single one
        #[serde(default)]
        replace_all: bool,
        /// Full file content the tool saw before editing, when the transcript recorded it
        #[serde(default, skip_serializing_if = "Option::is_none")]
        original_content: Option<String>,
    },
    Delete {
        /// Directory delete: removes every tracked path at or below `path`
        #[serde(default)]
        recursive: bool,
    },
}

/// A single Write/Edit/Delete extracted from a transcript.
/// Immutable once extracted; ordered by `sequence_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    pub path: String,
    #[serde(flatten)]
    pub payload: OperationPayload,
    /// Monotonic transcript position
    pub sequence_index: u64,
    pub message_id: String,
    #[serde(default)]
    pub tool_id: String,
    #[serde(default)]
    pub timestamp: String,
}

impl FileOperation {
    pub fn write(path: &str, content: &str, sequence_index: u64, message_id: &str) -> Self {
        Self::new(
            path,
            OperationPayload::Write {
                content: content.to_string(),
            },
            sequence_index,
            message_id,
        )
    }

    pub fn edit(
        path: &str,
        old_string: &str,
        new_string: &str,
        sequence_index: u64,
        message_id: &str,
    ) -> Self {
        Self::new(
            path,
            OperationPayload::Edit {
                old_string: old_string.to_string(),
                new_string: new_string.to_string(),
                replace_all: false,
                original_content: None,
            },
            sequence_index,
            message_id,
        )
    }

    pub fn delete(path: &str, sequence_index: u64, message_id: &str) -> Self {
        Self::new(
            path,
            OperationPayload::Delete { recursive: false },
            sequence_index,
            message_id,
        )
    }

    fn new(path: &str, payload: OperationPayload, sequence_index: u64, message_id: &str) -> Self {
        FileOperation {
            path: path.to_string(),
            payload,
            sequence_index,
            message_id: message_id.to_string(),
            tool_id: format!("toolu_{:06}", sequence_index),
            timestamp: String::new(),
        }
    }

    pub fn with_tool_id(mut self, tool_id: &str) -> Self {
        self.tool_id = tool_id.to_string();
        self
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = timestamp.to_string();
        self
    }

    /// No effect on operations other than Edit
    pub fn with_replace_all(mut self) -> Self {
        if let OperationPayload::Edit { replace_all, .. } = &mut self.payload {
            *replace_all = true;
        }
        self
    }

    /// No effect on operations other than Edit
    pub fn with_original_content(mut self, content: &str) -> Self {
        if let OperationPayload::Edit {
            original_content, ..
        } = &mut self.payload
        {
            *original_content = Some(content.to_string());
        }
        self
    }

    /// No effect on operations other than Delete
    pub fn recursive(mut self) -> Self {
        if let OperationPayload::Delete { recursive } = &mut self.payload {
            *recursive = true;
        }
        self
    }

    pub fn kind(&self) -> OperationKind {
        match self.payload {
            OperationPayload::Write { .. } => OperationKind::Write,
            OperationPayload::Edit { .. } => OperationKind::Edit,
            OperationPayload::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn is_recursive_delete(&self) -> bool {
        matches!(self.payload, OperationPayload::Delete { recursive: true })
    }

    /// Check the structural contract. Violations are the only fatal input errors.
    pub fn validate(&self) -> Result<(), BlameError> {
        if self.path.trim().is_empty() {
            return Err(BlameError::MalformedOperation {
                sequence_index: self.sequence_index,
                tool_id: self.tool_id.clone(),
                reason: "operation has no path".to_string(),
            });
        }
        if self.message_id.is_empty() {
            return Err(BlameError::MalformedOperation {
                sequence_index: self.sequence_index,
                tool_id: self.tool_id.clone(),
                reason: "operation has no message id".to_string(),
            });
        }
        Ok(())
    }
}

/// Index of an operation within its path's sequenced operation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationRef(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_edit_with_defaults() {
        let json = r#"{
            "path": "src/main.rs",
            "kind": "edit",
            "old_string": "foo",
            "new_string": "bar",
            "sequence_index": 4,
            "message_id": "msg-4"
        }"#;
        let op: FileOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op.kind(), OperationKind::Edit);
        assert_eq!(
            op.payload,
            OperationPayload::Edit {
                old_string: "foo".to_string(),
                new_string: "bar".to_string(),
                replace_all: false,
                original_content: None,
            }
        );
        assert_eq!(op.tool_id, "");
    }

    #[test]
    fn test_deserialize_recursive_delete() {
        let json = r#"{"path": "build", "kind": "delete", "recursive": true,
                       "sequence_index": 9, "message_id": "m", "tool_id": "t"}"#;
        let op: FileOperation = serde_json::from_str(json).unwrap();
        assert!(op.is_recursive_delete());
        assert_eq!(op.kind().to_string(), "delete");
    }

    #[test]
    fn test_serialize_write_is_tagged() {
        let op = FileOperation::write("a.txt", "hello\n", 1, "m1").with_tool_id("t1");
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["kind"], "write");
        assert_eq!(value["content"], "hello\n");
        assert_eq!(value["tool_id"], "t1");
    }

    #[test]
    fn test_builders_only_touch_matching_payload() {
        let write = FileOperation::write("a", "x", 1, "m").with_replace_all();
        assert_eq!(write.kind(), OperationKind::Write);
        let delete = FileOperation::delete("a", 2, "m").with_original_content("x");
        assert!(!delete.is_recursive_delete());
        let edit = FileOperation::edit("a", "x", "y", 3, "m")
            .with_replace_all()
            .with_original_content("x\n");
        match edit.payload {
            OperationPayload::Edit {
                replace_all,
                original_content,
                ..
            } => {
                assert!(replace_all);
                assert_eq!(original_content.as_deref(), Some("x\n"));
            }
            _ => panic!("Expected Edit payload"),
        }
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let op = FileOperation::write("  ", "x", 3, "m");
        let err = op.validate().unwrap_err();
        assert!(err.to_string().contains("no path"));
        assert!(FileOperation::write("a", "x", 3, "m").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_message_id() {
        let op = FileOperation::write("a", "x", 3, "");
        assert!(matches!(
            op.validate(),
            Err(BlameError::MalformedOperation { sequence_index: 3, .. })
        ));
    }
}
