use std::fmt;

#[derive(Debug)]
pub enum BlameError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    /// An operation that violates the basic structural contract (e.g. no path)
    MalformedOperation {
        sequence_index: u64,
        tool_id: String,
        reason: String,
    },
    /// A message whose declared index does not match its position in the list
    MalformedMessage {
        id: String,
        declared_index: usize,
        position: usize,
    },
    ConfigError(String),
    Generic(String),
}

impl fmt::Display for BlameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlameError::IoError(e) => write!(f, "IO error: {}", e),
            BlameError::JsonError(e) => write!(f, "JSON error: {}", e),
            BlameError::MalformedOperation {
                sequence_index,
                tool_id,
                reason,
            } => write!(
                f,
                "Malformed operation #{} (tool {}): {}",
                sequence_index, tool_id, reason
            ),
            BlameError::MalformedMessage {
                id,
                declared_index,
                position,
            } => write!(
                f,
                "Malformed message {}: declared index {} but found at position {}",
                id, declared_index, position
            ),
            BlameError::ConfigError(e) => write!(f, "Config error: {}", e),
            BlameError::Generic(e) => write!(f, "Generic error: {}", e),
        }
    }
}

impl std::error::Error for BlameError {}

impl From<std::io::Error> for BlameError {
    fn from(err: std::io::Error) -> Self {
        BlameError::IoError(err)
    }
}

impl From<serde_json::Error> for BlameError {
    fn from(err: serde_json::Error) -> Self {
        BlameError::JsonError(err)
    }
}

impl From<envy::Error> for BlameError {
    fn from(err: envy::Error) -> Self {
        BlameError::ConfigError(err.to_string())
    }
}

impl Clone for BlameError {
    fn clone(&self) -> Self {
        match self {
            BlameError::IoError(e) => {
                BlameError::IoError(std::io::Error::new(e.kind(), e.to_string()))
            }
            BlameError::JsonError(e) => BlameError::Generic(format!("JSON error: {}", e)),
            BlameError::MalformedOperation {
                sequence_index,
                tool_id,
                reason,
            } => BlameError::MalformedOperation {
                sequence_index: *sequence_index,
                tool_id: tool_id.clone(),
                reason: reason.clone(),
            },
            BlameError::MalformedMessage {
                id,
                declared_index,
                position,
            } => BlameError::MalformedMessage {
                id: id.clone(),
                declared_index: *declared_index,
                position: *position,
            },
            BlameError::ConfigError(s) => BlameError::ConfigError(s.clone()),
            BlameError::Generic(s) => BlameError::Generic(s.clone()),
        }
    }
}
