use crate::error::BlameError;
use serde::{Deserialize, Serialize};

/// A transcript message as seen by the core: opaque apart from its id,
/// its position and whether it is a top-level prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub index: usize,
    #[serde(default)]
    pub is_prompt: bool,
}

impl Message {
    pub fn new(id: &str, index: usize, is_prompt: bool) -> Self {
        Message {
            id: id.to_string(),
            index,
            is_prompt,
        }
    }
}

/// A message annotated with the ordinal of its governing prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedMessage {
    pub id: String,
    pub index: usize,
    pub is_prompt: bool,
    pub prompt_number: Option<u32>,
}

/// Every message's `index` must equal its position in the list.
pub fn validate_messages(messages: &[Message]) -> Result<(), BlameError> {
    for (position, message) in messages.iter().enumerate() {
        if message.index != position {
            return Err(BlameError::MalformedMessage {
                id: message.id.clone(),
                declared_index: message.index,
                position,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_messages_accepts_positional_indices() {
        let messages = vec![Message::new("a", 0, true), Message::new("b", 1, false)];
        assert!(validate_messages(&messages).is_ok());
        assert!(validate_messages(&[]).is_ok());
    }

    #[test]
    fn test_validate_messages_rejects_gap() {
        let messages = vec![Message::new("a", 0, true), Message::new("b", 2, false)];
        match validate_messages(&messages) {
            Err(BlameError::MalformedMessage {
                id,
                declared_index,
                position,
            }) => {
                assert_eq!(id, "b");
                assert_eq!(declared_index, 2);
                assert_eq!(position, 1);
            }
            other => panic!("Expected MalformedMessage, got {:?}", other),
        }
    }

    #[test]
    fn test_is_prompt_defaults_to_false() {
        let message: Message = serde_json::from_str(r#"{"id": "m", "index": 0}"#).unwrap();
        assert!(!message.is_prompt);
    }
}
