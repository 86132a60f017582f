//! Message and blame lookup tables used to move between code and transcript.

use crate::error::BlameError;
use crate::observability;
use crate::provenance::compactor::BlameRange;
use crate::provenance::diagnostics::{Diagnostic, Diagnostics};
use crate::provenance::message::{AnnotatedMessage, Message, validate_messages};
use crate::utils::debug_log;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Positions, governing prompts and prompt ordinals for the message list
#[derive(Debug, Clone, Default)]
pub struct MessageIndex {
    messages: Vec<Message>,
    id_to_index: HashMap<String, usize>,
    governing_prompt: Vec<Option<usize>>,
    prompt_ordinal: Vec<Option<u32>>,
}

impl MessageIndex {
    pub fn build(messages: Vec<Message>) -> Result<Self, BlameError> {
        validate_messages(&messages)?;

        let mut id_to_index = HashMap::with_capacity(messages.len());
        let mut governing_prompt = Vec::with_capacity(messages.len());
        let mut prompt_ordinal = Vec::with_capacity(messages.len());
        let mut current_prompt = None;
        let mut prompts_seen = 0u32;

        for message in &messages {
            if id_to_index.contains_key(&message.id) {
                let note = format!(
                    "duplicate message id {} at index {}, keeping the first",
                    message.id, message.index
                );
                debug_log(&note);
                observability::log_message(&note, "warning", None);
            } else {
                id_to_index.insert(message.id.clone(), message.index);
            }

            if message.is_prompt {
                prompts_seen += 1;
                current_prompt = Some(message.index);
                prompt_ordinal.push(Some(prompts_seen));
            } else {
                prompt_ordinal.push(None);
            }
            governing_prompt.push(current_prompt);
        }

        Ok(MessageIndex {
            messages,
            id_to_index,
            governing_prompt,
            prompt_ordinal,
        })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn index_of(&self, message_id: &str) -> Option<usize> {
        self.id_to_index.get(message_id).copied()
    }

    /// Index of the nearest prompt at or before `index`. A prompt governs itself.
    pub fn governing_prompt(&self, index: usize) -> Option<usize> {
        self.governing_prompt.get(index).copied().flatten()
    }

    /// 1-based ordinal of the prompt governing `index`
    pub fn prompt_number(&self, index: usize) -> Option<u32> {
        let prompt = self.governing_prompt(index)?;
        self.prompt_ordinal.get(prompt).copied().flatten()
    }

    pub fn prompt_number_for_id(&self, message_id: &str) -> Option<u32> {
        self.index_of(message_id)
            .and_then(|index| self.prompt_number(index))
    }

    pub fn prompt_count(&self) -> usize {
        self.prompt_ordinal.iter().filter(|o| o.is_some()).count()
    }

    pub fn annotated(&self) -> Vec<AnnotatedMessage> {
        self.messages
            .iter()
            .map(|m| AnnotatedMessage {
                id: m.id.clone(),
                index: m.index,
                is_prompt: m.is_prompt,
                prompt_number: self.prompt_number(m.index),
            })
            .collect()
    }
}

/// A code change located in transcript order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameEvent {
    pub message_index: usize,
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CrossReferenceIndex {
    /// For each message, its first range in each path, ordered by path
    path_and_range_by_message_id: HashMap<String, Vec<BlameRange>>,
    /// Sorted by (message_index, path, start_line)
    events: Vec<BlameEvent>,
}

impl CrossReferenceIndex {
    /// Ranges whose message is not in `messages` are left out and reported
    /// once per message id as `DanglingReference`.
    pub fn build<'a, I>(ranges: I, messages: &MessageIndex, diagnostics: &mut Diagnostics) -> Self
    where
        I: IntoIterator<Item = &'a BlameRange>,
    {
        let mut first_by_message: HashMap<String, BTreeMap<String, BlameRange>> = HashMap::new();
        let mut events = Vec::new();
        let mut dangling: HashSet<String> = HashSet::new();

        for range in ranges {
            let Some(message_id) = range.message_id.as_deref() else {
                continue;
            };
            let Some(message_index) = messages.index_of(message_id) else {
                if dangling.insert(message_id.to_string()) {
                    diagnostics.record(Diagnostic::DanglingReference {
                        message_id: message_id.to_string(),
                        path: Some(range.path.clone()),
                    });
                }
                continue;
            };

            let per_path = first_by_message.entry(message_id.to_string()).or_default();
            match per_path.get(&range.path) {
                Some(existing) if existing.start_line <= range.start_line => {}
                _ => {
                    per_path.insert(range.path.clone(), range.clone());
                }
            }

            events.push(BlameEvent {
                message_index,
                path: range.path.clone(),
                start_line: range.start_line,
                end_line: range.end_line,
            });
        }

        events.sort_by(|a, b| {
            (a.message_index, &a.path, a.start_line).cmp(&(b.message_index, &b.path, b.start_line))
        });

        CrossReferenceIndex {
            path_and_range_by_message_id: first_by_message
                .into_iter()
                .map(|(id, per_path)| (id, per_path.into_values().collect()))
                .collect(),
            events,
        }
    }

    /// First range per path written by `message_id`, ordered by path
    pub fn ranges_for_message(&self, message_id: &str) -> &[BlameRange] {
        self.path_and_range_by_message_id
            .get(message_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The earliest code change made at or after message `index`
    pub fn next_blame_event_at_or_after(&self, index: usize) -> Option<&BlameEvent> {
        let pos = self.events.partition_point(|e| e.message_index < index);
        self.events.get(pos)
    }

    pub fn events(&self) -> &[BlameEvent] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages() -> Vec<Message> {
        vec![
            Message::new("u1", 0, true),
            Message::new("a1", 1, false),
            Message::new("a2", 2, false),
            Message::new("u2", 3, true),
            Message::new("a3", 4, false),
        ]
    }

    fn range(path: &str, start: u32, end: u32, message_id: &str) -> BlameRange {
        BlameRange {
            message_id: Some(message_id.to_string()),
            ..BlameRange::pre_session(path, start, end)
        }
    }

    #[test]
    fn test_governing_prompts_and_ordinals() {
        let index = MessageIndex::build(messages()).unwrap();
        assert_eq!(index.governing_prompt(2), Some(0));
        assert_eq!(index.governing_prompt(3), Some(3));
        assert_eq!(index.prompt_number(4), Some(2));
        assert_eq!(index.prompt_number_for_id("a1"), Some(1));
        assert_eq!(index.prompt_number_for_id("nope"), None);
        assert_eq!(index.prompt_count(), 2);
        assert_eq!(index.governing_prompt(99), None);
    }

    #[test]
    fn test_messages_before_first_prompt_have_no_prompt() {
        let index = MessageIndex::build(vec![
            Message::new("sys", 0, false),
            Message::new("u1", 1, true),
        ])
        .unwrap();
        assert_eq!(index.governing_prompt(0), None);
        assert_eq!(index.prompt_number(0), None);
        let annotated = index.annotated();
        assert_eq!(annotated[1].prompt_number, Some(1));
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let index = MessageIndex::build(vec![
            Message::new("dup", 0, true),
            Message::new("dup", 1, false),
        ])
        .unwrap();
        assert_eq!(index.index_of("dup"), Some(0));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_malformed_message_list_is_rejected() {
        let result = MessageIndex::build(vec![Message::new("a", 1, true)]);
        assert!(matches!(result, Err(BlameError::MalformedMessage { .. })));
    }

    #[test]
    fn test_next_blame_event_at_or_after() {
        let index = MessageIndex::build(messages()).unwrap();
        let ranges = vec![
            range("b.rs", 1, 2, "a3"),
            range("a.rs", 5, 9, "a1"),
            range("a.rs", 1, 4, "a1"),
        ];
        let mut diagnostics = Diagnostics::new();
        let xref = CrossReferenceIndex::build(&ranges, &index, &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(xref.events().len(), 3);
        let first = xref.next_blame_event_at_or_after(0).unwrap();
        assert_eq!((first.message_index, first.start_line), (1, 1));
        let later = xref.next_blame_event_at_or_after(2).unwrap();
        assert_eq!((later.path.as_str(), later.message_index), ("b.rs", 4));
        assert!(xref.next_blame_event_at_or_after(5).is_none());
    }

    #[test]
    fn test_first_range_per_path() {
        let index = MessageIndex::build(messages()).unwrap();
        let ranges = vec![
            range("z.rs", 3, 3, "a1"),
            range("a.rs", 7, 8, "a1"),
            range("a.rs", 2, 2, "a1"),
        ];
        let mut diagnostics = Diagnostics::new();
        let xref = CrossReferenceIndex::build(&ranges, &index, &mut diagnostics);
        let found: Vec<(&str, u32)> = xref
            .ranges_for_message("a1")
            .iter()
            .map(|r| (r.path.as_str(), r.start_line))
            .collect();
        assert_eq!(found, vec![("a.rs", 2), ("z.rs", 3)]);
        assert!(xref.ranges_for_message("u1").is_empty());
    }

    #[test]
    fn test_dangling_reference_reported_once_per_message() {
        let index = MessageIndex::build(messages()).unwrap();
        let ranges = vec![
            range("a.rs", 1, 1, "ghost"),
            range("b.rs", 1, 1, "ghost"),
            BlameRange::pre_session("c.rs", 1, 3),
        ];
        let mut diagnostics = Diagnostics::new();
        let xref = CrossReferenceIndex::build(&ranges, &index, &mut diagnostics);
        assert_eq!(diagnostics.count("dangling_reference"), 1);
        assert!(xref.events().is_empty());
        assert!(xref.ranges_for_message("ghost").is_empty());
    }
}
