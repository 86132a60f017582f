//! Per-file content plus line ownership.
//!
//! Lines are immutable records in an append-only arena. The current file is
//! a sequence of record ids, rebuilt by each operation, and the
//! `(line range, owner)` table is derived from that sequence. A line that
//! survives an edit keeps its record id, so it keeps its owner no matter how
//! far it shifts.

use crate::provenance::operation::OperationRef;
use crate::utils::line_count;

/// Who wrote a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineOwner {
    /// The line existed before the transcript started
    PreSession,
    Operation(OperationRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(usize);

#[derive(Debug, Clone, Copy)]
struct LineRecord {
    owner: LineOwner,
}

/// A maximal run of consecutive lines with one owner.
/// Both bounds are inclusive and 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipSpan {
    pub start_line: u32,
    pub end_line: u32,
    pub owner: LineOwner,
}

impl OwnershipSpan {
    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }

    pub fn contains(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileState {
    content: String,
    arena: Vec<LineRecord>,
    lines: Vec<LineId>,
    ownership: Vec<OwnershipSpan>,
    exists: bool,
    /// Byte offset of the previous edit on this path, used to pick among duplicate matches
    last_edit_offset: usize,
}

impl FileState {
    /// An absent file
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn ownership(&self) -> &[OwnershipSpan] {
        &self.ownership
    }

    pub fn last_edit_offset(&self) -> usize {
        self.last_edit_offset
    }

    pub(crate) fn set_last_edit_offset(&mut self, offset: usize) {
        self.last_edit_offset = offset;
    }

    /// Owner of a 1-indexed line
    pub fn owner_at(&self, line: u32) -> Option<LineOwner> {
        let idx = (line as usize).checked_sub(1)?;
        self.lines.get(idx).map(|id| self.owner_of(*id))
    }

    pub(crate) fn line_ids(&self) -> &[LineId] {
        &self.lines
    }

    pub(crate) fn owner_of(&self, id: LineId) -> LineOwner {
        self.arena[id.0].owner
    }

    pub(crate) fn alloc(&mut self, owner: LineOwner) -> LineId {
        self.arena.push(LineRecord { owner });
        LineId(self.arena.len() - 1)
    }

    /// Replace the whole file, every line owned by `owner`.
    pub(crate) fn reset(&mut self, content: String, owner: LineOwner) -> Result<(), String> {
        let ids = (0..line_count(&content)).map(|_| self.alloc(owner)).collect();
        self.exists = true;
        self.last_edit_offset = 0;
        self.rebuild(content, ids)
    }

    /// Remove the file. Ownership and content are cleared.
    pub(crate) fn clear(&mut self) {
        self.content.clear();
        self.lines.clear();
        self.ownership.clear();
        self.exists = false;
        self.last_edit_offset = 0;
    }

    /// Install new content and its line sequence, then re-derive and check
    /// the ownership table.
    pub(crate) fn rebuild(&mut self, content: String, lines: Vec<LineId>) -> Result<(), String> {
        self.content = content;
        self.lines = lines;
        self.ownership = self.derive_ownership();
        self.check_invariants()
    }

    fn derive_ownership(&self) -> Vec<OwnershipSpan> {
        let mut spans: Vec<OwnershipSpan> = Vec::new();
        for (idx, id) in self.lines.iter().enumerate() {
            let line = idx as u32 + 1;
            let owner = self.owner_of(*id);
            match spans.last_mut() {
                Some(last) if last.owner == owner && last.end_line + 1 == line => {
                    last.end_line = line;
                }
                _ => spans.push(OwnershipSpan {
                    start_line: line,
                    end_line: line,
                    owner,
                }),
            }
        }
        spans
    }

    /// Ownership must partition `1..=line_count(content)` with no gaps or overlaps.
    pub fn check_invariants(&self) -> Result<(), String> {
        let expected = line_count(&self.content);
        if self.lines.len() != expected {
            return Err(format!(
                "content has {} lines but ownership tracks {}",
                expected,
                self.lines.len()
            ));
        }

        let mut next_line = 1u32;
        for span in &self.ownership {
            if span.start_line != next_line {
                return Err(format!(
                    "span {}-{} does not start at line {}",
                    span.start_line, span.end_line, next_line
                ));
            }
            if span.end_line < span.start_line {
                return Err(format!(
                    "span {}-{} is empty",
                    span.start_line, span.end_line
                ));
            }
            next_line = span.end_line + 1;
        }

        if next_line as usize != expected + 1 {
            return Err(format!(
                "ownership covers {} lines, content has {}",
                next_line - 1,
                expected
            ));
        }
        Ok(())
    }
}
