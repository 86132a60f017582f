//! The contiguous slice of messages currently materialized for display.
//!
//! The window only moves through three transitions: extend down, extend up
//! and teleport. Extends are bounded to one chunk per call so each step
//! costs O(chunk); a distant target teleports instead of walking there.

use crate::navigation::xref::MessageIndex;
use std::fmt;

/// Message index bounds of what is materialized.
/// Half-open internally so an empty window can sit at any index, including 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderWindow {
    start: usize,
    end_exclusive: usize,
}

impl RenderWindow {
    pub fn empty_at(start: usize) -> Self {
        RenderWindow {
            start,
            end_exclusive: start,
        }
    }

    /// Both bounds inclusive
    pub fn inclusive(start: usize, end: usize) -> Self {
        RenderWindow {
            start,
            end_exclusive: end.max(start.saturating_sub(1)) + 1,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Last materialized index, `None` when empty
    pub fn end(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.end_exclusive - 1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end_exclusive
    }

    pub fn len(&self) -> usize {
        self.end_exclusive - self.start
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end_exclusive
    }
}

impl fmt::Display for RenderWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "[{}, {}]", self.start, end),
            None => write!(f, "[{}, empty]", self.start),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Messages materialized per extension
    pub chunk_size: usize,
    /// Teleport when reaching a target needs more than this many chunks
    pub teleport_chunks: usize,
    /// Sticky prompt updates per second while the user scrolls
    pub scroll_throttle_hz: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            chunk_size: 50,
            teleport_chunks: 2,
            scroll_throttle_hz: 60,
        }
    }
}

impl WindowConfig {
    pub fn teleport_threshold(&self) -> usize {
        self.chunk_size * self.teleport_chunks
    }

    pub fn max_step(&self) -> usize {
        self.chunk_size
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    StepTooLarge { requested: usize, max: usize },
    OutOfRange { index: usize, len: usize },
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::StepTooLarge { requested, max } => write!(
                f,
                "extension of {} messages exceeds the maximum step of {}",
                requested, max
            ),
            NavigationError::OutOfRange { index, len } => {
                write!(f, "message index {} is out of range ({} messages)", index, len)
            }
        }
    }
}

impl std::error::Error for NavigationError {}

/// What a call did to the window. Index ranges are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowTransition {
    ExtendedDown { from: usize, to: usize },
    ExtendedUp { from: usize, to: usize },
    Teleported { start: usize, end: usize, generation: u64 },
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct WindowManager {
    config: WindowConfig,
    total: usize,
    window: RenderWindow,
    generation: u64,
    /// Messages materialized over the manager's lifetime
    rendered: usize,
}

impl WindowManager {
    pub fn new(config: WindowConfig, total: usize) -> Self {
        WindowManager {
            config,
            total,
            window: RenderWindow::default(),
            generation: 0,
            rendered: 0,
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn window(&self) -> RenderWindow {
        self.window
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rendered(&self) -> usize {
        self.rendered
    }

    fn check_index(&self, index: usize) -> Result<(), NavigationError> {
        if index >= self.total {
            return Err(NavigationError::OutOfRange {
                index,
                len: self.total,
            });
        }
        Ok(())
    }

    /// Materialize `[end + 1 ..= to]`, with `to` clamped to the last message.
    pub fn extend_down(&mut self, to: usize) -> Result<WindowTransition, NavigationError> {
        if self.total == 0 {
            return Ok(WindowTransition::Unchanged);
        }
        let to = to.min(self.total - 1);
        if to < self.window.end_exclusive {
            return Ok(WindowTransition::Unchanged);
        }

        let growth = to + 1 - self.window.end_exclusive;
        if growth > self.config.max_step() {
            return Err(NavigationError::StepTooLarge {
                requested: growth,
                max: self.config.max_step(),
            });
        }

        let from = self.window.end_exclusive;
        self.window.end_exclusive = to + 1;
        self.rendered += growth;
        Ok(WindowTransition::ExtendedDown { from, to })
    }

    /// Materialize `[from ..= start - 1]`.
    pub fn extend_up(&mut self, from: usize) -> Result<WindowTransition, NavigationError> {
        self.check_index(from)?;
        if from >= self.window.start {
            return Ok(WindowTransition::Unchanged);
        }

        let growth = self.window.start - from;
        if growth > self.config.max_step() {
            return Err(NavigationError::StepTooLarge {
                requested: growth,
                max: self.config.max_step(),
            });
        }

        let to = self.window.start - 1;
        self.window.start = from;
        self.rendered += growth;
        Ok(WindowTransition::ExtendedUp { from, to })
    }

    /// One chunk past the bottom edge
    pub fn extend_down_chunk(&mut self) -> Result<WindowTransition, NavigationError> {
        let to = self.window.end_exclusive + self.config.chunk_size - 1;
        self.extend_down(to)
    }

    /// One chunk above the top edge
    pub fn extend_up_chunk(&mut self) -> Result<WindowTransition, NavigationError> {
        if self.window.start == 0 {
            return Ok(WindowTransition::Unchanged);
        }
        let from = self.window.start.saturating_sub(self.config.chunk_size);
        self.extend_up(from)
    }

    /// Discard the window and rebuild it at `target`'s governing prompt,
    /// through at least `target` and at least one chunk.
    pub fn teleport(
        &mut self,
        target: usize,
        messages: &MessageIndex,
    ) -> Result<WindowTransition, NavigationError> {
        self.check_index(target)?;
        let anchor = messages.governing_prompt(target).unwrap_or(target);
        let end = target
            .max(anchor + self.config.chunk_size.max(1) - 1)
            .min(self.total - 1);

        self.window = RenderWindow::inclusive(anchor, end);
        self.generation += 1;
        self.rendered += self.window.len();
        Ok(WindowTransition::Teleported {
            start: anchor,
            end,
            generation: self.generation,
        })
    }

    /// Make `target` and its governing prompt visible, extending when the
    /// gap is small and teleporting otherwise. Returns every transition made;
    /// empty when both were already visible.
    pub fn ensure_visible(
        &mut self,
        target: usize,
        messages: &MessageIndex,
    ) -> Result<Vec<WindowTransition>, NavigationError> {
        self.check_index(target)?;
        let low = messages.governing_prompt(target).unwrap_or(target);

        if self.window.contains(low) && self.window.contains(target) {
            return Ok(Vec::new());
        }

        let need_up = self.window.start.saturating_sub(low);
        let need_down = (target + 1).saturating_sub(self.window.end_exclusive);
        let threshold = self.config.teleport_threshold();
        if self.window.is_empty() || need_up > threshold || need_down > threshold {
            return Ok(vec![self.teleport(target, messages)?]);
        }

        let step = self.config.max_step().max(1);
        let mut transitions = Vec::new();
        while self.window.start > low {
            let from = low.max(self.window.start.saturating_sub(step));
            transitions.push(self.extend_up(from)?);
        }
        while self.window.end_exclusive <= target {
            let to = target.min(self.window.end_exclusive + step - 1);
            transitions.push(self.extend_down(to)?);
        }
        Ok(transitions)
    }
}
