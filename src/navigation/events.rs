use crate::navigation::coordinator::NavigationIntent;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

/// Inputs to the navigation loop, from the user and from the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    Intent(NavigationIntent),
    /// An edge sentinel scrolled into view
    SentinelVisible(Direction),
    /// The renderer finished drawing the window of `generation`
    RenderCommitted { generation: u64 },
    /// A programmatic scroll for `generation` came to rest
    ScrollSettled { generation: u64 },
    /// The user scrolled; `first_visible` is the topmost message index on screen
    Scrolled { first_visible: usize, at_ms: u64 },
}

#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: VecDeque<NavEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: NavEvent) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<NavEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Lets through at most `hz` updates per second of event time
#[derive(Debug, Clone)]
pub struct ScrollThrottle {
    min_interval_ms: u64,
    last_ms: Option<u64>,
}

impl ScrollThrottle {
    pub fn new(hz: u32) -> Self {
        ScrollThrottle {
            min_interval_ms: 1000 / u64::from(hz.max(1)),
            last_ms: None,
        }
    }

    pub fn allow(&mut self, at_ms: u64) -> bool {
        match self.last_ms {
            Some(last) if at_ms.saturating_sub(last) < self.min_interval_ms => false,
            _ => {
                self.last_ms = Some(at_ms);
                true
            }
        }
    }
}
