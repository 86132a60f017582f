//! Turns intents and renderer signals into window transitions, highlights
//! and scroll targets.
//!
//! All state lives in [`NavigationState`]; events are handled one at a time
//! from an explicit queue. A teleport starts a new generation, and scroll
//! targets or render commits tagged with an older generation are dropped.

use crate::navigation::deep_link::DeepLink;
use crate::navigation::events::{Direction, EventQueue, NavEvent, ScrollThrottle};
use crate::navigation::window::{NavigationError, WindowConfig, WindowManager, WindowTransition};
use crate::provenance::session::CodeView;
use crate::utils::debug_log;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationIntent {
    /// The user clicked a line in the code view
    SelectCodeLine { path: String, line: u32 },
    /// The user clicked a message in the transcript
    SelectMessage { index: usize },
    /// A URL fragment such as `src/a.rs:L12` or `#L12`
    DeepLink(String),
}

/// Why an intent could not be carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    DanglingReference { message_id: String },
    PreSessionLine { path: String, line: u32 },
    UnknownPath(String),
    LineOutOfRange { path: String, line: u32 },
    MessageOutOfRange { index: usize },
    NoLaterCodeChange { index: usize },
    NoCurrentFile,
    MalformedLink(String),
    Window(NavigationError),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::DanglingReference { message_id } => {
                write!(f, "message {} is not in the transcript", message_id)
            }
            UnavailableReason::PreSessionLine { path, line } => {
                write!(f, "{}:L{} predates the session", path, line)
            }
            UnavailableReason::UnknownPath(path) => write!(f, "no file {}", path),
            UnavailableReason::LineOutOfRange { path, line } => {
                write!(f, "{} has no line {}", path, line)
            }
            UnavailableReason::MessageOutOfRange { index } => {
                write!(f, "no message at index {}", index)
            }
            UnavailableReason::NoLaterCodeChange { index } => {
                write!(f, "no code change at or after message {}", index)
            }
            UnavailableReason::NoCurrentFile => write!(f, "no file is open"),
            UnavailableReason::MalformedLink(link) => write!(f, "malformed link {}", link),
            UnavailableReason::Window(err) => write!(f, "{}", err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub message_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingScroll {
    pub message_index: usize,
    pub generation: u64,
}

/// Instructions for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEffect {
    Window(WindowTransition),
    OpenFile { path: String },
    Highlight(Highlight),
    /// Scroll the transcript to a message once its window is drawn
    ScrollToMessage { index: usize, generation: u64 },
    ScrollToLine { path: String, line: u32 },
    SetDeepLink(DeepLink),
    StickyPrompt { index: Option<usize>, prompt_number: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Applied(Vec<NavEffect>),
    Unavailable(UnavailableReason),
}

impl NavigationOutcome {
    pub fn effects(&self) -> &[NavEffect] {
        match self {
            NavigationOutcome::Applied(effects) => effects,
            NavigationOutcome::Unavailable(_) => &[],
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, NavigationOutcome::Unavailable(_))
    }
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    pub window: WindowManager,
    pub current_path: Option<String>,
    pub highlight: Option<Highlight>,
    pub pending_scroll: Option<PendingScroll>,
    pub extending_up: bool,
    pub extending_down: bool,
    pub teleport_in_flight: bool,
    /// Set from a programmatic navigation until its scroll settles
    pub navigating: bool,
    pub sticky_prompt: Option<usize>,
    pub throttle: ScrollThrottle,
}

impl NavigationState {
    pub fn new(config: WindowConfig, message_count: usize) -> Self {
        NavigationState {
            window: WindowManager::new(config, message_count),
            current_path: None,
            highlight: None,
            pending_scroll: None,
            extending_up: false,
            extending_down: false,
            teleport_in_flight: false,
            navigating: false,
            sticky_prompt: None,
            throttle: ScrollThrottle::new(config.scroll_throttle_hz),
        }
    }
}

pub struct NavigationCoordinator<'a> {
    view: &'a CodeView,
    state: NavigationState,
    queue: EventQueue,
}

impl<'a> NavigationCoordinator<'a> {
    pub fn new(view: &'a CodeView, config: WindowConfig) -> Self {
        NavigationCoordinator {
            view,
            state: NavigationState::new(config, view.message_index.len()),
            queue: EventQueue::new(),
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn push(&mut self, event: NavEvent) {
        self.queue.push(event);
    }

    /// Handle queued events in order until the queue is empty
    pub fn run(&mut self) -> Vec<NavigationOutcome> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop() {
            outcomes.push(self.handle(event));
        }
        outcomes
    }

    pub fn navigate(&mut self, intent: NavigationIntent) -> NavigationOutcome {
        self.handle(NavEvent::Intent(intent))
    }

    pub fn handle(&mut self, event: NavEvent) -> NavigationOutcome {
        let outcome = match event {
            NavEvent::Intent(intent) => match self.resolve_intent(intent) {
                Ok(effects) => NavigationOutcome::Applied(effects),
                Err(reason) => NavigationOutcome::Unavailable(reason),
            },
            NavEvent::SentinelVisible(direction) => {
                NavigationOutcome::Applied(self.on_sentinel(direction))
            }
            NavEvent::RenderCommitted { generation } => {
                NavigationOutcome::Applied(self.on_render_committed(generation))
            }
            NavEvent::ScrollSettled { generation } => {
                if generation == self.state.window.generation() {
                    self.state.navigating = false;
                }
                NavigationOutcome::Applied(Vec::new())
            }
            NavEvent::Scrolled {
                first_visible,
                at_ms,
            } => NavigationOutcome::Applied(self.on_scrolled(first_visible, at_ms)),
        };

        if let NavigationOutcome::Unavailable(reason) = &outcome {
            debug_log(&format!("navigation unavailable: {}", reason));
        }
        outcome
    }

    fn resolve_intent(&mut self, intent: NavigationIntent) -> Result<Vec<NavEffect>, UnavailableReason> {
        match intent {
            NavigationIntent::SelectCodeLine { path, line } => self.select_code_line(&path, line),
            NavigationIntent::SelectMessage { index } => self.select_message(index),
            NavigationIntent::DeepLink(fragment) => {
                // URL fragments arrive with their leading '#'
                let link: DeepLink = fragment
                    .strip_prefix('#')
                    .unwrap_or(&fragment)
                    .parse()
                    .map_err(|_| UnavailableReason::MalformedLink(fragment.clone()))?;
                let path = link
                    .resolve_path(self.state.current_path.as_deref())
                    .ok_or(UnavailableReason::NoCurrentFile)?
                    .to_string();
                self.select_code_line(&path, link.line)
            }
        }
    }

    /// Code line -> owning range -> message -> transcript
    fn select_code_line(&mut self, path: &str, line: u32) -> Result<Vec<NavEffect>, UnavailableReason> {
        let view = self.view;
        let file = view
            .file(path)
            .ok_or_else(|| UnavailableReason::UnknownPath(path.to_string()))?;
        let range = file
            .range_at(line)
            .ok_or_else(|| UnavailableReason::LineOutOfRange {
                path: path.to_string(),
                line,
            })?;
        let message_id = range
            .message_id
            .as_deref()
            .ok_or_else(|| UnavailableReason::PreSessionLine {
                path: path.to_string(),
                line,
            })?;
        let message_index = view.message_index.index_of(message_id).ok_or_else(|| {
            UnavailableReason::DanglingReference {
                message_id: message_id.to_string(),
            }
        })?;

        let mut effects = Vec::new();
        self.open_file(path, &mut effects);

        let transitions = self
            .state
            .window
            .ensure_visible(message_index, &view.message_index)
            .map_err(UnavailableReason::Window)?;
        let generation = self.state.window.generation();
        self.state.navigating = true;

        for transition in &transitions {
            self.note_transition(transition);
        }
        effects.extend(transitions.into_iter().map(NavEffect::Window));

        if self.render_in_flight() {
            self.state.pending_scroll = Some(PendingScroll {
                message_index,
                generation,
            });
        } else {
            // Window already drawn, so no render commit will release the scroll
            self.state.pending_scroll = None;
            effects.push(NavEffect::ScrollToMessage {
                index: message_index,
                generation,
            });
        }

        let highlight = Highlight {
            path: path.to_string(),
            start_line: range.start_line,
            end_line: range.end_line,
            message_index,
        };
        self.state.highlight = Some(highlight.clone());
        effects.push(NavEffect::Highlight(highlight));
        effects.push(NavEffect::SetDeepLink(DeepLink::new(path, range.start_line)));
        Ok(effects)
    }

    /// Message -> next code change at or after it -> code view
    fn select_message(&mut self, index: usize) -> Result<Vec<NavEffect>, UnavailableReason> {
        let view = self.view;
        if index >= view.message_index.len() {
            return Err(UnavailableReason::MessageOutOfRange { index });
        }
        let event = view
            .xref
            .next_blame_event_at_or_after(index)
            .ok_or(UnavailableReason::NoLaterCodeChange { index })?;

        let mut effects = Vec::new();
        self.open_file(&event.path, &mut effects);

        let highlight = Highlight {
            path: event.path.clone(),
            start_line: event.start_line,
            end_line: event.end_line,
            message_index: event.message_index,
        };
        self.state.highlight = Some(highlight.clone());
        effects.push(NavEffect::Highlight(highlight));
        effects.push(NavEffect::ScrollToLine {
            path: event.path.clone(),
            line: event.start_line,
        });
        Ok(effects)
    }

    fn open_file(&mut self, path: &str, effects: &mut Vec<NavEffect>) {
        if self.state.current_path.as_deref() != Some(path) {
            self.state.current_path = Some(path.to_string());
            effects.push(NavEffect::OpenFile {
                path: path.to_string(),
            });
        }
    }

    fn render_in_flight(&self) -> bool {
        self.state.teleport_in_flight || self.state.extending_up || self.state.extending_down
    }

    fn note_transition(&mut self, transition: &WindowTransition) {
        match transition {
            WindowTransition::ExtendedDown { .. } => self.state.extending_down = true,
            WindowTransition::ExtendedUp { .. } => self.state.extending_up = true,
            WindowTransition::Teleported { .. } => {
                // Supersedes whatever the previous window was waiting on
                self.state.teleport_in_flight = true;
                self.state.extending_up = false;
                self.state.extending_down = false;
                self.state.pending_scroll = None;
            }
            WindowTransition::Unchanged => {}
        }
    }

    fn on_sentinel(&mut self, direction: Direction) -> Vec<NavEffect> {
        let busy = match direction {
            Direction::Up => self.state.extending_up,
            Direction::Down => self.state.extending_down,
        };
        if busy || self.state.teleport_in_flight {
            return Vec::new();
        }

        let result = match direction {
            Direction::Up => self.state.window.extend_up_chunk(),
            Direction::Down => self.state.window.extend_down_chunk(),
        };
        match result {
            Ok(WindowTransition::Unchanged) => Vec::new(),
            Ok(transition) => {
                self.note_transition(&transition);
                vec![NavEffect::Window(transition)]
            }
            Err(err) => {
                debug_log(&format!("sentinel extension rejected: {}", err));
                Vec::new()
            }
        }
    }

    fn on_render_committed(&mut self, generation: u64) -> Vec<NavEffect> {
        if generation != self.state.window.generation() {
            debug_log(&format!(
                "ignoring render commit for stale generation {} (current {})",
                generation,
                self.state.window.generation()
            ));
            return Vec::new();
        }

        self.state.extending_up = false;
        self.state.extending_down = false;
        self.state.teleport_in_flight = false;

        match self.state.pending_scroll.take() {
            Some(pending) if pending.generation == generation => vec![NavEffect::ScrollToMessage {
                index: pending.message_index,
                generation,
            }],
            _ => Vec::new(),
        }
    }

    fn on_scrolled(&mut self, first_visible: usize, at_ms: u64) -> Vec<NavEffect> {
        if self.state.navigating || !self.state.throttle.allow(at_ms) {
            return Vec::new();
        }

        let index = self.view.message_index.governing_prompt(first_visible);
        if index == self.state.sticky_prompt {
            return Vec::new();
        }
        self.state.sticky_prompt = index;
        vec![NavEffect::StickyPrompt {
            index,
            prompt_number: index.and_then(|i| self.view.message_index.prompt_number(i)),
        }]
    }
}
