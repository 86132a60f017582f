use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use crate::provenance::diagnostics::Diagnostic;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct ErrorEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    timestamp: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct MessageEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    timestamp: String,
    message: String,
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
struct PerformanceEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    timestamp: String,
    operation: String,
    duration_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<HashMap<String, String>>,
}

#[derive(Clone, Debug)]
enum LogEnvelope {
    Error(ErrorEnvelope),
    Performance(PerformanceEnvelope),
    Message(MessageEnvelope),
}

impl LogEnvelope {
    fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            LogEnvelope::Error(e) => serde_json::to_value(e).ok(),
            LogEnvelope::Performance(p) => serde_json::to_value(p).ok(),
            LogEnvelope::Message(m) => serde_json::to_value(m).ok(),
        }
    }
}

enum LogMode {
    Buffered(Vec<LogEnvelope>),
    Disk(PathBuf),
}

struct ObservabilityInner {
    mode: LogMode,
}

/// Upper bound on envelopes kept in memory before a log file is set
const MAX_BUFFERED_ENVELOPES: usize = 10_000;

static OBSERVABILITY: OnceLock<Mutex<ObservabilityInner>> = OnceLock::new();

fn get_observability() -> MutexGuard<'static, ObservabilityInner> {
    let lock = OBSERVABILITY.get_or_init(|| {
        Mutex::new(ObservabilityInner {
            mode: LogMode::Buffered(Vec::new()),
        })
    });
    // A panic while holding the lock leaves plain data behind; keep logging.
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Switch to disk mode and flush buffered events to `log_path`.
/// Subsequent calls are ignored once a path is set.
pub fn set_log_path(log_path: PathBuf) {
    let mut obs = get_observability();

    let buffered_events = match &mut obs.mode {
        LogMode::Buffered(events) => std::mem::take(events),
        LogMode::Disk(_) => return,
    };

    obs.mode = LogMode::Disk(log_path.clone());
    drop(obs);

    if buffered_events.is_empty() {
        return;
    }
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
        for envelope in buffered_events {
            if let Some(json) = envelope.to_json() {
                let _ = writeln!(file, "{}", json);
            }
        }
    }
}

/// Append an envelope (buffer if no log path, write to disk otherwise)
fn append_envelope(envelope: LogEnvelope) {
    let mut obs = get_observability();

    match &mut obs.mode {
        LogMode::Buffered(buffer) => {
            if buffer.len() < MAX_BUFFERED_ENVELOPES {
                buffer.push(envelope);
            }
        }
        LogMode::Disk(log_path) => {
            let log_path = log_path.clone();
            drop(obs);

            if let Some(json) = envelope.to_json() {
                if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
                    let _ = writeln!(file, "{}", json);
                }
            }
        }
    }
}

/// Drain the in-memory buffer as JSON values. Empty in disk mode.
pub fn take_buffered() -> Vec<serde_json::Value> {
    let mut obs = get_observability();
    match &mut obs.mode {
        LogMode::Buffered(buffer) => std::mem::take(buffer)
            .iter()
            .filter_map(LogEnvelope::to_json)
            .collect(),
        LogMode::Disk(_) => Vec::new(),
    }
}

pub fn log_error(error: &dyn std::error::Error, context: Option<serde_json::Value>) {
    let envelope = ErrorEnvelope {
        event_type: "error".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        message: error.to_string(),
        context,
    };

    append_envelope(LogEnvelope::Error(envelope));
}

pub fn log_performance(
    operation: &str,
    duration: Duration,
    context: Option<serde_json::Value>,
    tags: Option<HashMap<String, String>>,
) {
    let envelope = PerformanceEnvelope {
        event_type: "performance".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        operation: operation.to_string(),
        duration_ms: duration.as_millis(),
        context,
        tags,
    };

    append_envelope(LogEnvelope::Performance(envelope));
}

pub fn log_message(message: &str, level: &str, context: Option<serde_json::Value>) {
    let envelope = MessageEnvelope {
        event_type: "message".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        message: message.to_string(),
        level: level.to_string(),
        context,
    };

    append_envelope(LogEnvelope::Message(envelope));
}

/// Record a replay/navigation anomaly as a warning envelope
pub fn log_diagnostic(diagnostic: &Diagnostic) {
    log_message(
        &diagnostic.to_string(),
        "warning",
        serde_json::to_value(diagnostic).ok(),
    );
}
