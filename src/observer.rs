//! Debug observer: a side channel for prompts, responses, failures and moves.
//!
//! Observers are purely informational. Control flow never depends on them,
//! and a panicking observer is contained by [`DebugSink`].

use crate::seat::Seat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Category of a [`DebugEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DebugEventKind {
    /// Prompt sent to a provider.
    Prompt,
    /// Raw provider reply.
    Response,
    /// A failed attempt.
    Error,
    /// A committed AI move.
    Move,
}

/// One observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugEvent {
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: DebugEventKind,
    /// Seat the request was made for.
    pub seat: Seat,
    /// Human-readable summary.
    pub text: String,
    /// Unprocessed payload, when there is one.
    pub raw_text: Option<String>,
}

impl DebugEvent {
    /// Creates an event stamped with the current time.
    pub fn new(kind: DebugEventKind, seat: Seat, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            seat,
            text: text.into(),
            raw_text: None,
        }
    }

    /// Attaches the raw payload.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw_text = Some(raw.into());
        self
    }
}

/// Receives debug events.
pub trait DebugObserver: Send + Sync {
    /// Called once per event. Must not block for long.
    fn observe(&self, event: DebugEvent);
}

/// Forwards events into `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DebugObserver for TracingObserver {
    fn observe(&self, event: DebugEvent) {
        match event.kind {
            DebugEventKind::Prompt => debug!(seat = %event.seat, text = %event.text, "AI prompt"),
            DebugEventKind::Response => {
                debug!(seat = %event.seat, text = %event.text, "AI response")
            }
            DebugEventKind::Error => warn!(seat = %event.seat, text = %event.text, "AI error"),
            DebugEventKind::Move => info!(seat = %event.seat, text = %event.text, "AI move"),
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<DebugEvent>>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything recorded so far.
    pub fn events(&self) -> Vec<DebugEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded events of one kind.
    pub fn events_of(&self, kind: DebugEventKind) -> Vec<DebugEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }
}

impl DebugObserver for RecordingObserver {
    fn observe(&self, event: DebugEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Optional observer wrapper that swallows observer panics.
#[derive(Clone, Default)]
pub struct DebugSink {
    observer: Option<Arc<dyn DebugObserver>>,
}

impl DebugSink {
    /// A sink that drops everything.
    pub fn none() -> Self {
        Self::default()
    }

    /// A sink that forwards to `observer`.
    pub fn new(observer: Arc<dyn DebugObserver>) -> Self {
        Self {
            observer: Some(observer),
        }
    }

    /// Delivers `event`, if an observer is attached.
    pub fn emit(&self, event: DebugEvent) {
        let Some(observer) = &self.observer else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| observer.observe(event))).is_err() {
            warn!("Debug observer panicked; event dropped");
        }
    }
}

impl std::fmt::Debug for DebugSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSink")
            .field("attached", &self.observer.is_some())
            .finish()
    }
}
