//! Shared fixtures: scripted transports and pipeline builders.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strictly_chess::{
    AcquisitionError, AcquisitionErrorKind, DebugSink, GameSession, MoveRequestPipeline,
    PlayerSeatConfig, ProviderRegistry, RecordingObserver, Seats, StandardRules, Transport,
    WireRequest, WireResponse,
};
use tokio::sync::Notify;

/// Replays queued replies in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<WireResponse, AcquisitionError>>>,
    sent: Mutex<Vec<WireRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with `status` and `body`.
    pub fn reply(self, status: u16, body: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(WireResponse {
            status,
            body: body.into(),
        }));
        self
    }

    /// Queues a successful chat-completions reply whose content is `text`.
    pub fn say(self, text: &str) -> Self {
        self.reply(200, chat_body(text))
    }

    /// Queues a network failure.
    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(AcquisitionError::new(AcquisitionErrorKind::Transport(
                message.to_string(),
            ))));
        self
    }

    /// Requests sent so far.
    pub fn sent(&self) -> Vec<WireRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, AcquisitionError> {
        self.sent.lock().unwrap().push(request.clone());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(AcquisitionError::new(AcquisitionErrorKind::Transport(
                "script exhausted".to_string(),
            )))
        })
    }
}

/// Holds every request until [`GatedTransport::open`] is called, then
/// answers with `text`.
pub struct GatedTransport {
    gate: Notify,
    entered: Notify,
    text: String,
}

impl GatedTransport {
    pub fn new(text: &str) -> Self {
        Self {
            gate: Notify::new(),
            entered: Notify::new(),
            text: text.to_string(),
        }
    }

    /// Waits until a request is parked at the gate.
    pub async fn wait_for_request(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, _request: &WireRequest) -> Result<WireResponse, AcquisitionError> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(WireResponse {
            status: 200,
            body: chat_body(&self.text),
        })
    }
}

/// Chat-completions response body carrying `text`.
pub fn chat_body(text: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] }).to_string()
}

/// The reply a well-behaved model gives.
pub fn json_move(token: &str) -> String {
    format!("```json\n{{\"move\": \"{token}\", \"explanation\": \"Solid development.\"}}\n```")
}

/// An OpenAI seat with a credential and `attempts` tries.
pub fn ai_seat(attempts: u32) -> PlayerSeatConfig {
    PlayerSeatConfig::ai("openai", "gpt-4o")
        .with_api_key("test-key")
        .with_max_retry_attempts(attempts)
}

/// Pipeline over `transport` with no backoff and a recording observer.
pub fn pipeline(transport: Arc<dyn Transport>) -> (Arc<MoveRequestPipeline>, RecordingObserver) {
    let observer = RecordingObserver::new();
    let pipeline = MoveRequestPipeline::new(
        Arc::new(ProviderRegistry::with_builtin()),
        transport,
        Arc::new(StandardRules::new()),
    )
    .with_backoff_base(Duration::ZERO)
    .with_sink(DebugSink::new(Arc::new(observer.clone())));
    (Arc::new(pipeline), observer)
}

/// Session over `transport` with the given seats.
pub fn session(
    transport: Arc<dyn Transport>,
    white: PlayerSeatConfig,
    black: PlayerSeatConfig,
) -> GameSession {
    let (pipeline, _) = pipeline(transport);
    GameSession::new(pipeline, Seats::new(white, black)).expect("standard position")
}

/// Human-vs-human session; no transport is ever used.
pub fn human_session() -> GameSession {
    session(
        Arc::new(ScriptedTransport::new()),
        PlayerSeatConfig::human(),
        PlayerSeatConfig::human(),
    )
}
