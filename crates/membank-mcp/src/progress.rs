//! Progress channel: intermediate status events for long-running tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A non-terminal (or final) notification emitted during a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(rename = "isFinal", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProgressEvent {
    pub fn working(message: impl Into<String>, percent: Option<f64>) -> Self {
        Self {
            status: "in_progress".to_string(),
            message: Some(message.into()),
            percent,
            is_final: false,
            data: None,
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            status: "complete".to_string(),
            message: Some(message.into()),
            percent: Some(100.0),
            is_final: true,
            data: None,
        }
    }
}

/// Capability handed to tool handlers for emitting progress.
///
/// Implementations route events to the transport owning the request; when no
/// listener exists, `notify` is a no-op. Events from one handler reach the
/// caller in emission order.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

/// Discards every event (batch calls with no listener).
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Emits events as JSON-RPC `notifications/progress` lines through the
/// stdio writer task.
pub struct LineProgress {
    tx: tokio::sync::mpsc::UnboundedSender<String>,
}

impl LineProgress {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for LineProgress {
    fn notify(&self, event: ProgressEvent) {
        let notification = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/progress",
            "params": event,
        });
        // Writer gone means the connection is closing; drop the event.
        let _ = self.tx.send(notification.to_string());
    }
}

/// Pushes events onto a session-keyed broadcast channel drained by the SSE
/// endpoint. Events are dropped silently when no subscriber is connected.
pub struct SseProgress {
    tx: tokio::sync::broadcast::Sender<ProgressEvent>,
}

impl SseProgress {
    pub fn new(tx: tokio::sync::broadcast::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for SseProgress {
    fn notify(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}
