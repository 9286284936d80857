//! Progress transcript sinks

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use trait_variant::make;

/// Receiver of the human readable progress transcript
///
/// A session calls this from its own worker task, one line at a time and in
/// stage order.
#[make(Send)]
pub trait ProgressSink: Send + Sync + 'static {
    /// Append one line to the transcript
    async fn append(&self, line: &str);

    /// Discard previous lines
    async fn clear(&self);
}

/// Transcript change forwarded by [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "line", rename_all = "snake_case")]
pub enum ProgressEvent {
    Clear,
    Line(String),
}

/// Sink forwarding progress to a single consumer over a channel
///
/// The consumer (typically the operator surface) applies events in order.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Progress receiver dropped, discarding event");
        }
    }
}

impl ProgressSink for ChannelSink {
    async fn append(&self, line: &str) {
        self.send(ProgressEvent::Line(line.to_string()));
    }

    async fn clear(&self) {
        self.send(ProgressEvent::Clear);
    }
}

/// In-memory transcript
#[derive(Debug, Default)]
pub struct Transcript {
    lines: RwLock<Vec<String>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current lines
    pub async fn lines(&self) -> Vec<String> {
        self.lines.read().await.clone()
    }
}

impl ProgressSink for Transcript {
    async fn append(&self, line: &str) {
        self.lines.write().await.push(line.to_string());
    }

    async fn clear(&self) {
        self.lines.write().await.clear();
    }
}
