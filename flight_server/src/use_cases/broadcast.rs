// Subscriber registry and per-tick fan-out of serialized telemetry.

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkError {
    /// The subscriber is gone; it will never accept another frame.
    Closed,
    /// The subscriber is alive but behind; this frame is dropped for it.
    Full,
}

/// Destination for serialized telemetry frames. Implementations must not wait on the peer.
pub trait TelemetrySink: Send {
    fn send_frame(&self, frame: Utf8Bytes) -> Result<(), SinkError>;
}

impl TelemetrySink for mpsc::Sender<Utf8Bytes> {
    fn send_frame(&self, frame: Utf8Bytes) -> Result<(), SinkError> {
        self.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Result of one fan-out pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
    pub pruned: Vec<u64>,
}

/// Current listeners, owned by the tick loop.
#[derive(Default)]
pub struct SubscriberSet {
    subscribers: Vec<(u64, Box<dyn TelemetrySink>)>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subscriber_id: u64, sink: Box<dyn TelemetrySink>) {
        // Re-subscribing replaces the previous sink.
        self.remove(subscriber_id);
        self.subscribers.push((subscriber_id, sink));
    }

    pub fn remove(&mut self, subscriber_id: u64) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(id, _)| *id != subscriber_id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Sends `frame` to every subscriber. Closed subscribers are collected while iterating
    /// and removed only after the pass, so one failure never affects the others.
    pub fn broadcast(&mut self, frame: &Utf8Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, sink) in &self.subscribers {
            match sink.send_frame(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(SinkError::Full) => report.dropped += 1,
                Err(SinkError::Closed) => report.pruned.push(*id),
            }
        }

        if !report.pruned.is_empty() {
            self.subscribers
                .retain(|(id, _)| !report.pruned.contains(id));
        }
        report
    }
}
