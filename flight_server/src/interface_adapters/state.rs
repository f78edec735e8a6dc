use crate::use_cases::SimEvent;
use axum::extract::ws::Utf8Bytes;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Controls, subscriptions and resets flowing from the network into the flight loop.
    pub events_tx: mpsc::Sender<SimEvent>,
    // Latest serialized telemetry frame, sent to new connections straight away.
    pub latest_tx: watch::Sender<Utf8Bytes>,
    // Upper bound on how long POST /reset waits for the flight loop.
    pub reset_ack_timeout: Duration,
    // Per-connection frame queue; a full queue drops frames for that connection only.
    pub subscriber_queue_capacity: usize,
}
