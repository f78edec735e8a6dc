// WebSocket adapter: streams telemetry frames out and feeds control messages in.

use crate::interface_adapters::protocol::ControlMessage;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::SimEvent;

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    // The flight loop is gone; nothing can be subscribed or steered.
    EventsClosed,
}

enum LoopControl {
    Continue,
    Disconnect(Option<CloseFrame>),
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let conn_id = rand_id();
    ws.on_upgrade(move |socket| {
        handle_socket(socket, state, conn_id).instrument(info_span!("conn", conn_id))
    })
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, conn_id: u64) {
    let frames_rx = match subscribe(&mut socket, &state, conn_id).await {
        Ok(frames_rx) => frames_rx,
        Err(e) => {
            warn!(error = ?e, "failed to subscribe connection");
            close_with(
                &mut socket,
                CloseFrame {
                    code: close_code::AGAIN,
                    reason: "simulation unavailable".into(),
                },
            )
            .await;
            return;
        }
    };

    info!("client connected");
    let invalid_messages = stream_telemetry(&mut socket, &state.events_tx, frames_rx).await;

    // The flight loop also prunes closed sinks on its own; this just makes it immediate.
    let _ = state
        .events_tx
        .send(SimEvent::Unsubscribe {
            subscriber_id: conn_id,
        })
        .await;

    info!(invalid_messages, "client disconnected");
}

// Sends the latest frame, then registers a frame queue with the flight loop.
async fn subscribe(
    socket: &mut WebSocket,
    state: &AppState,
    conn_id: u64,
) -> Result<mpsc::Receiver<Utf8Bytes>, NetError> {
    // Clone before the await so the watch guard is never held across it.
    let latest = state.latest_tx.borrow().clone();
    if !latest.is_empty() {
        socket
            .send(Message::Text(latest))
            .await
            .map_err(NetError::Ws)?;
    }

    let (frames_tx, frames_rx) = mpsc::channel::<Utf8Bytes>(state.subscriber_queue_capacity);
    state
        .events_tx
        .send(SimEvent::Subscribe {
            subscriber_id: conn_id,
            sink: Box::new(frames_tx),
        })
        .await
        .map_err(|_| NetError::EventsClosed)?;
    Ok(frames_rx)
}

// Runs until either side goes away; returns how many inbound messages were malformed.
async fn stream_telemetry(
    socket: &mut WebSocket,
    events_tx: &mpsc::Sender<SimEvent>,
    mut frames_rx: mpsc::Receiver<Utf8Bytes>,
) -> u32 {
    let mut invalid_messages = 0;
    let mut last_invalid_log = Instant::now() - LOG_THROTTLE;

    loop {
        let control = tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    handle_text(
                        text.as_str(),
                        events_tx,
                        &mut invalid_messages,
                        &mut last_invalid_log,
                    )
                    .await
                }
                Some(Ok(Message::Binary(_))) => LoopControl::Disconnect(Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                })),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => LoopControl::Continue,
                Some(Ok(Message::Close(_))) | None => {
                    info!("websocket closed by client");
                    LoopControl::Disconnect(None)
                }
                Some(Err(e)) => {
                    warn!(error = %e, "websocket recv error");
                    LoopControl::Disconnect(None)
                }
            },

            frame = frames_rx.recv() => match frame {
                Some(bytes) => match socket.send(Message::Text(bytes)).await {
                    Ok(()) => LoopControl::Continue,
                    Err(e) => {
                        debug!(error = %e, "failed to send telemetry frame");
                        LoopControl::Disconnect(None)
                    }
                },
                // The flight loop dropped our sink; nothing more will arrive.
                None => LoopControl::Disconnect(Some(CloseFrame {
                    code: close_code::AGAIN,
                    reason: "telemetry stream ended".into(),
                })),
            },
        };

        if let LoopControl::Disconnect(frame) = control {
            match frame {
                Some(frame) => close_with(socket, frame).await,
                None => {
                    if let Err(e) = socket.close().await {
                        debug!(error = %e, "socket close error");
                    }
                }
            }
            return invalid_messages;
        }
    }
}

async fn handle_text(
    text: &str,
    events_tx: &mpsc::Sender<SimEvent>,
    invalid_messages: &mut u32,
    last_invalid_log: &mut Instant,
) -> LoopControl {
    let control = match serde_json::from_str::<ControlMessage>(text) {
        Ok(control) => control,
        Err(parse_err) => {
            // Malformed control input is dropped whole; the connection stays up.
            *invalid_messages += 1;
            if should_log(last_invalid_log) {
                warn!(
                    bytes = text.len(),
                    invalid_messages = *invalid_messages,
                    error = %parse_err,
                    "ignoring malformed control message"
                );
            }
            return LoopControl::Continue;
        }
    };

    match forward_control(events_tx, control).await {
        Ok(()) => LoopControl::Continue,
        Err(e) => {
            warn!(error = ?e, "flight loop gone; closing connection");
            LoopControl::Disconnect(Some(CloseFrame {
                code: close_code::AGAIN,
                reason: "simulation unavailable".into(),
            }))
        }
    }
}

// Waits for room in the event queue: the last command a client sends must never be lost.
async fn forward_control(
    events_tx: &mpsc::Sender<SimEvent>,
    control: ControlMessage,
) -> Result<(), NetError> {
    events_tx
        .send(SimEvent::Controls(control.into()))
        .await
        .map_err(|_| NetError::EventsClosed)
}

async fn close_with(socket: &mut WebSocket, frame: CloseFrame) {
    let _ = socket.send(Message::Close(Some(frame))).await;
    if let Err(e) = socket.close().await {
        debug!(error = %e, "socket close error");
    }
}
