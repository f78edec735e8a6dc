// Boots one flight server per test binary and hands out its URLs.
#![allow(dead_code)]

use futures::StreamExt;
use serde_json::Value;
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

static SERVER_URL: OnceLock<String> = OnceLock::new();
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Start the server on first use and return its base URL (`http://host:port`).
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // A dedicated OS thread and runtime, so the server outlives each `#[tokio::test]`.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Ephemeral port: tests never collide with a locally running server.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{addr}"));
                flight_server::run(listener).await.expect("server failed");
            });
        });
        wait_until_accepting(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

pub fn ws_url() -> String {
    let base = ensure_server();
    format!("ws://{}/ws", base.trim_start_matches("http://"))
}

pub async fn connect() -> WsClient {
    let (ws, _response) = tokio_tungstenite::connect_async(ws_url())
        .await
        .expect("websocket handshake");
    ws
}

// Next telemetry frame as JSON, skipping control frames.
pub async fn next_frame(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("frame within two seconds")
            .expect("stream open")
            .expect("websocket message");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("frame is json");
        }
    }
}

// Read frames until one satisfies `pred`, failing after `within`.
pub async fn wait_for_frame(
    ws: &mut WsClient,
    within: Duration,
    pred: impl Fn(&Value) -> bool,
) -> Value {
    tokio::time::timeout(within, async {
        loop {
            let frame = next_frame(ws).await;
            if pred(&frame) {
                return frame;
            }
        }
    })
    .await
    .expect("expected frame never arrived")
}

fn wait_until_accepting(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}
