mod support;

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

const FIELDS: [&str; 13] = [
    "x",
    "y",
    "altitude",
    "phi_deg",
    "theta_deg",
    "psi_deg",
    "airspeed",
    "vertical_speed",
    "p_deg_s",
    "q_deg_s",
    "r_deg_s",
    "throttle",
    "physics_engine",
];

#[tokio::test]
async fn when_client_connects_then_a_full_frame_arrives_immediately() {
    let mut ws = support::connect().await;

    let frame = tokio::time::timeout(Duration::from_millis(500), support::next_frame(&mut ws))
        .await
        .expect("first frame without waiting for a tick");

    for field in FIELDS {
        assert!(frame.get(field).is_some(), "missing {field}");
    }
    assert_eq!(frame["physics_engine"], "internal");
}

#[tokio::test]
async fn when_throttle_above_range_is_sent_then_frames_report_it_clamped() {
    let mut ws = support::connect().await;
    support::next_frame(&mut ws).await;

    ws.send(Message::text(r#"{"throttle":2.0}"#))
        .await
        .expect("send control");

    let frame = support::wait_for_frame(&mut ws, Duration::from_secs(2), |frame| {
        frame["throttle"].as_f64() != Some(0.0)
    })
    .await;
    assert_eq!(frame["throttle"], 1.0);
}

#[tokio::test]
async fn when_message_is_malformed_then_stream_keeps_flowing() {
    let mut ws = support::connect().await;
    support::next_frame(&mut ws).await;

    ws.send(Message::text("definitely not json"))
        .await
        .expect("send garbage");
    ws.send(Message::text(r#"{"throttle":"full"}"#))
        .await
        .expect("send wrong type");

    for _ in 0..5 {
        support::next_frame(&mut ws).await;
    }
}

#[tokio::test]
async fn when_binary_frame_is_sent_then_server_closes_the_connection() {
    let mut ws = support::connect().await;
    support::next_frame(&mut ws).await;

    ws.send(Message::binary(vec![1u8, 2, 3]))
        .await
        .expect("send binary");

    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "connection stayed open");
}

#[tokio::test]
async fn when_several_clients_are_connected_then_each_receives_frames() {
    let mut first = support::connect().await;
    let mut second = support::connect().await;
    let mut third = support::connect().await;

    drop(support::connect().await);

    for ws in [&mut first, &mut second, &mut third] {
        for _ in 0..3 {
            support::next_frame(ws).await;
        }
    }
}
