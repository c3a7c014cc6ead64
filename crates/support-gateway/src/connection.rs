use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use support_types::api::SocketError;

use crate::dispatcher::Dispatcher;
use crate::error::RelayError;
use crate::handlers::Relay;
use crate::push::PushTransport;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Drive one socket that already passed the connect handler.
///
/// Registers the socket with the dispatcher so fan-outs can reach it, feeds
/// each text frame to the message relay, and runs the disconnect handler
/// when either side goes away.
pub async fn handle_connection(
    socket: WebSocket,
    relay: Relay,
    dispatcher: Dispatcher,
    connection_id: String,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut outbound = dispatcher.register(&connection_id).await;

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward pushes -> client, with heartbeat
    let send_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                payload = outbound.recv() => {
                    let Some(payload) = payload else { break };
                    if sender.send(frame(payload)).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("{} heartbeat timeout (missed {} pongs), dropping connection", send_id, missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read chat frames from client
    let recv_relay = relay.clone();
    let recv_dispatcher = dispatcher.clone();
    let recv_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = recv_relay.relay_message(&recv_id, text.as_str()).await {
                        warn!(
                            "{} frame rejected: {} -- raw: {}",
                            recv_id,
                            e,
                            truncate(text.as_str(), 200)
                        );
                        reply_error(&recv_dispatcher, &recv_id, &e).await;
                    }
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                Message::Binary(data) => {
                    debug!("{} ignoring {} byte binary frame", recv_id, data.len());
                }
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.unregister(&connection_id).await;
    if let Err(e) = relay.disconnect(&connection_id).await {
        warn!("{} disconnect cleanup failed: {}", connection_id, e);
    }
    info!("{} closed", connection_id);
}

/// Tell the sending socket why its frame was dropped. Returns whether the
/// reply was queued.
async fn reply_error(dispatcher: &Dispatcher, connection_id: &str, error: &RelayError) -> bool {
    let reply = SocketError {
        error: error.to_string(),
    };
    let json = match serde_json::to_vec(&reply) {
        Ok(json) => json,
        Err(e) => {
            debug!("{} error reply not encoded: {}", connection_id, e);
            return false;
        }
    };
    match dispatcher.push(connection_id, Bytes::from(json)).await {
        Ok(()) => true,
        Err(e) => {
            debug!("{} error reply not delivered: {}", connection_id, e);
            false
        }
    }
}

/// Pushed payloads are JSON text; anything else goes out as binary.
fn frame(payload: Bytes) -> Message {
    match std::str::from_utf8(&payload) {
        Ok(text) => Message::Text(text.into()),
        Err(_) => Message::Binary(payload),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
