//! WebSocket session lifecycle: handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use relay_core::{ConnectionId, InboundEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::dispatch::RelayInput;
use super::hub::ConnectionHub;
use crate::metrics::{
    WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_CONNECTION_DURATION_SECONDS,
    WS_DISCONNECTIONS_TOTAL,
};

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the connection with the hub under a fresh `ConnectionId`
/// 2. Forwards decoded inbound frames to the dispatcher
/// 3. Drains the connection's outbound queue to the socket
/// 4. On close (from either side, or shutdown) reports `Closed` exactly once
///    and removes the connection from the hub
#[instrument(skip_all, fields(conn_id = %connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: ConnectionId,
    hub: Arc<ConnectionHub>,
    inbound: mpsc::Sender<RelayInput>,
    max_send_queue: usize,
    cancel: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(max_send_queue);
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), send_tx));
    hub.add(Arc::clone(&connection));
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    info!("client connected");

    // Writer: one task per connection keeps per-destination order.
    let mut writer = tokio::spawn(async move {
        while let Some(text) = send_rx.recv().await {
            if ws_tx.send(Message::Text(String::clone(&text).into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let reader_id = connection_id.clone();
    let reader_inbound = inbound.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = ws_rx.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(e) => {
                    debug!(error = %e, "websocket read error");
                    break;
                }
            };
            let parsed = match msg {
                Message::Text(ref text) => InboundEvent::parse(text.as_str()),
                Message::Binary(ref data) => InboundEvent::parse_bytes(data),
                Message::Close(_) => {
                    info!("client sent close frame");
                    break;
                }
                Message::Ping(_) | Message::Pong(_) => continue,
            };
            match parsed {
                Ok(event) => {
                    debug!(event = event.event_name(), "inbound event");
                    if reader_inbound
                        .send(RelayInput::Event(reader_id.clone(), event))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "dropping unreadable frame"),
            }
        }
    });

    let reader_finished = tokio::select! {
        _ = &mut reader => true,
        _ = &mut writer => false,
        () = cancel.cancelled() => {
            debug!("session ending on shutdown");
            false
        }
    };
    let still_reading = (!reader_finished).then_some(reader);

    let _ = end_session(still_reading, &connection, &inbound).await;
    let _ = hub.remove(&connection_id);
    writer.abort();
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
    info!(
        age_ms = connection.age().as_millis() as u64,
        dropped = connection.drop_count(),
        "client disconnected"
    );
}

/// Stop a still-running reader, then report the close.
///
/// The reader is awaited after the abort, so any event it was forwarding is
/// queued before `Closed` and never after it.
pub async fn end_session(
    reader: Option<JoinHandle<()>>,
    connection: &ClientConnection,
    inbound: &mpsc::Sender<RelayInput>,
) -> bool {
    if let Some(reader) = reader {
        reader.abort();
        if let Err(e) = reader.await {
            if e.is_panic() {
                warn!(conn_id = %connection.id, "reader task panicked");
            }
        }
    }
    close_once(connection, inbound).await
}

/// Report the close to the dispatcher unless it has already been reported.
pub async fn close_once(connection: &ClientConnection, inbound: &mpsc::Sender<RelayInput>) -> bool {
    if !connection.mark_closed() {
        return false;
    }
    if inbound
        .send(RelayInput::Closed(connection.id.clone()))
        .await
        .is_err()
    {
        debug!(conn_id = %connection.id, "dispatcher gone, close not delivered");
    }
    true
}
