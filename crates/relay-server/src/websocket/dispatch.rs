//! Single event-processing task.
//!
//! Every connection feeds one shared queue; the dispatcher owns the router
//! and handles each input to completion before taking the next.

use relay_core::{ConnectionId, InboundEvent, Router};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Work item for the dispatcher.
#[derive(Debug)]
pub enum RelayInput {
    /// A decoded event from a live connection.
    Event(ConnectionId, InboundEvent),
    /// The connection has closed. Sent at most once per connection.
    Closed(ConnectionId),
}

/// Drain the inbound queue until every sender is gone or shutdown is signalled.
pub async fn run_dispatcher(
    mut rx: mpsc::Receiver<RelayInput>,
    router: Router,
    cancel: CancellationToken,
) {
    loop {
        let input = tokio::select! {
            input = rx.recv() => input,
            () = cancel.cancelled() => {
                info!("dispatcher stopping on shutdown");
                break;
            }
        };
        let Some(input) = input else {
            info!("dispatcher queue closed");
            break;
        };
        match input {
            RelayInput::Event(from, event) => {
                let _ = router.handle(&from, event);
            }
            RelayInput::Closed(from) => {
                let _ = router.disconnect(&from);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use relay_core::SessionRegistry;

    use super::*;
    use crate::websocket::connection::ClientConnection;
    use crate::websocket::hub::ConnectionHub;

    struct Setup {
        tx: mpsc::Sender<RelayInput>,
        registry: Arc<SessionRegistry>,
        hub: Arc<ConnectionHub>,
        cancel: CancellationToken,
        handle: tokio::task::JoinHandle<()>,
    }

    fn setup() -> Setup {
        let registry = Arc::new(SessionRegistry::new());
        let hub = Arc::new(ConnectionHub::new());
        let router = Router::new(registry.clone(), hub.clone());
        let (tx, rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_dispatcher(rx, router, cancel.clone()));
        Setup {
            tx,
            registry,
            hub,
            cancel,
            handle,
        }
    }

    fn attach(hub: &ConnectionHub, id: &str) -> (ConnectionId, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        let id = ConnectionId::from_raw(id);
        hub.add(Arc::new(ClientConnection::new(id.clone(), tx)));
        (id, rx)
    }

    async fn next_event(rx: &mut mpsc::Receiver<Arc<String>>) -> serde_json::Value {
        let json = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[tokio::test]
    async fn processes_events_in_queue_order() {
        let s = setup();
        let (a, mut rx_a) = attach(&s.hub, "a");
        let (op, mut rx_op) = attach(&s.hub, "op");

        s.tx.send(RelayInput::Event(op.clone(), InboundEvent::JoinOperator)).await.unwrap();
        s.tx.send(RelayInput::Event(a.clone(), InboundEvent::JoinUser)).await.unwrap();
        for i in 0..3 {
            s.tx.send(RelayInput::Event(a.clone(), InboundEvent::UserMessage(format!("m{i}"))))
                .await
                .unwrap();
        }

        assert_eq!(next_event(&mut rx_op).await["event"], "admin_init");
        assert_eq!(next_event(&mut rx_a).await["event"], "user_init");
        assert_eq!(next_event(&mut rx_op).await["event"], "user_connected");
        for i in 0..3 {
            let ev = next_event(&mut rx_op).await;
            assert_eq!(ev["event"], "new_message");
            assert_eq!(ev["data"]["message"]["text"], format!("m{i}"));
        }
        s.cancel.cancel();
        s.handle.await.unwrap();
    }

    #[tokio::test]
    async fn closed_input_cleans_up_session() {
        let s = setup();
        let (a, _rx_a) = attach(&s.hub, "a");
        s.tx.send(RelayInput::Event(a.clone(), InboundEvent::JoinUser)).await.unwrap();
        s.tx.send(RelayInput::Closed(a.clone())).await.unwrap();
        drop(s.tx);

        s.handle.await.unwrap();
        assert!(s.registry.is_empty());
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let s = setup();
        s.cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), s.handle)
            .await
            .unwrap()
            .unwrap();
    }
}
