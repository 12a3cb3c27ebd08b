//! Glue between a connection's inbound frames and the shared room registry.
//!
//! Per frame: parse, dispatch to a pure handler, commit the reaction to the
//! registry under its lock, then run any store reads with the lock released.

use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, warn};
use uuid::Uuid;

use super::dispatch::{Command, Context, Dispatcher};
use super::notifier::ProjectNotifier;
use super::registry::{RegistryStats, RoomRegistry};
use super::session::{ConnectionId, ConnectionState};
use super::snapshot::SnapshotProvider;
use crate::error::SyncError;
use crate::models::{Envelope, ServerEvent};

pub struct Hub {
    registry: Arc<RoomRegistry>,
    dispatcher: Dispatcher,
    snapshots: SnapshotProvider,
}

impl Hub {
    pub fn new(snapshots: SnapshotProvider) -> Self {
        Self {
            registry: Arc::new(RoomRegistry::new()),
            dispatcher: Dispatcher::default(),
            snapshots,
        }
    }

    /// Accept a connection: assign an id and the channel its events are
    /// written to.
    pub fn connect(&self) -> (ConnectionState, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        let id = Uuid::new_v4();
        self.registry.register(id, tx);
        (ConnectionState::new(id), rx)
    }

    /// Process one text frame and return the connection's next state.
    pub async fn handle_text(&self, state: ConnectionState, text: &str) -> ConnectionState {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Unparseable frame on connection {}: {}", state.connection_id, e);
                self.reply_error(&state, SyncError::validation(format!("Malformed message: {}", e)));
                return state;
            }
        };
        self.handle(state, envelope).await
    }

    /// Process one parsed event.
    pub async fn handle(&self, state: ConnectionState, envelope: Envelope) -> ConnectionState {
        debug!("Event '{}' on connection {}", envelope.event, state.connection_id);
        let ctx = Context::now();
        let reaction = self.dispatcher.dispatch(&state, envelope, &ctx);

        self.registry.commit(
            state.connection_id,
            reaction.state.user_id.as_deref(),
            reaction.state.room.clone(),
            &reaction.outbound,
        );

        for command in reaction.commands {
            match command {
                Command::LoadSnapshot { project_id, file_id } => {
                    let event = match self.snapshots.fetch(&project_id, &file_id, &ctx).await {
                        Ok(snapshot) => ServerEvent::Snapshot(snapshot),
                        Err(e) => e.into_event(),
                    };
                    self.registry.send_to(state.connection_id, event);
                }
            }
        }
        reaction.state
    }

    fn reply_error(&self, state: &ConnectionState, error: SyncError) {
        self.registry.send_to(state.connection_id, error.into_event());
    }

    /// Tear down a connection. Idempotent.
    pub fn disconnect(&self, id: ConnectionId) {
        self.registry.disconnect(id);
    }

    pub fn notifier(&self) -> ProjectNotifier {
        ProjectNotifier::new(self.registry.clone(), self.snapshots.clone())
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    pub fn cached_snapshots(&self) -> u64 {
        self.snapshots.cached_entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OpsReceived, UserJoined};
    use crate::storage::MemoryDocumentStore;
    use crate::ws::session::RoomKey;
    use serde_json::json;

    fn hub() -> Hub {
        let store = MemoryDocumentStore::new().with_document("p1", "f1", "hello");
        Hub::new(SnapshotProvider::uncached(Arc::new(store)))
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    async fn send(hub: &Hub, state: ConnectionState, value: serde_json::Value) -> ConnectionState {
        hub.handle_text(state, &value.to_string()).await
    }

    #[tokio::test]
    async fn join_then_ops_reach_only_the_peer() {
        let hub = hub();
        let (a, mut rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();

        let a = send(&hub, a, json!({"event": "doc:join", "data": {"projectId": "p1", "fileId": "f1", "userId": "u1"}})).await;
        let b = send(&hub, b, json!({"event": "doc:join", "data": {"projectId": "p1", "fileId": "f1", "userId": "u2"}})).await;
        drain(&mut rx_a);
        let joined = drain(&mut rx_b);
        assert!(matches!(&joined[..], [ServerEvent::UserJoined(UserJoined { user_id, .. })] if user_id == "u2"));

        let ops = json!({"event": "doc:ops", "data": {
            "projectId": "p1", "fileId": "f1", "userId": "u1", "sessionId": "s1",
            "operations": [{"type": "insert", "position": 5, "text": "!"}]
        }});
        send(&hub, a.clone(), ops).await;

        assert!(drain(&mut rx_a).is_empty());
        let received = drain(&mut rx_b);
        assert_eq!(received.len(), 1);
        assert!(matches!(&received[0], ServerEvent::OpsReceived(OpsReceived { user_id, session_id, .. })
            if user_id == "u1" && session_id.as_deref() == Some("s1")));
        assert_eq!(b.room, Some(RoomKey::new("p1", "f1")));
    }

    #[tokio::test]
    async fn snapshot_goes_to_requester_only() {
        let hub = hub();
        let (a, mut rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        let a = send(&hub, a, json!({"event": "doc:join", "data": {"projectId": "p1", "fileId": "f1", "userId": "u1"}})).await;
        send(&hub, b, json!({"event": "doc:join", "data": {"projectId": "p1", "fileId": "f1", "userId": "u2"}})).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        send(&hub, a, json!({"event": "doc:requestSnapshot", "data": {"projectId": "p1", "fileId": "f1"}})).await;
        let got = drain(&mut rx_a);
        assert!(matches!(&got[..], [ServerEvent::Snapshot(s)] if s.content == "hello"));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn missing_snapshot_is_an_error_for_the_caller() {
        let hub = hub();
        let (a, mut rx_a) = hub.connect();
        send(&hub, a, json!({"event": "doc:requestSnapshot", "data": {"projectId": "p1", "fileId": "zz"}})).await;
        assert_eq!(drain(&mut rx_a), vec![ServerEvent::error("File not found")]);
    }

    #[tokio::test]
    async fn malformed_frame_keeps_state_and_reports() {
        let hub = hub();
        let (a, mut rx_a) = hub.connect();
        let a2 = hub.handle_text(a.clone(), "{not json").await;
        assert_eq!(a, a2);
        let got = drain(&mut rx_a);
        assert!(matches!(&got[..], [ServerEvent::Error(e)] if e.message.starts_with("Malformed message")));
    }

    #[tokio::test]
    async fn ops_before_join_are_rejected() {
        let hub = hub();
        let (a, mut rx_a) = hub.connect();
        send(&hub, a, json!({"event": "doc:ops", "data": {
            "projectId": "p1", "fileId": "f1", "userId": "u1",
            "operations": [{"type": "insert", "position": 0, "text": "x"}]
        }}))
        .await;
        assert_eq!(drain(&mut rx_a), vec![ServerEvent::error("Join a document before sending operations")]);
    }

    #[tokio::test]
    async fn duplicate_join_does_not_announce_a_departure() {
        let hub = hub();
        let (a, _rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        let join_a = json!({"event": "doc:join", "data": {"projectId": "p1", "fileId": "f1", "userId": "u1"}});
        let a = send(&hub, a, join_a.clone()).await;
        send(&hub, b, json!({"event": "doc:join", "data": {"projectId": "p1", "fileId": "f1", "userId": "u2"}})).await;
        drain(&mut rx_b);

        send(&hub, a, join_a).await;
        let names: Vec<_> = drain(&mut rx_b).iter().map(|ev| ev.name()).collect();
        assert_eq!(names, vec!["user:joined"]);
        assert_eq!(hub.stats().largest_room, 2);
    }

    #[tokio::test]
    async fn disconnect_announces_departure_once() {
        let hub = hub();
        let (a, _rx_a) = hub.connect();
        let (b, mut rx_b) = hub.connect();
        let a = send(&hub, a, json!({"event": "doc:join", "data": {"projectId": "p1", "fileId": "f1", "userId": "u1"}})).await;
        send(&hub, b, json!({"event": "doc:join", "data": {"projectId": "p1", "fileId": "f1", "userId": "u2"}})).await;
        drain(&mut rx_b);

        hub.disconnect(a.connection_id);
        hub.disconnect(a.connection_id);
        let got = drain(&mut rx_b);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].name(), "user:left");
        assert_eq!(hub.stats().connections, 1);
    }
}
