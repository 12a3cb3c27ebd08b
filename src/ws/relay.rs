//! Operation relay: forwards an edit batch to the other members of the
//! sender's file room.
//!
//! Best effort, at most once. Nothing is logged for replay; a client that
//! missed a batch recovers through a snapshot.

use serde_json::Value;
use tracing::debug;

use super::dispatch::{decode, required, Context, Outbound, Reaction};
use super::session::ConnectionState;
use crate::error::SyncError;
use crate::models::{OpsPayload, OpsReceived, ServerEvent};

pub fn handle_ops(state: &ConnectionState, data: Value, ctx: &Context) -> Result<Reaction, SyncError> {
    let payload: OpsPayload = decode(data)?;

    let operations = payload.operations.filter(|ops| !ops.is_empty());
    let (project_id, file_id, operations, user_id) = match (
        required(payload.project_id),
        required(payload.file_id),
        operations,
        required(payload.user_id),
    ) {
        (Some(p), Some(f), Some(ops), Some(u)) => (p, f, ops, u),
        _ => return Err(SyncError::validation("Missing required data for operations")),
    };

    let room = state
        .room
        .as_ref()
        .ok_or_else(|| SyncError::validation("Join a document before sending operations"))?;
    if room.project_id != project_id || room.file_id != file_id {
        return Err(SyncError::validation("Operations target a document this connection has not joined"));
    }

    debug!(
        "Relaying {} operation(s) from user {} (session {:?}) in {}",
        operations.len(),
        user_id,
        payload.session_id,
        room
    );

    let now = ctx.now_ms();
    let event = ServerEvent::OpsReceived(OpsReceived {
        operations,
        user_id,
        file_id,
        project_id,
        timestamp: payload.timestamp.unwrap_or(now),
        session_id: required(payload.session_id),
        received_at: now,
    });
    Ok(Reaction::unchanged(state).emit(Outbound::room_except(room.clone(), event, state.connection_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Operation;
    use crate::ws::dispatch::Target;
    use crate::ws::session::RoomKey;
    use serde_json::json;
    use uuid::Uuid;

    fn joined() -> ConnectionState {
        ConnectionState::new(Uuid::new_v4()).joined("u1".into(), None, RoomKey::new("p1", "f1"))
    }

    fn ops_payload(ops: Value) -> Value {
        json!({"projectId": "p1", "fileId": "f1", "userId": "u1", "sessionId": "s1", "timestamp": 42, "operations": ops})
    }

    #[test]
    fn relays_to_room_excluding_sender() {
        let state = joined();
        let r = handle_ops(&state, ops_payload(json!([{"type": "insert", "position": 0, "text": "a", "length": 1}])), &Context::now()).unwrap();
        assert_eq!(r.state, state);
        assert_eq!(r.outbound.len(), 1);
        let out = &r.outbound[0];
        assert_eq!(out.target, Target::FileRoom(RoomKey::new("p1", "f1")));
        assert_eq!(out.except, Some(state.connection_id));
        match &out.event {
            ServerEvent::OpsReceived(ev) => {
                assert_eq!(ev.operations, vec![Operation::insert(0, "a")]);
                assert_eq!(ev.timestamp, 42);
                assert_eq!(ev.session_id.as_deref(), Some("s1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_timestamp_uses_server_time() {
        let ctx = Context::now();
        let payload = json!({"projectId": "p1", "fileId": "f1", "userId": "u1", "operations": [{"type": "delete", "position": 1, "length": 1}]});
        let r = handle_ops(&joined(), payload, &ctx).unwrap();
        match &r.outbound[0].event {
            ServerEvent::OpsReceived(ev) => {
                assert_eq!(ev.timestamp, ctx.now_ms());
                assert_eq!(ev.received_at, ctx.now_ms());
                assert!(ev.session_id.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        let err = handle_ops(&joined(), ops_payload(json!([])), &Context::now()).unwrap_err();
        assert_eq!(err, SyncError::validation("Missing required data for operations"));
    }

    #[test]
    fn sender_must_be_in_a_room() {
        let state = ConnectionState::new(Uuid::new_v4());
        let err = handle_ops(&state, ops_payload(json!([{"type": "insert", "text": "x"}])), &Context::now()).unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[test]
    fn batch_for_another_room_is_rejected() {
        let payload = json!({"projectId": "p1", "fileId": "other", "userId": "u1", "operations": [{"type": "insert", "text": "x"}]});
        let err = handle_ops(&joined(), payload, &Context::now()).unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }
}
