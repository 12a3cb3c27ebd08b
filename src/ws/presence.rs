//! Join/leave handling and the presence events it produces.
//!
//! A join is announced to the whole target room, the joining connection
//! included, so every client confirms joins through the same channel.

use serde_json::Value;
use tracing::info;

use super::dispatch::{decode, required, Context, Outbound, Reaction};
use super::session::{ConnectionState, RoomKey};
use crate::error::SyncError;
use crate::models::{JoinPayload, ServerEvent, UserJoined, UserLeft};

pub fn joined_event(user_id: &str, user_name: Option<&str>, room: &RoomKey) -> ServerEvent {
    ServerEvent::UserJoined(UserJoined {
        user_id: user_id.to_string(),
        file_id: room.file_id.clone(),
        project_id: room.project_id.clone(),
        user_name: user_name.unwrap_or(user_id).to_string(),
    })
}

pub fn left_event(user_id: &str, room: &RoomKey) -> ServerEvent {
    ServerEvent::UserLeft(UserLeft {
        user_id: user_id.to_string(),
        file_id: room.file_id.clone(),
        project_id: room.project_id.clone(),
    })
}

/// The departure announcement for `state`'s current room, if it has one.
pub fn departure(state: &ConnectionState) -> Option<Outbound> {
    let room = state.room.as_ref()?;
    let user = state.user_id.as_deref().unwrap_or_default();
    Some(Outbound::room(room.clone(), left_event(user, room)))
}

pub fn handle_join(state: &ConnectionState, data: Value, _ctx: &Context) -> Result<Reaction, SyncError> {
    let payload: JoinPayload = decode(data)?;
    let (project_id, file_id, user_id) = match (
        required(payload.project_id),
        required(payload.file_id),
        required(payload.user_id),
    ) {
        (Some(p), Some(f), Some(u)) => (p, f, u),
        _ => return Err(SyncError::validation("Missing required data")),
    };
    let user_name = required(payload.user_name);
    let room = RoomKey::new(project_id, file_id);

    let mut reaction = Reaction::with_state(state.joined(user_id.clone(), user_name.clone(), room.clone()));
    // Switching files leaves the previous room first. Re-joining the same
    // room is not a departure.
    if state.room.as_ref() != Some(&room) {
        if let Some(previous) = departure(state) {
            reaction = reaction.emit(previous);
        }
    }
    info!("User {} joining {} on connection {}", user_id, room, state.connection_id);
    Ok(reaction.emit(Outbound::room(room.clone(), joined_event(&user_id, user_name.as_deref(), &room))))
}

pub fn handle_leave(state: &ConnectionState, _data: Value, _ctx: &Context) -> Result<Reaction, SyncError> {
    match departure(state) {
        Some(outbound) => {
            info!(
                "User {} leaving {} on connection {}",
                state.user_id.as_deref().unwrap_or("?"),
                state.room.as_ref().map(ToString::to_string).unwrap_or_default(),
                state.connection_id
            );
            Ok(Reaction::with_state(state.left()).emit(outbound))
        }
        None => Ok(Reaction::unchanged(state)),
    }
}
