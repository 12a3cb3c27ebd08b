//! Event dispatch table.
//!
//! Every client event maps to a plain function
//! `(state, payload, context) -> Reaction`. Handlers never touch the network
//! or the membership table: they describe the next connection state, the
//! events to emit, and any I/O to run afterwards. The [`Hub`](super::hub::Hub)
//! commits a reaction atomically.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::presence::{handle_join, handle_leave};
use super::relay::handle_ops;
use super::session::{ConnectionId, ConnectionState, RoomKey};
use super::snapshot::handle_snapshot_request;
use crate::error::SyncError;
use crate::models::{Envelope, PongPayload, ServerEvent};

/// Where an outbound event goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Only the connection that sent the request.
    Caller,
    /// Every member of a file room.
    FileRoom(RoomKey),
    /// Every member of a project-wide room.
    ProjectRoom(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    pub target: Target,
    pub event: ServerEvent,
    pub except: Option<ConnectionId>,
}

impl Outbound {
    pub fn caller(event: ServerEvent) -> Self {
        Self { target: Target::Caller, event, except: None }
    }

    pub fn room(room: RoomKey, event: ServerEvent) -> Self {
        Self { target: Target::FileRoom(room), event, except: None }
    }

    pub fn room_except(room: RoomKey, event: ServerEvent, except: ConnectionId) -> Self {
        Self { target: Target::FileRoom(room), event, except: Some(except) }
    }
}

/// Work that has to suspend and therefore runs after the membership commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    LoadSnapshot { project_id: String, file_id: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reaction {
    pub state: ConnectionState,
    pub outbound: Vec<Outbound>,
    pub commands: Vec<Command>,
}

impl Reaction {
    /// No state change, nothing to send.
    pub fn unchanged(state: &ConnectionState) -> Self {
        Self { state: state.clone(), outbound: Vec::new(), commands: Vec::new() }
    }

    pub fn with_state(state: ConnectionState) -> Self {
        Self { state, outbound: Vec::new(), commands: Vec::new() }
    }

    pub fn emit(mut self, outbound: Outbound) -> Self {
        self.outbound.push(outbound);
        self
    }

    pub fn run(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }
}

/// Values handlers may read but must not produce themselves.
#[derive(Clone, Copy, Debug)]
pub struct Context {
    pub now: DateTime<Utc>,
}

impl Context {
    pub fn now() -> Self {
        Self { now: Utc::now() }
    }

    pub fn now_ms(&self) -> i64 {
        self.now.timestamp_millis()
    }
}

pub type Handler = fn(&ConnectionState, Value, &Context) -> Result<Reaction, SyncError>;

pub struct Dispatcher {
    handlers: HashMap<&'static str, Handler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut d = Self { handlers: HashMap::new() };
        d.register("doc:join", handle_join);
        d.register("doc:leave", handle_leave);
        d.register("doc:ops", handle_ops);
        d.register("doc:requestSnapshot", handle_snapshot_request);
        d.register("ping", handle_ping);
        // Cursor and presence channels are accepted but not implemented.
        d.register("cursor:update", handle_stub);
        d.register("cursor:leave", handle_stub);
        d.register("presence:join", handle_stub);
        d.register("presence:leave", handle_stub);
        d
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, event: &'static str, handler: Handler) {
        self.handlers.insert(event, handler);
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Run the handler for `envelope`. Errors become an `error` event for the
    /// caller and leave the state untouched.
    pub fn dispatch(&self, state: &ConnectionState, envelope: Envelope, ctx: &Context) -> Reaction {
        let result = match self.handlers.get(envelope.event.as_str()) {
            Some(handler) => handler(state, envelope.data, ctx),
            None => Err(SyncError::validation(format!("Unknown event '{}'", envelope.event))),
        };
        match result {
            Ok(reaction) => reaction,
            Err(e) => {
                warn!("Rejected '{}' from connection {}: {}", envelope.event, state.connection_id, e);
                Reaction::unchanged(state).emit(Outbound::caller(e.into_event()))
            }
        }
    }
}

/// Decode a handler payload. A null payload decodes as the type's default.
pub(crate) fn decode<T: DeserializeOwned + Default>(data: Value) -> Result<T, SyncError> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data).map_err(|e| SyncError::validation(format!("Malformed payload: {}", e)))
}

/// Treat absent and empty strings alike, the way clients send them.
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn handle_ping(state: &ConnectionState, _data: Value, ctx: &Context) -> Result<Reaction, SyncError> {
    Ok(Reaction::unchanged(state).emit(Outbound::caller(ServerEvent::Pong(PongPayload {
        date: ctx.now.to_rfc3339(),
    }))))
}

fn handle_stub(state: &ConnectionState, data: Value, _ctx: &Context) -> Result<Reaction, SyncError> {
    debug!("Ignoring cursor/presence event from {}: {}", state.connection_id, data);
    Ok(Reaction::unchanged(state))
}
