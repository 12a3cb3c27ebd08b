use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::coalescer::{EditCoalescer, RelayMode};
use super::reconcile::{Decision, Reconciler};
use super::typing::TypingTracker;
use crate::models::{ClientEvent, JoinPayload, OpsPayload, ServerEvent, SnapshotRequestPayload};

/// Identity of one editor tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub project_id: String,
    pub file_id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub session_id: String,
}

/// What an incoming server event did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// The buffer now holds new content.
    BufferChanged,
    /// A remote batch was looked at and not applied.
    Skipped(Decision),
    /// A snapshot arrived mid-typing and is held until typing stops.
    SnapshotDeferred,
    CollaboratorsChanged,
    /// The server reported an error for one of our requests.
    Error(String),
    /// Nothing relevant to this file.
    Ignored,
}

/// Client-side state for one open file: the editor buffer plus the rules
/// deciding when local edits go out and remote ones come in.
#[derive(Debug, Clone)]
pub struct EditorSession {
    identity: SessionIdentity,
    buffer: String,
    typing: TypingTracker,
    coalescer: EditCoalescer,
    reconciler: Reconciler,
    collaborators: BTreeMap<String, String>,
    deferred_snapshot: Option<String>,
}

impl EditorSession {
    pub fn new(identity: SessionIdentity, mode: RelayMode) -> Self {
        let reconciler = Reconciler::new(identity.session_id.clone());
        Self {
            identity,
            buffer: String::new(),
            typing: TypingTracker::default(),
            coalescer: EditCoalescer::new(mode, ""),
            reconciler,
            collaborators: BTreeMap::new(),
            deferred_snapshot: None,
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_typing(&self, now: Instant) -> bool {
        self.typing.is_typing(now)
    }

    /// Users present in the file room, by id, with their display names.
    pub fn collaborators(&self) -> &BTreeMap<String, String> {
        &self.collaborators
    }

    pub fn has_deferred_snapshot(&self) -> bool {
        self.deferred_snapshot.is_some()
    }

    pub fn join_event(&self) -> ClientEvent {
        ClientEvent::Join(JoinPayload {
            project_id: Some(self.identity.project_id.clone()),
            file_id: Some(self.identity.file_id.clone()),
            user_id: Some(self.identity.user_id.clone()),
            user_name: self.identity.user_name.clone(),
        })
    }

    pub fn leave_event(&self) -> ClientEvent {
        ClientEvent::Leave
    }

    pub fn snapshot_request(&self) -> ClientEvent {
        ClientEvent::RequestSnapshot(SnapshotRequestPayload {
            project_id: Some(self.identity.project_id.clone()),
            file_id: Some(self.identity.file_id.clone()),
        })
    }

    /// The editor content changed because the user typed.
    pub fn local_edit(&mut self, content: impl Into<String>, now: Instant) -> u64 {
        let content = content.into();
        self.buffer = content.clone();
        self.typing.keystroke(now);
        self.coalescer.record(content, now)
    }

    /// Earliest instant at which [`EditorSession::tick`] has work to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        let snapshot = if self.deferred_snapshot.is_some() { self.typing.idle_at() } else { None };
        match (self.coalescer.deadline(), snapshot) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Advance timers. Returns the batch to send, if the debounce window of
    /// the latest local change has elapsed, and applies a held snapshot once
    /// typing has stopped.
    pub fn tick(&mut self, now: Instant, wall_ms: i64) -> Option<ClientEvent> {
        let outgoing = self.coalescer.poll(now, wall_ms).map(|flush| {
            self.reconciler.record_local(&flush.operations);
            debug!("Sending change #{} ({} operation(s))", flush.change, flush.operations.len());
            ClientEvent::Ops(OpsPayload {
                project_id: Some(self.identity.project_id.clone()),
                file_id: Some(self.identity.file_id.clone()),
                operations: Some(flush.operations),
                user_id: Some(self.identity.user_id.clone()),
                timestamp: Some(flush.timestamp),
                session_id: Some(self.identity.session_id.clone()),
            })
        });

        if !self.typing.is_typing(now) && !self.coalescer.has_pending() {
            if let Some(content) = self.deferred_snapshot.take() {
                info!("Applying snapshot held while typing");
                self.replace_buffer(content);
            }
        }
        outgoing
    }

    /// React to one event from the server.
    pub fn on_event(&mut self, event: &ServerEvent, now: Instant) -> SessionUpdate {
        match event {
            ServerEvent::UserJoined(joined) if self.is_ours(&joined.project_id, &joined.file_id) => {
                self.collaborators.insert(joined.user_id.clone(), joined.user_name.clone());
                SessionUpdate::CollaboratorsChanged
            }
            ServerEvent::UserLeft(left) if self.is_ours(&left.project_id, &left.file_id) => {
                if self.collaborators.remove(&left.user_id).is_some() {
                    SessionUpdate::CollaboratorsChanged
                } else {
                    SessionUpdate::Ignored
                }
            }
            ServerEvent::OpsReceived(batch) if self.is_ours(&batch.project_id, &batch.file_id) => {
                let typing = self.typing.is_typing(now);
                match self.reconciler.reconcile(&self.buffer, batch, typing) {
                    Decision::Apply(content) => {
                        self.replace_buffer(content);
                        SessionUpdate::BufferChanged
                    }
                    other => SessionUpdate::Skipped(other),
                }
            }
            ServerEvent::Snapshot(snapshot) if self.is_ours(&snapshot.project_id, &snapshot.file_id) => {
                if self.typing.is_typing(now) {
                    self.deferred_snapshot = Some(snapshot.content.clone());
                    SessionUpdate::SnapshotDeferred
                } else {
                    self.replace_buffer(snapshot.content.clone());
                    SessionUpdate::BufferChanged
                }
            }
            ServerEvent::Error(e) => {
                warn!("Server error: {}", e.message);
                SessionUpdate::Error(e.message.clone())
            }
            _ => SessionUpdate::Ignored,
        }
    }

    fn is_ours(&self, project_id: &str, file_id: &str) -> bool {
        self.identity.project_id == project_id && self.identity.file_id == file_id
    }

    fn replace_buffer(&mut self, content: String) {
        self.coalescer.rebase(content.clone());
        self.buffer = content;
    }
}
