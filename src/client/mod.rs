//! Client Reconciliation Layer.
//!
//! Everything an editor needs to take part in a session: when to send local
//! edits, whether to apply remote ones, and a socket client to carry both.

pub mod coalescer;
pub mod connection;
pub mod reconcile;
pub mod session;
pub mod typing;

pub use coalescer::{EditCoalescer, Flush, RelayMode, DEBOUNCE_WINDOW};
pub use connection::{ClientError, SyncClient};
pub use reconcile::{Decision, Reconciler, Significance};
pub use session::{EditorSession, SessionIdentity, SessionUpdate};
pub use typing::{TypingTracker, TYPING_QUIET_PERIOD};
