pub mod dispatch;
pub mod handler;
pub mod hub;
pub mod notifier;
pub mod presence;
pub mod registry;
pub mod relay;
pub mod session;
pub mod snapshot;

pub use dispatch::{Command, Context, Dispatcher, Outbound, Reaction, Target};
pub use hub::Hub;
pub use notifier::ProjectNotifier;
pub use registry::{RegistryStats, RoomRegistry};
pub use session::{ConnectionId, ConnectionState, RoomKey};
pub use snapshot::SnapshotProvider;
