pub mod diagnostics;
pub mod error;
pub mod events;
pub mod health;
pub mod operation;
pub mod project_event;
pub mod snapshot;

pub use diagnostics::*;
pub use error::*;
pub use events::*;
pub use health::*;
pub use operation::*;
pub use project_event::*;
pub use snapshot::*;
