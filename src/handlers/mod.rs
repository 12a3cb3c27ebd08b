pub mod health;
pub mod diagnostics;
pub mod project_events;

pub use health::*;
pub use diagnostics::*;
pub use project_events::*;
