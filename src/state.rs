use std::sync::Arc;

use crate::config::Config;
use crate::ws::Hub;

/// Shared state handed to every route and socket.
pub struct AppState {
    pub config: Config,
    pub hub: Arc<Hub>,
}

impl AppState {
    pub fn new(config: Config, hub: Hub) -> Arc<Self> {
        Arc::new(Self { config, hub: Arc::new(hub) })
    }
}
