// Application state module
// Immutable configuration plus the item service shared by every connection

use super::types::Config;
use crate::service::ItemService;

/// Application state
pub struct AppState {
    pub config: Config,
    pub items: ItemService,
}

impl AppState {
    pub const fn new(config: Config, items: ItemService) -> Self {
        Self { config, items }
    }
}
