// src/state.rs
use std::sync::Arc;

use crate::{config::Config, store::PollStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn PollStore>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: Config, store: Arc<dyn PollStore>) -> SharedState {
        Arc::new(Self { config, store })
    }
}
