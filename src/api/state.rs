use std::sync::Arc;

use crate::infrastructure::services::{ConnectionRegistry, RecognitionService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recognition: Arc<RecognitionService>,
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    pub fn new(recognition: Arc<RecognitionService>) -> Self {
        Self {
            recognition,
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }
}
