use scanner_engine::Scanner;
use std::sync::Arc;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    pub scanner: Arc<Scanner>,
}

impl AppState {
    pub fn new(scanner: Arc<Scanner>) -> Self {
        Self { scanner }
    }
}
