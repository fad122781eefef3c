//! API shared state

use std::time::Instant;

use crate::Hub;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Repository, ingestion, alerting and query services
    pub hub: Hub,

    /// When the server was started, for uptime reporting
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(hub: Hub) -> Self {
        Self {
            hub,
            started_at: Instant::now(),
        }
    }
}
