//! API shared state

use std::sync::Arc;

use crate::supervisor::Supervisor;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub supervisor: Arc<Supervisor>,
}

impl ApiState {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self { supervisor }
    }
}
