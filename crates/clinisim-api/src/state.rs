use std::sync::Arc;

use clinisim_sessions::lifecycle::SessionService;

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
}
