//! HTTP route handlers for the back office.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (ERP database)
//!
//! # Sales analysis
//! POST /analyze/analyze1         - Grouping tree as JSON
//! POST /analyze/analyze1/stream  - Progress events, then the tree (SSE)
//! ```

use axum::Router;

use crate::state::AppState;

pub mod analyze;

/// Build the application router (health routes are added by the binary).
pub fn routes() -> Router<AppState> {
    Router::new().merge(analyze::router())
}
