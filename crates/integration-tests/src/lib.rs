//! Integration tests for Jewel Ops.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the back office against an ERP database
//! ERP_DATABASE_URL=postgres://... cargo run -p jewel-ops-backoffice
//!
//! # Run the ignored integration tests
//! cargo test -p jewel-ops-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `analyze` - Sales analysis API over HTTP (JSON and SSE)
//! - `sales_repository` - ERP row fetching against a live database

use chrono::NaiveDate;
use jewel_ops_core::{AnalysisRequest, StoreId};

/// Base URL for the back-office API (configurable via environment).
#[must_use]
pub fn backoffice_base_url() -> String {
    std::env::var("BACKOFFICE_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3002".to_string())
}

/// A request over one full calendar year, all stores and suppliers.
///
/// # Panics
///
/// Never: the dates are constants.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn year_request(year: i32) -> AnalysisRequest {
    AnalysisRequest {
        start_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(year, 12, 31).unwrap(),
        ..AnalysisRequest::default()
    }
}

/// The same request restricted to `stores`.
#[must_use]
pub fn with_stores(mut request: AnalysisRequest, stores: &[i32]) -> AnalysisRequest {
    request.store_ids = stores.iter().copied().map(StoreId::new).collect();
    request
}

/// Split a Server-Sent Events body into `(event, data)` pairs.
#[must_use]
pub fn parse_sse(body: &str) -> Vec<(String, String)> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = Vec::new();
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    data.push(payload.trim_start().to_string());
                }
            }
            event.map(|name| (name, data.join("\n")))
        })
        .collect()
}
