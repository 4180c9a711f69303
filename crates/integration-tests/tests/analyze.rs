//! Integration tests for the sales analysis API.
//!
//! These tests require:
//! - An ERP `PostgreSQL` database with sales for 2024
//! - The back-office server running (cargo run -p jewel-ops-backoffice)

#![allow(clippy::indexing_slicing)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use jewel_ops_integration_tests::{backoffice_base_url, parse_sse, with_stores, year_request};

fn client() -> Client {
    Client::builder()
        .build()
        .expect("Failed to create HTTP client")
}

async fn analyze(body: &Value) -> (StatusCode, Value) {
    let resp = client()
        .post(format!("{}/analyze/analyze1", backoffice_base_url()))
        .json(body)
        .send()
        .await
        .expect("Failed to call analyze");
    let status = resp.status();
    let json = resp.json().await.expect("Response is not JSON");
    (status, json)
}

fn revenue(node: &Value) -> f64 {
    node["totalSalesRevenue"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "Requires running back-office server"]
async fn test_health_and_request_id() {
    let resp = client()
        .get(format!("{}/health", backoffice_base_url()))
        .send()
        .await
        .expect("Failed to call health");

    assert_eq!(resp.status(), StatusCode::OK);
    let request_id = resp
        .headers()
        .get("x-request-id")
        .expect("Missing x-request-id")
        .to_str()
        .expect("Invalid header");
    assert!(uuid::Uuid::parse_str(request_id).is_ok());
}

#[tokio::test]
#[ignore = "Requires running back-office server and ERP database"]
async fn test_readiness() {
    let resp = client()
        .get(format!("{}/health/ready", backoffice_base_url()))
        .send()
        .await
        .expect("Failed to call readiness");
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// JSON Route
// ============================================================================

#[tokio::test]
#[ignore = "Requires running back-office server and ERP database"]
async fn test_analyze_tree_is_ordered_and_indexed() {
    let request = serde_json::to_value(year_request(2024))
        .expect("Failed to encode");
    let (status, tree) = analyze(&request).await;

    assert_eq!(status, StatusCode::OK);
    let nodes = tree.as_array().expect("Expected an array");
    for (index, node) in nodes.iter().enumerate() {
        assert_eq!(node["index"], index);
        assert!(node.get("subGroupings").is_some());
    }
    for pair in nodes.windows(2) {
        assert!(revenue(&pair[0]) >= revenue(&pair[1]));
    }
}

#[tokio::test]
#[ignore = "Requires running back-office server and ERP database"]
async fn test_analyze_is_deterministic() {
    let request = serde_json::to_value(with_stores(year_request(2024), &[1, 2]))
        .expect("Failed to encode");

    let (_, first) = analyze(&request).await;
    let (_, second) = analyze(&request).await;
    assert_eq!(first.to_string(), second.to_string());
}

#[tokio::test]
#[ignore = "Requires running back-office server and ERP database"]
async fn test_analyze_no_rows_returns_empty_array() {
    let request = serde_json::to_value(year_request(1990))
        .expect("Failed to encode");
    let (status, tree) = analyze(&request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(tree, json!([]));
}

#[tokio::test]
#[ignore = "Requires running back-office server"]
async fn test_analyze_rejects_inverted_dates() {
    let (status, body) = analyze(&json!({
        "startDate": "2024-12-31",
        "endDate": "2024-01-01"
    }))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
}

// ============================================================================
// Stream Route
// ============================================================================

#[tokio::test]
#[ignore = "Requires running back-office server and ERP database"]
async fn test_stream_progress_then_result() {
    let request = with_stores(year_request(2024), &[1]);
    let resp = client()
        .post(format!("{}/analyze/analyze1/stream", backoffice_base_url()))
        .json(&request)
        .send()
        .await
        .expect("Failed to call stream");
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.text().await.expect("Failed to read stream");
    let events = parse_sse(&body);
    let (last, data) = events.last().expect("No events");
    assert_eq!(last, "analyzeResult");
    let result: Value = serde_json::from_str(data).expect("Invalid JSON");
    assert!(result.is_array());

    let progress: Vec<Value> = events
        .iter()
        .filter(|(name, _)| name == "analyzeProgress")
        .map(|(_, data)| serde_json::from_str(data).expect("Invalid progress"))
        .collect();
    assert!(!progress.is_empty());
    for pair in progress.windows(2) {
        assert!(pair[0]["current"].as_u64() <= pair[1]["current"].as_u64());
    }
    let final_progress = progress.last().expect("No progress");
    assert_eq!(final_progress["current"], final_progress["total"]);
}
