//! Sales analysis route handlers.
//!
//! Both routes take the same JSON body. The plain route answers with the
//! finished tree; the stream route pushes progress as Server-Sent Events and
//! ends with exactly one `analyzeResult` or `analyzeError` event.

use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
    routing::post,
};
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::instrument;

use jewel_ops_core::{AnalysisRequest, GroupingResult, ProgressEvent};

use crate::error::AppError;
use crate::services::analysis::{NoProgress, ProgressSink};
use crate::services::{AnalysisError, AnalysisService, SalesDataSource};
use crate::state::AppState;

/// SSE event carrying a [`ProgressEvent`].
pub const PROGRESS_EVENT: &str = "analyzeProgress";
/// Terminal SSE event carrying the result tree.
pub const RESULT_EVENT: &str = "analyzeResult";
/// Terminal SSE event carrying an error body.
pub const ERROR_EVENT: &str = "analyzeError";

const SERIALIZE_FAILED: &str = r#"{"status":500,"message":"Failed to serialize event"}"#;

/// Build the analysis router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze/analyze1", post(analyze))
        .route("/analyze/analyze1/stream", post(analyze_stream))
}

// =============================================================================
// Handlers
// =============================================================================

/// Run an analysis and return the grouping tree.
///
/// POST /analyze/analyze1
#[instrument(skip_all)]
async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<Vec<GroupingResult>>, AppError> {
    let request = parse_request(payload)?;
    let tree = run_analysis(state.analysis(), request, Arc::new(NoProgress)).await?;
    Ok(Json(tree))
}

/// Run an analysis, streaming progress events before the result.
///
/// POST /analyze/analyze1/stream
async fn analyze_stream(
    State(state): State<AppState>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    stream_analysis(state.analysis().clone(), payload)
}

// =============================================================================
// Helpers
// =============================================================================

/// Run the analysis on its own task, yielding progress then one terminal event.
fn stream_analysis<S>(
    service: AnalysisService<S>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: SalesDataSource + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();

    // The sender lives inside the task, so the progress channel closes as
    // soon as the analysis is over.
    let task = tokio::spawn(async move {
        let sink: Arc<dyn ProgressSink> = Arc::new(tx);
        let request = parse_request(payload)?;
        run_analysis(&service, request, sink).await
    });

    let events = stream! {
        while let Some(progress) = rx.recv().await {
            yield Ok(json_event(PROGRESS_EVENT, &progress));
        }

        let outcome = task
            .await
            .unwrap_or_else(|e| Err(AppError::Internal(e.to_string())));
        let event = match outcome {
            Ok(tree) => json_event(RESULT_EVENT, &tree),
            Err(err) => {
                err.report();
                json_event(ERROR_EVENT, &err.body())
            }
        };
        yield Ok(event);
    };

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn parse_request(
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<AnalysisRequest, AppError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Run the analysis; an empty row set is a successful empty tree.
async fn run_analysis<S: SalesDataSource>(
    service: &AnalysisService<S>,
    request: AnalysisRequest,
    progress: Arc<dyn ProgressSink>,
) -> Result<Vec<GroupingResult>, AppError> {
    match service.run(request, progress).await {
        Ok(tree) => Ok(tree),
        Err(AnalysisError::EmptyResult) => Ok(Vec::new()),
        Err(err) => Err(err.into()),
    }
}

fn json_event<T: Serialize>(name: &str, payload: &T) -> Event {
    let json = serde_json::to_string(payload)
        .unwrap_or_else(|_| SERIALIZE_FAILED.to_string());
    Event::default().event(name).data(json)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::IntoResponse,
    };
    use chrono::NaiveDate;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use jewel_ops_core::{PeriodRows, StoreId};

    use super::*;
    use crate::config::{AnalysisConfig, BackofficeConfig};
    use crate::services::analysis::test_support::{StaticSource, record};

    const DATABASE_URL: &str = "postgres://localhost:1/unreachable";

    fn app() -> Router {
        let config = BackofficeConfig {
            database_url: SecretString::from(DATABASE_URL.to_string()),
            host: [127, 0, 0, 1].into(),
            port: 0,
            analysis: AnalysisConfig::default(),
            json_logs: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };
        let pool = PgPoolOptions::new().connect_lazy(DATABASE_URL).unwrap();
        router().with_state(AppState::new(config, pool))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const INVERTED: &str = r#"{"storeIds":[1],"startDate":"2024-12-31","endDate":"2024-01-01"}"#;
    const MALFORMED: &str = r#"{"startDate":"yesterday"}"#;

    #[tokio::test]
    async fn test_inverted_dates_rejected() {
        let response = app()
            .oneshot(post_json("/analyze/analyze1", INVERTED))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 400);
        assert!(json["message"].as_str().unwrap().contains("startDate"));
    }

    #[tokio::test]
    async fn test_unknown_dimension_rejected() {
        let body = r#"{"startDate":"2024-01-01","endDate":"2024-12-31","hierarchy":["colour"]}"#;
        let response = app()
            .oneshot(post_json("/analyze/analyze1", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let response = app()
            .oneshot(post_json("/analyze/analyze1", MALFORMED))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stream_ends_with_error_event() {
        let response = app()
            .oneshot(post_json("/analyze/analyze1/stream", INVERTED))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("event: analyzeError"));
        assert!(text.contains(r#""status":400"#));
        assert!(!text.contains("event: analyzeResult"));
    }

    async fn stream_text(service: AnalysisService<StaticSource>) -> String {
        let request = AnalysisRequest {
            store_ids: vec![StoreId::new(1)],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            ..AnalysisRequest::default()
        };
        let response = stream_analysis(service, Ok(Json(request))).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_stream_progress_then_single_result() {
        let rows = PeriodRows {
            current: vec![
                record("BAG", 1, "A", 1, 2, 800, 300),
                record("RING", 2, "B", 1, 1, 150, 50),
            ],
            previous: Vec::new(),
        };
        let config = AnalysisConfig {
            progress_interval: 1,
            ..AnalysisConfig::default()
        };
        let service = AnalysisService::new(StaticSource::new(Ok(rows)), config);

        let text = stream_text(service).await;
        assert_eq!(text.matches("event: analyzeResult").count(), 1);
        assert!(!text.contains("event: analyzeError"));
        assert!(text.matches("event: analyzeProgress").count() >= 2);
        assert!(text.contains(r#"data: {"current":2,"total":2}"#));

        let result_at = text.find("event: analyzeResult").unwrap();
        let last_progress = text.rfind("event: analyzeProgress").unwrap();
        assert!(last_progress < result_at);
        assert!(text[result_at..].contains(r#""label":"BAG""#));
    }

    #[tokio::test]
    async fn test_stream_empty_rows_end_with_empty_tree() {
        let rows = PeriodRows {
            current: Vec::new(),
            previous: Vec::new(),
        };
        let service = AnalysisService::new(StaticSource::new(Ok(rows)), AnalysisConfig::default());

        let text = stream_text(service).await;
        assert_eq!(text.matches("event: analyzeResult").count(), 1);
        assert!(text.contains("data: []"));
        assert!(!text.contains("event: analyzeError"));
    }
}
