use crate::infra::{deserialize_flag, AppState};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use market_insights::error::AppError;
use market_insights::workflows::market::{
    InsightOrchestrator, InsightRequest, MarketInsights, SearchQuery,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct InsightsParams {
    #[serde(default)]
    pub(crate) what: String,
    #[serde(default, rename = "where")]
    pub(crate) location: String,
    #[serde(default)]
    pub(crate) country: String,
    #[serde(default = "summary_by_default", deserialize_with = "deserialize_flag")]
    pub(crate) generate_summary: bool,
}

fn summary_by_default() -> bool {
    true
}

impl InsightsParams {
    fn into_request(self) -> Result<InsightRequest, AppError> {
        let query = SearchQuery::new(self.what, self.location, self.country)?;
        let request = InsightRequest::new(query);
        Ok(if self.generate_summary {
            request
        } else {
            request.without_summary()
        })
    }
}

/// Router for the insights API. Operational endpoints are added by
/// [`with_service_routes`].
pub(crate) fn insights_router(orchestrator: Arc<InsightOrchestrator>) -> Router {
    Router::new()
        .route("/api/v1/insights", get(insights_endpoint))
        .with_state(orchestrator)
}

pub(crate) fn with_service_routes(orchestrator: Arc<InsightOrchestrator>) -> Router {
    insights_router(orchestrator)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Acquire);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn insights_endpoint(
    State(orchestrator): State<Arc<InsightOrchestrator>>,
    Query(params): Query<InsightsParams>,
) -> Result<Json<MarketInsights>, AppError> {
    let request = params.into_request()?;
    info!(
        country = request.query.country(),
        summary = request.generate_summary,
        "market insights requested"
    );

    let insights = orchestrator.fetch_market_insights(&request).await?;
    Ok(Json(insights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use market_insights::providers::ProviderError;
    use market_insights::workflows::market::{
        HistogramPayload, JobBoard, JobSearchClient, SalaryAggregator, SearchPage,
    };
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    struct StubBoard {
        outcome: Result<SearchPage, ProviderError>,
        searches: AtomicUsize,
    }

    impl StubBoard {
        fn with_page(page: Value) -> Self {
            Self {
                outcome: Ok(serde_json::from_value(page).expect("page fixture")),
                searches: AtomicUsize::new(0),
            }
        }

        fn failing(error: ProviderError) -> Self {
            Self {
                outcome: Err(error),
                searches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl JobBoard for StubBoard {
        async fn search(
            &self,
            query: &SearchQuery,
            _page_size: u32,
        ) -> Result<SearchPage, ProviderError> {
            assert_eq!(query.country(), "us");
            self.searches.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }

        async fn histogram(&self, _query: &SearchQuery) -> Result<HistogramPayload, ProviderError> {
            Ok(HistogramPayload::default())
        }
    }

    fn orchestrator_for(board: Arc<StubBoard>) -> Arc<InsightOrchestrator> {
        Arc::new(
            InsightOrchestrator::new()
                .with_search(JobSearchClient::new(board.clone(), 20))
                .with_salary(SalaryAggregator::new(board)),
        )
    }

    async fn send_get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes")
    }

    async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn insights_route_returns_report_json() {
        let board = Arc::new(StubBoard::with_page(json!({
            "count": 7,
            "results": [{
                "title": "Data Engineer",
                "redirect_url": "https://www.adzuna.com/details/123456789"
            }]
        })));

        let response = send_get(
            insights_router(orchestrator_for(board)),
            "/api/v1/insights?what=data%20engineer&where=Austin&country=US&generate_summary=false",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["total_matching_jobs"], 7);
        assert_eq!(payload["job_listings"][0]["external_id"], "123456789");
        assert_eq!(payload["query"]["what"], "data engineer");
        assert!(payload["salary"].is_null());
    }

    #[tokio::test]
    async fn blank_criteria_are_rejected_before_searching() {
        let board = Arc::new(StubBoard::with_page(json!({})));

        let response = send_get(
            insights_router(orchestrator_for(board.clone())),
            "/api/v1/insights?what=%20%20&where=Austin&country=us",
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload["error"], "Missing search criteria.");
        assert_eq!(board.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_search_credentials_map_to_service_unavailable() {
        let router = insights_router(Arc::new(InsightOrchestrator::new()));

        let response = send_get(router, "/api/v1/insights?what=nurse&where=Boston&country=us").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let payload = read_json_body(response).await;
        assert_eq!(payload["error"], "Job search API credentials not configured.");
    }

    #[tokio::test]
    async fn upstream_failures_map_to_gateway_statuses() {
        let cases = [
            (ProviderError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (ProviderError::Status(401), StatusCode::BAD_GATEWAY),
        ];

        for (failure, expected) in cases {
            let board = Arc::new(StubBoard::failing(failure));
            let response = send_get(
                insights_router(orchestrator_for(board)),
                "/api/v1/insights?what=nurse&where=Boston&country=us",
            )
            .await;
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn summary_flag_defaults_to_enabled() {
        let params = InsightsParams {
            what: "nurse".into(),
            location: "Boston".into(),
            country: "us".into(),
            generate_summary: summary_by_default(),
        };
        let request = params.into_request().expect("valid request");
        assert!(request.generate_summary);
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }
}
