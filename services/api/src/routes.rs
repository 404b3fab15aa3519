use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use wellscan::scan::{scan_router, NutritionRepository, ScanLog, WellnessPipeline};

pub(crate) fn with_scan_routes<R, L>(
    pipeline: Arc<WellnessPipeline<R>>,
    scans: Arc<L>,
) -> axum::Router
where
    R: NutritionRepository + 'static,
    L: ScanLog + 'static,
{
    scan_router(pipeline, scans)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryScanLog;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;
    use wellscan::scan::{
        CategoryCode, FoodCategory, InMemoryNutritionRepository, NutritionalField, RuleDraft,
        RuleType,
    };

    fn app(ready: bool) -> (axum::Router, Arc<InMemoryScanLog>) {
        let repository = Arc::new(InMemoryNutritionRepository::default());
        repository
            .insert_category(FoodCategory {
                code: CategoryCode("27".to_string()),
                abbr: None,
                name: Some("Snacks".to_string()),
                description: None,
                notes: None,
            })
            .expect("category inserted");
        repository
            .insert_rule(RuleDraft {
                category: CategoryCode("27".to_string()),
                nutrient: None,
                field: NutritionalField::Sodium,
                rule_type: RuleType::LessThanOrEqual,
                value: "200".to_string(),
                wellness: true,
                created_at: chrono::Utc::now(),
            })
            .expect("rule inserted");

        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let scans = Arc::new(InMemoryScanLog::default());
        let pipeline = Arc::new(WellnessPipeline::new(repository, Vec::new()));
        let router = with_scan_routes(pipeline, scans.clone()).layer(Extension(state));
        (router, scans)
    }

    async fn get(router: axum::Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request"))
            .await
            .expect("router responds")
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (router, _) = app(false);
        assert_eq!(get(router, "/health").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_tracks_flag() {
        let (router, _) = app(false);
        assert_eq!(
            get(router, "/ready").await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        let (router, _) = app(true);
        assert_eq!(get(router, "/ready").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let (router, _) = app(true);
        let response = get(router, "/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn unresolved_scans_are_logged() {
        let (router, scans) = app(true);
        let response = get(router, "/scan/000000000001?food_cat=27").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let events = scans.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].code.as_str(), "000000000001");
        assert!(events[0].status.contains("000000000001"));
    }
}
