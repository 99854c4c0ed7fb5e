use crate::cli::{engine_from, ServeArgs};
use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use dealflow::config::AppConfig;
use dealflow::error::AppError;
use dealflow::motivation::router::motivation_router;
use dealflow::motivation::MotivationEngine;
use dealflow::telemetry;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let engine = Arc::new(engine_from(&config, &args.data)?);
    let app = with_service_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "seller motivation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

pub(crate) fn with_service_routes(engine: Arc<MotivationEngine>) -> Router {
    motivation_router(engine)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
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

async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{build_engine, FixtureDataset};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn demo_engine() -> Arc<MotivationEngine> {
        let config = AppConfig {
            environment: dealflow::config::AppEnvironment::Test,
            server: dealflow::config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: dealflow::config::TelemetryConfig {
                log_level: "info".to_string(),
            },
            scoring: dealflow::config::ScoringSettings::default(),
        };
        let dataset = FixtureDataset::demo().expect("demo fixtures");
        Arc::new(build_engine(&config, dataset, None))
    }

    #[tokio::test]
    async fn health_route_is_served_next_to_motivation_routes() {
        let app = with_service_routes(demo_engine());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn demo_dataset_scores_through_the_http_surface() {
        let app = with_service_routes(demo_engine());
        let response = app
            .oneshot(
                Request::get("/api/v1/motivation/quick/prop-reo?as_of=2025-10-01")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
