//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("gesture_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Create the metrics router serving at `path`
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record one processed frame
pub fn record_frame(mode: &'static str, outcome: &'static str, duration: Duration) {
    counter!("gesture_frames_total", "mode" => mode, "outcome" => outcome).increment(1);
    histogram!("gesture_frame_duration_seconds", "mode" => mode).record(duration.as_secs_f64());
}

/// Record a finished training run
pub fn record_training_run(owner: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "gesture_training_runs_total",
        "owner" => owner.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record a lesson mode transition (`enter`, `exit`, `refresh`)
pub fn record_lesson_transition(transition: &'static str) {
    counter!("gesture_lesson_transitions_total", "transition" => transition).increment(1);
}

pub fn set_active_connections(count: usize) {
    gauge!("gesture_active_connections").set(count as f64);
}

/// Limit label cardinality
fn sanitize_path(path: &str) -> String {
    if path.len() > 50 && path.is_char_boundary(50) {
        path[..50].to_string()
    } else {
        path.to_string()
    }
}
