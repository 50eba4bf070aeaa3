//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use metrics::{
    create_metrics_router, init_metrics, record_frame, record_http_request,
    record_lesson_transition, record_training_run, set_active_connections, PrometheusMetrics,
};
