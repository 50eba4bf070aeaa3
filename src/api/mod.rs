//! API layer - HTTP endpoints, WebSocket stream and middleware

pub mod admin;
pub mod health;
pub mod middleware;
pub mod practice;
pub mod router;
pub mod state;
pub mod stream;
pub mod training;
pub mod types;

pub use middleware::metrics_middleware;
pub use router::create_router_with_state;
pub use state::AppState;
