use axum::{
    routing::{get, post},
    Router,
};
use balancer_dispatcher::Balancer;
use std::sync::Arc;

use crate::handlers::{
    health::health_check,
    requests::{add_request, get_request},
    stats::get_stats,
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub balancer: Arc<Balancer>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/request", post(add_request))
        .route("/request/{id}", get(get_request))
        .with_state(state)
}
