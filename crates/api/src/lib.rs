//! # Balancer API
//!
//! 转发服务的HTTP入口，基于Axum构建。
//!
//! ## API 端点
//!
//! - `POST /request` - 提交请求，返回 `{"requestID": "..."}`
//! - `GET /request/{id}` - 查询请求状态 `{status, body?, error?}`
//! - `GET /stats` - 路由队列和请求统计
//! - `GET /health` - 健康检查
//!
//! ## 错误响应
//!
//! ```json
//! {
//!   "success": false,
//!   "error": { "code": "QUEUE_FULL", "message": "..." }
//! }
//! ```
//!
//! 提交失败（路由未配置、队列已满、URL无效、请求体无法解析）返回 500，
//! 查询不存在的请求返回 404。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

use axum::Router;
use balancer_config::HttpServerConfig;
use balancer_dispatcher::Balancer;
use std::sync::Arc;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, timeout_layer, trace_layer};
use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(balancer: Arc<Balancer>, http_config: &HttpServerConfig) -> Router {
    let state = AppState { balancer };

    create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(cors_layer())
            .layer(timeout_layer(http_config.timeout_seconds))
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
