use axum::{extract::State, Json};
use balancer_dispatcher::BalancerStats;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::ApiResult, routes::AppState};

/// 与错误响应的 `success: false` 相对应
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub data: BalancerStats,
    pub generated_at: DateTime<Utc>,
}

/// 各路由队列深度、定时器状态和请求统计
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let stats = state.balancer.stats().await?;
    Ok(Json(StatsResponse {
        success: true,
        data: stats,
        generated_at: Utc::now(),
    }))
}
