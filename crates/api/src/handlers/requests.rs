use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use balancer_core::{JsonMap, RequestRecord, RequestStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{ApiError, ApiResult},
    routes::AppState,
};

/// 提交请求的请求体
#[derive(Debug, Deserialize)]
pub struct AddRequestPayload {
    pub url: String,
    #[serde(rename = "type", default)]
    pub method: String,
    #[serde(default)]
    pub headers: Option<JsonMap>,
    #[serde(default)]
    pub body: Option<JsonMap>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddRequestResponse {
    #[serde(rename = "requestID")]
    pub request_id: String,
}

/// 查询结果，`body` 只在完成时出现，`error` 只在失败时出现
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestStatusResponse {
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RequestRecord> for RequestStatusResponse {
    fn from(record: RequestRecord) -> Self {
        Self {
            status: record.status,
            body: record.response_body,
            error: record.error_message,
        }
    }
}

/// 提交请求
///
/// 请求体手动解析，解析失败与提交失败一样返回 500。
pub async fn add_request(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<AddRequestResponse>> {
    let payload: AddRequestPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "无法解析提交的请求体");
        ApiError::MalformedBody(e.to_string())
    })?;

    let id = state
        .balancer
        .add_request(&payload.url, &payload.method, payload.body, payload.headers)
        .await?;

    Ok(Json(AddRequestResponse {
        request_id: id.to_string(),
    }))
}

/// 按ID查询请求状态
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RequestStatusResponse>> {
    let record = state.balancer.get_request(&id).await?;
    debug!(request_id = %id, status = %record.status, "查询请求状态");
    Ok(Json(record.into()))
}
