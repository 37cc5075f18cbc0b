use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use balancer_core::{BalancerError, LookupError};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Balancer(#[from] BalancerError),

    #[error("请求体解析失败: {0}")]
    MalformedBody(String),

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 错误码和对应的HTTP状态
    ///
    /// 提交失败一律返回 500，只有查询不存在的请求返回 404。
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Balancer(BalancerError::Lookup(LookupError::NotFound { .. })) => {
                (StatusCode::NOT_FOUND, "REQUEST_NOT_FOUND")
            }
            ApiError::Balancer(BalancerError::Admission(admission)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, admission.code())
            }
            ApiError::Balancer(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            ApiError::MalformedBody(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MALFORMED_BODY"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(code, error = %self, "请求处理失败");
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use balancer_core::AdmissionError;

    #[test]
    fn test_not_found_maps_to_404() {
        let error: ApiError = BalancerError::from(LookupError::NotFound {
            id: "abc".to_string(),
        })
        .into();
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_admission_errors_map_to_500() {
        let cases = vec![
            AdmissionError::RouteNotConfigured {
                route: "/x".to_string(),
            },
            AdmissionError::QueueFull {
                route: "/x".to_string(),
                max_queue: 1,
            },
            AdmissionError::InvalidUrl {
                url: "::".to_string(),
                reason: "relative URL without a base".to_string(),
            },
        ];

        for admission in cases {
            let code = admission.code();
            let error = ApiError::from(BalancerError::from(admission));
            assert_eq!(error.status_and_code().1, code);
            assert_eq!(
                error.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn test_malformed_body_maps_to_500() {
        let error = ApiError::MalformedBody("expected value".to_string());
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
