use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::errors::AdmissionError;

/// 请求头、请求体和响应体共用的键值结构
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// 待转发的出站请求
///
/// 创建后不可变，存储层和路由队列共享同一个 `Arc`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub id: Uuid,
    pub url: String,
    /// 目标URL的路径部分，决定进入哪个队列
    pub route: String,
    pub method: String,
    pub headers: JsonMap,
    pub body: Option<JsonMap>,
}

impl OutboundRequest {
    pub fn new(
        url: impl Into<String>,
        route: impl Into<String>,
        method: impl Into<String>,
        headers: JsonMap,
        body: Option<JsonMap>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            route: route.into(),
            method: method.into(),
            headers,
            body,
        }
    }

    /// 取目标URL解码后的路径作为路由键，查询串和片段不参与匹配
    pub fn route_of(url: &str) -> Result<String, AdmissionError> {
        let invalid = |reason: String| AdmissionError::InvalidUrl {
            url: url.to_string(),
            reason,
        };

        let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
        percent_decode_str(parsed.path())
            .decode_utf8()
            .map(|path| path.into_owned())
            .map_err(|e| invalid(e.to_string()))
    }
}

/// 请求生命周期状态
///
/// 只允许 Waiting → Done 或 Waiting → Failed，且只发生一次。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Waiting,
    Done,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Waiting => "waiting",
            RequestStatus::Done => "done",
            RequestStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Waiting)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 请求存储中的记录
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub request: Arc<OutboundRequest>,
    pub status: RequestStatus,
    pub response_body: Option<JsonMap>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RequestRecord {
    pub fn waiting(request: Arc<OutboundRequest>) -> Self {
        Self {
            request,
            status: RequestStatus::Waiting,
            response_body: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.request.id
    }

    /// 写入响应体并标记为完成，仅当记录仍处于 Waiting 时生效
    pub fn complete(&mut self, response_body: JsonMap) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.response_body = Some(response_body);
        self.status = RequestStatus::Done;
        self.completed_at = Some(Utc::now());
        true
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.error_message = Some(reason.into());
        self.status = RequestStatus::Failed;
        self.completed_at = Some(Utc::now());
        true
    }
}

/// 按状态统计的请求数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub waiting: usize,
    pub done: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: RequestStatus) {
        match status {
            RequestStatus::Waiting => self.waiting += 1,
            RequestStatus::Done => self.done += 1,
            RequestStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.waiting + self.done + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> RequestRecord {
        let request = OutboundRequest::new(
            "http://upstream.local/api/x",
            "/api/x",
            "POST",
            JsonMap::new(),
            None,
        );
        RequestRecord::waiting(Arc::new(request))
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(RequestStatus::Waiting).unwrap(), json!("waiting"));
        assert_eq!(serde_json::to_value(RequestStatus::Done).unwrap(), json!("done"));
        assert_eq!(RequestStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_complete_only_once() {
        let mut record = sample_record();
        let mut body = JsonMap::new();
        body.insert("ok".to_string(), json!(true));

        assert!(record.complete(body.clone()));
        assert_eq!(record.status, RequestStatus::Done);
        assert!(record.completed_at.is_some());

        let mut other = JsonMap::new();
        other.insert("ok".to_string(), json!(false));
        assert!(!record.complete(other));
        assert!(!record.fail("late failure"));
        assert_eq!(record.status, RequestStatus::Done);
        assert_eq!(record.response_body, Some(body));
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut record = sample_record();
        assert!(record.fail("connection refused"));
        assert_eq!(record.status, RequestStatus::Failed);
        assert!(!record.complete(JsonMap::new()));
        assert!(record.response_body.is_none());
    }

    #[test]
    fn test_route_of_decodes_path() {
        assert_eq!(
            OutboundRequest::route_of("http://upstream.local/api/x?page=2#top").unwrap(),
            "/api/x"
        );
        assert_eq!(
            OutboundRequest::route_of("http://upstream.local/api/user%20info").unwrap(),
            "/api/user info"
        );
        assert_eq!(
            OutboundRequest::route_of("http://upstream.local/api/用户").unwrap(),
            "/api/用户"
        );
    }

    #[test]
    fn test_route_of_rejects_bad_urls() {
        assert!(matches!(
            OutboundRequest::route_of("not a url"),
            Err(AdmissionError::InvalidUrl { .. })
        ));
        // %FF 解码后不是合法的UTF-8
        assert!(matches!(
            OutboundRequest::route_of("http://upstream.local/api/%FF"),
            Err(AdmissionError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_status_counts() {
        let mut counts = StatusCounts::default();
        counts.record(RequestStatus::Waiting);
        counts.record(RequestStatus::Done);
        counts.record(RequestStatus::Done);
        assert_eq!(counts.done, 2);
        assert_eq!(counts.total(), 3);
    }
}
