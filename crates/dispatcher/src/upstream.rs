use std::time::Duration;

use async_trait::async_trait;
use balancer_core::{DispatchError, JsonMap, OutboundRequest, UpstreamClient};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tracing::{debug, warn};

/// 基于 reqwest 的上游客户端
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    timeout_seconds: u64,
}

impl HttpUpstream {
    pub fn new(timeout_seconds: u64) -> Self {
        Self::with_client(reqwest::Client::new(), timeout_seconds)
    }

    pub fn with_client(client: reqwest::Client, timeout_seconds: u64) -> Self {
        Self {
            client,
            timeout_seconds,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// 把存储的请求头转换为 HTTP 头，字符串原样使用，其它标量取其JSON文本，null 忽略
    fn build_headers(headers: &JsonMap) -> Result<HeaderMap, DispatchError> {
        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (key, value) in headers {
            let text = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| DispatchError::RequestBuild(format!("无效的请求头名 {key}: {e}")))?;
            let value = HeaderValue::from_str(&text)
                .map_err(|e| DispatchError::RequestBuild(format!("无效的请求头值 {key}: {e}")))?;
            header_map.insert(name, value);
        }
        Ok(header_map)
    }

    fn classify(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            DispatchError::Timeout {
                timeout_seconds: self.timeout_seconds,
            }
        } else if err.is_builder() {
            DispatchError::RequestBuild(err.to_string())
        } else {
            DispatchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn forward(&self, request: &OutboundRequest) -> Result<JsonMap, DispatchError> {
        let payload = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| DispatchError::Encoding(e.to_string()))?;

        // 未指定方法时按 GET 处理
        let method_name = match request.method.trim() {
            "" => "GET".to_string(),
            name => name.to_uppercase(),
        };
        let method = reqwest::Method::from_bytes(method_name.as_bytes())
            .map_err(|e| {
                DispatchError::RequestBuild(format!("不支持的HTTP方法 {}: {e}", request.method))
            })?;

        let mut headers = Self::build_headers(&request.headers)?;
        if payload.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(headers)
            .timeout(self.timeout());
        if let Some(payload) = payload {
            builder = builder.body(payload);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                request_id = %request.id,
                url = %request.url,
                status = status.as_u16(),
                "上游返回非成功状态码"
            );
        }

        let bytes = response.bytes().await.map_err(|e| match self.classify(e) {
            DispatchError::Transport(msg) => DispatchError::ResponseRead(msg),
            other => other,
        })?;

        debug!(
            request_id = %request.id,
            status = status.as_u16(),
            size = bytes.len(),
            "已读取上游响应"
        );

        serde_json::from_slice::<JsonMap>(&bytes)
            .map_err(|e| DispatchError::ResponseDecode(e.to_string()))
    }
}
