//! 测试数据构造器

use balancer_config::{LimitsConfig, RouteLimit};
use balancer_core::{JsonMap, OutboundRequest};

/// 把 `json!` 对象转换为 [`JsonMap`]，非对象值得到空映射
pub fn json_map(value: serde_json::Value) -> JsonMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

/// 按 `(路径, 间隔秒数)` 列表构造限流配置
pub fn limits(routes: &[(&str, u64)], max_queue: usize) -> LimitsConfig {
    LimitsConfig {
        routes: routes
            .iter()
            .map(|(path, interval)| RouteLimit::new(*path, *interval))
            .collect(),
        max_queue,
    }
}

/// Builder for outbound requests used in dispatcher tests
pub struct OutboundRequestBuilder {
    url: String,
    method: String,
    headers: JsonMap,
    body: Option<JsonMap>,
}

impl OutboundRequestBuilder {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: JsonMap::new(),
            body: None,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: serde_json::Value) -> Self {
        self.headers.insert(name.to_string(), value);
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(json_map(body));
        self
    }

    /// 路由和提交时一样取解码后的路径，URL无效时 panic
    pub fn build(self) -> OutboundRequest {
        let route = OutboundRequest::route_of(&self.url)
            .unwrap_or_else(|e| panic!("invalid test URL {}: {e}", self.url));
        OutboundRequest::new(self.url, route, self.method, self.headers, self.body)
    }
}
