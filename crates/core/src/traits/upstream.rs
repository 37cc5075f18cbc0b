use async_trait::async_trait;

use crate::errors::DispatchError;
use crate::models::{JsonMap, OutboundRequest};

/// 上游调用接口
///
/// 发送一个出站请求并返回解析后的响应体。
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn forward(&self, request: &OutboundRequest) -> Result<JsonMap, DispatchError>;
}
