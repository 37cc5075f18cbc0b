//! 上游客户端的测试替身
//!
//! 不发起网络请求，按预设返回响应或错误，并记录收到的每个请求。

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use balancer_core::{DispatchError, JsonMap, OutboundRequest, UpstreamClient};

#[derive(Debug, Clone)]
enum MockReply {
    Respond(JsonMap),
    Fail(String),
}

/// Mock implementation of UpstreamClient for testing
#[derive(Debug)]
pub struct MockUpstream {
    reply: MockReply,
    delay: Option<Duration>,
    calls: Mutex<Vec<OutboundRequest>>,
}

impl MockUpstream {
    /// 每次调用都返回给定的响应体
    pub fn responding(body: JsonMap) -> Self {
        Self::with_reply(MockReply::Respond(body))
    }

    /// 每次调用都返回传输错误
    pub fn failing(message: &str) -> Self {
        Self::with_reply(MockReply::Fail(message.to_string()))
    }

    fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 模拟慢速上游，使用 tokio 时钟，可配合暂停时间的测试
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<OutboundRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstream {
    async fn forward(&self, request: &OutboundRequest) -> Result<JsonMap, DispatchError> {
        // 调用开始时即计数
        self.calls.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.reply {
            MockReply::Respond(body) => Ok(body.clone()),
            MockReply::Fail(message) => Err(DispatchError::Transport(message.clone())),
        }
    }
}
