use thiserror::Error;

/// 准入阶段错误，同步返回给提交方
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("无效的URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("路由未配置队列: {route}")]
    RouteNotConfigured { route: String },

    #[error("队列已满: {route} (上限 {max_queue})")]
    QueueFull { route: String, max_queue: usize },
}

impl AdmissionError {
    /// 用于日志和API响应的稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::InvalidUrl { .. } => "INVALID_URL",
            AdmissionError::RouteNotConfigured { .. } => "ROUTE_NOT_CONFIGURED",
            AdmissionError::QueueFull { .. } => "QUEUE_FULL",
        }
    }
}

/// 查询错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("请求未找到: {id}")]
    NotFound { id: String },
}

/// 分发错误
///
/// 默认只记录到日志；开启 `report_failures` 时错误信息写入请求记录。
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("请求体序列化失败: {0}")]
    Encoding(String),

    #[error("构造上游请求失败: {0}")]
    RequestBuild(String),

    #[error("上游请求失败: {0}")]
    Transport(String),

    #[error("上游请求超时: {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    #[error("读取响应体失败: {0}")]
    ResponseRead(String),

    #[error("解析响应体失败: {0}")]
    ResponseDecode(String),
}

impl DispatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Encoding(_) => "encoding",
            DispatchError::RequestBuild(_) => "request_build",
            DispatchError::Transport(_) => "transport",
            DispatchError::Timeout { .. } => "timeout",
            DispatchError::ResponseRead(_) => "response_read",
            DispatchError::ResponseDecode(_) => "response_decode",
        }
    }
}

/// 负载均衡器统一错误类型
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 统一的Result类型
pub type BalancerResult<T> = std::result::Result<T, BalancerError>;
