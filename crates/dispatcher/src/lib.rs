//! 按路由限流的请求转发引擎
//!
//! 组件关系：
//!
//! ```text
//! add_request ──► RouteQueue ──(tick)──► RequestDispatcher ──► UpstreamClient
//!      │                                        │
//!      └──────────► RequestRepository ◄─────────┘
//!                          ▲
//!                     get_request
//! ```
//!
//! 每个路由一个有界队列和一个独立的定时器，每次触发最多出队一个请求。

pub mod balancer;
pub mod dispatcher;
pub mod metrics;
pub mod queue_timer;
pub mod registry;
pub mod store;
pub mod upstream;

pub use balancer::{Balancer, BalancerStats, RouteStats};
pub use dispatcher::RequestDispatcher;
pub use metrics::MetricsCollector;
pub use queue_timer::{QueueTimer, QueueTimerHandle, TickOutcome};
pub use registry::{RouteQueue, RouteQueueRegistry};
pub use store::InMemoryRequestStore;
pub use upstream::HttpUpstream;
