use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use balancer_config::LimitsConfig;
use balancer_core::{AdmissionError, OutboundRequest};
use tokio::sync::{mpsc, Mutex};

/// 队列中的元素，与存储共享同一个请求
pub type QueueItem = Arc<OutboundRequest>;

/// 单个路由的有界FIFO队列
pub struct RouteQueue {
    route: String,
    interval_seconds: u64,
    capacity: usize,
    sender: mpsc::Sender<QueueItem>,
    receiver: Mutex<mpsc::Receiver<QueueItem>>,
}

impl RouteQueue {
    /// `capacity` 必须大于 0
    pub fn new(route: impl Into<String>, interval_seconds: u64, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            route: route.into(),
            interval_seconds,
            capacity,
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn interval_seconds(&self) -> u64 {
        self.interval_seconds
    }

    /// 出队间隔，0 表示该路由不启动定时器
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_seconds > 0).then(|| Duration::from_secs(self.interval_seconds))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前排队数量（包含已预留但尚未写入的位置）
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 非阻塞地预留一个队列位置
    ///
    /// 容量检查和占位是同一个原子操作，并发提交不会让队列超过上限。
    pub fn try_reserve(&self) -> Result<mpsc::OwnedPermit<QueueItem>, AdmissionError> {
        self.sender
            .clone()
            .try_reserve_owned()
            .map_err(|_| AdmissionError::QueueFull {
                route: self.route.clone(),
                max_queue: self.capacity,
            })
    }

    /// 非阻塞地取出队首元素，队列为空时返回 `None`
    pub async fn try_dequeue(&self) -> Option<QueueItem> {
        self.receiver.lock().await.try_recv().ok()
    }
}

impl std::fmt::Debug for RouteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteQueue")
            .field("route", &self.route)
            .field("interval_seconds", &self.interval_seconds)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

/// 路由队列注册表
///
/// 启动时按配置一次性创建，之后路由集合不再变化。
#[derive(Debug)]
pub struct RouteQueueRegistry {
    queues: HashMap<String, Arc<RouteQueue>>,
    max_queue: usize,
}

impl RouteQueueRegistry {
    pub fn new(limits: &LimitsConfig) -> Self {
        Self::from_timings(&limits.timings_by_route(), limits.max_queue)
    }

    pub fn from_timings(timings_by_route: &HashMap<String, u64>, max_queue: usize) -> Self {
        let queues = timings_by_route
            .iter()
            .map(|(route, interval_seconds)| {
                (
                    route.clone(),
                    Arc::new(RouteQueue::new(route.clone(), *interval_seconds, max_queue)),
                )
            })
            .collect();

        Self { queues, max_queue }
    }

    pub fn get(&self, route: &str) -> Option<&Arc<RouteQueue>> {
        self.queues.get(route)
    }

    pub fn queues(&self) -> impl Iterator<Item = &Arc<RouteQueue>> {
        self.queues.values()
    }

    pub fn max_queue(&self) -> usize {
        self.max_queue
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
