use std::collections::HashMap;
use std::sync::Arc;

use balancer_config::{DispatcherConfig, LimitsConfig};
use balancer_core::{
    AdmissionError, BalancerError, BalancerResult, JsonMap, LookupError, OutboundRequest,
    RequestRecord, RequestRepository, StatusCounts, UpstreamClient,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dispatcher::RequestDispatcher;
use crate::metrics::MetricsCollector;
use crate::queue_timer::{QueueTimer, QueueTimerHandle};
use crate::registry::RouteQueueRegistry;

/// 单个路由的运行状态
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RouteStats {
    pub path: String,
    pub interval_seconds: u64,
    pub queued: usize,
    pub capacity: usize,
    pub timer_running: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalancerStats {
    pub routes: Vec<RouteStats>,
    pub requests: StatusCounts,
    pub in_flight_dispatches: usize,
    pub max_concurrent_dispatches: usize,
}

/// 按路由限流的转发器
///
/// 提交的请求先进入对应路由的有界队列，由该路由的定时器按固定间隔逐个取出并转发，
/// 结果写回存储后可以通过ID查询。
pub struct Balancer {
    registry: Arc<RouteQueueRegistry>,
    store: Arc<dyn RequestRepository>,
    dispatcher: Arc<RequestDispatcher>,
    timers: Mutex<HashMap<String, QueueTimerHandle>>,
    metrics: Arc<MetricsCollector>,
}

impl Balancer {
    pub fn new(
        limits: &LimitsConfig,
        dispatcher_config: &DispatcherConfig,
        upstream: Arc<dyn UpstreamClient>,
        store: Arc<dyn RequestRepository>,
    ) -> Self {
        let metrics = Arc::new(MetricsCollector::new());
        let registry = Arc::new(RouteQueueRegistry::new(limits));
        let dispatcher = Arc::new(RequestDispatcher::new(
            upstream,
            Arc::clone(&store),
            dispatcher_config,
            Arc::clone(&metrics),
        ));

        info!(
            routes = registry.len(),
            max_queue = registry.max_queue(),
            max_concurrent_dispatches = dispatcher.max_concurrent(),
            "负载均衡器已创建"
        );

        Self {
            registry,
            store,
            dispatcher,
            timers: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    pub fn registry(&self) -> &RouteQueueRegistry {
        &self.registry
    }

    /// 提交请求
    ///
    /// 同步完成路由和容量检查，成功时立即返回请求ID，不会因队列状态阻塞。
    pub async fn add_request(
        &self,
        url: &str,
        method: &str,
        body: Option<JsonMap>,
        headers: Option<JsonMap>,
    ) -> BalancerResult<Uuid> {
        let route = OutboundRequest::route_of(url).map_err(|e| self.reject(e))?;

        let Some(queue) = self.registry.get(&route) else {
            return Err(self.reject(AdmissionError::RouteNotConfigured { route }));
        };

        let permit = queue.try_reserve().map_err(|e| self.reject(e))?;

        let request = Arc::new(OutboundRequest::new(
            url,
            route.clone(),
            method,
            headers.unwrap_or_default(),
            body,
        ));
        let id = request.id;

        // 先写入存储再入队，保证队列中的请求一定能在存储中找到
        self.store
            .insert(RequestRecord::waiting(Arc::clone(&request)))
            .await?;
        permit.send(request);

        self.metrics.record_admitted(&route);
        self.metrics.update_queue_depth(&route, queue.len());
        info!(request_id = %id, route = %route, method = %method, "请求已加入队列");

        Ok(id)
    }

    /// 按ID查询请求，无法解析的ID同样视为不存在
    pub async fn get_request(&self, id: &str) -> BalancerResult<RequestRecord> {
        let not_found = || LookupError::NotFound { id: id.to_string() };
        let uuid = Uuid::parse_str(id).map_err(|_| not_found())?;

        self.store
            .get(uuid)
            .await?
            .ok_or_else(|| BalancerError::from(not_found()))
    }

    /// 为每个间隔大于0的路由启动定时器，返回本次新启动的数量
    pub async fn start_queue_timers(&self) -> usize {
        let mut timers = self.timers.lock().await;
        let mut started = 0;

        for queue in self.registry.queues() {
            let Some(period) = queue.interval() else {
                warn!(route = %queue.route(), "路由间隔为0，不启动定时器，队列满后将一直拒绝");
                continue;
            };
            if timers.contains_key(queue.route()) {
                debug!(route = %queue.route(), "定时器已在运行");
                continue;
            }

            let handle =
                QueueTimer::new(Arc::clone(queue), Arc::clone(&self.dispatcher), period).start();
            timers.insert(queue.route().to_string(), handle);
            started += 1;
        }

        info!(started, total = timers.len(), "队列定时器已启动");
        started
    }

    /// 停止所有定时器，进行中的分发不受影响
    pub async fn stop_queue_timers(&self) {
        let handles: Vec<QueueTimerHandle> = {
            let mut timers = self.timers.lock().await;
            timers.drain().map(|(_, handle)| handle).collect()
        };

        let count = handles.len();
        for handle in handles {
            handle.stop().await;
        }
        info!(stopped = count, "队列定时器已全部停止");
    }

    pub async fn stats(&self) -> BalancerResult<BalancerStats> {
        let timers = self.timers.lock().await;
        let mut routes: Vec<RouteStats> = self
            .registry
            .queues()
            .map(|queue| RouteStats {
                path: queue.route().to_string(),
                interval_seconds: queue.interval_seconds(),
                queued: queue.len(),
                capacity: queue.capacity(),
                timer_running: timers
                    .get(queue.route())
                    .map(|handle| handle.is_running())
                    .unwrap_or(false),
            })
            .collect();
        drop(timers);
        routes.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(BalancerStats {
            routes,
            requests: self.store.count_by_status().await?,
            in_flight_dispatches: self.dispatcher.in_flight(),
            max_concurrent_dispatches: self.dispatcher.max_concurrent(),
        })
    }

    fn reject(&self, err: AdmissionError) -> BalancerError {
        self.metrics.record_rejected(err.code());
        warn!(code = err.code(), error = %err, "拒绝提交请求");
        err.into()
    }
}
