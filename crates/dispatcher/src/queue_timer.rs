use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use crate::dispatcher::RequestDispatcher;
use crate::registry::RouteQueue;

/// 单次触发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 队列为空，本次跳过
    Idle,
    /// 进行中的分发已达上限，请求留在队列中
    Saturated,
    /// 取出一个请求并交给分发器
    Dispatched(Uuid),
}

/// 单个路由的周期定时器
///
/// 每次触发最多出队一个请求；分发在独立任务中进行，慢速上游不会推迟下一次触发。
pub struct QueueTimer {
    queue: Arc<RouteQueue>,
    dispatcher: Arc<RequestDispatcher>,
    period: Duration,
}

impl QueueTimer {
    pub fn new(queue: Arc<RouteQueue>, dispatcher: Arc<RequestDispatcher>, period: Duration) -> Self {
        Self {
            queue,
            dispatcher,
            period,
        }
    }

    pub async fn tick(&self) -> TickOutcome {
        let Some(permit) = self.dispatcher.try_acquire() else {
            debug!(route = %self.queue.route(), "分发并发已满，跳过本次出队");
            return TickOutcome::Saturated;
        };

        let Some(request) = self.queue.try_dequeue().await else {
            return TickOutcome::Idle;
        };

        let id = request.id;
        self.dispatcher
            .metrics()
            .update_queue_depth(self.queue.route(), self.queue.len());
        debug!(
            route = %self.queue.route(),
            request_id = %id,
            remaining = self.queue.len(),
            "出队请求"
        );

        let dispatcher = Arc::clone(&self.dispatcher);
        let span = tracing::info_span!("dispatch", route = %self.queue.route(), request_id = %id);
        tokio::spawn(
            async move {
                dispatcher.dispatch(request, permit).await;
            }
            .instrument(span),
        );

        TickOutcome::Dispatched(id)
    }

    /// 启动定时器，第一次触发发生在一个周期之后
    pub fn start(self) -> QueueTimerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let route = self.queue.route().to_string();

        let join = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            info!(
                route = %self.queue.route(),
                interval_seconds = self.period.as_secs(),
                "队列定时器已启动"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                    _ = stop_rx.changed() => {
                        break;
                    }
                }
            }

            info!(route = %self.queue.route(), "队列定时器已停止");
        });

        QueueTimerHandle {
            route,
            stop_tx,
            join,
        }
    }
}

/// 定时器句柄，停止只影响之后的触发，不会取消已经开始的分发
pub struct QueueTimerHandle {
    route: String,
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl QueueTimerHandle {
    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsCollector;
    use crate::store::InMemoryRequestStore;
    use balancer_config::DispatcherConfig;
    use balancer_core::{JsonMap, RequestRecord, RequestRepository, RequestStatus};
    use balancer_testing_utils::{json_map, MockUpstream, OutboundRequestBuilder};
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use serde_json::json;

    struct Fixture {
        queue: Arc<RouteQueue>,
        dispatcher: Arc<RequestDispatcher>,
        store: Arc<InMemoryRequestStore>,
        upstream: Arc<MockUpstream>,
    }

    fn fixture(upstream: MockUpstream, max_concurrent: usize) -> Fixture {
        let upstream = Arc::new(upstream);
        let store = Arc::new(InMemoryRequestStore::new());
        let config = DispatcherConfig {
            max_concurrent_dispatches: max_concurrent,
            ..DispatcherConfig::default()
        };
        let dispatcher = Arc::new(RequestDispatcher::new(
            upstream.clone(),
            store.clone(),
            &config,
            Arc::new(MetricsCollector::new()),
        ));
        Fixture {
            queue: Arc::new(RouteQueue::new("/api/x", 1, 10)),
            dispatcher,
            store,
            upstream,
        }
    }

    async fn enqueue(fixture: &Fixture) -> Uuid {
        let request = Arc::new(OutboundRequestBuilder::new("http://upstream.local/api/x").build());
        fixture
            .store
            .insert(RequestRecord::waiting(request.clone()))
            .await
            .unwrap();
        fixture.queue.try_reserve().unwrap().send(request.clone());
        request.id
    }

    #[tokio::test]
    async fn test_tick_on_empty_queue_is_noop() {
        let fixture = fixture(MockUpstream::responding(JsonMap::new()), 4);
        let timer = QueueTimer::new(
            fixture.queue.clone(),
            fixture.dispatcher.clone(),
            Duration::from_secs(1),
        );
        assert_eq!(timer.tick().await, TickOutcome::Idle);
        assert_eq!(fixture.dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_tick_dequeues_one_item_in_fifo_order() {
        let fixture = fixture(MockUpstream::responding(JsonMap::new()), 4);
        let first = enqueue(&fixture).await;
        let second = enqueue(&fixture).await;
        let timer = QueueTimer::new(
            fixture.queue.clone(),
            fixture.dispatcher.clone(),
            Duration::from_secs(1),
        );

        assert_eq!(timer.tick().await, TickOutcome::Dispatched(first));
        assert_eq!(fixture.queue.len(), 1);
        assert_eq!(timer.tick().await, TickOutcome::Dispatched(second));
        assert!(fixture.queue.is_empty());
    }

    #[test]
    fn test_tick_updates_queue_depth_gauge() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        // 本地记录器只对当前线程生效，所以用单线程运行时
        metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let fixture = fixture(MockUpstream::responding(JsonMap::new()), 4);
                enqueue(&fixture).await;
                enqueue(&fixture).await;
                let timer = QueueTimer::new(
                    fixture.queue.clone(),
                    fixture.dispatcher.clone(),
                    Duration::from_secs(1),
                );
                assert!(matches!(timer.tick().await, TickOutcome::Dispatched(_)));
            });
        });

        let depth = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find_map(|(key, _, _, value)| {
                let key = key.key();
                let route_label = key
                    .labels()
                    .any(|label| label.key() == "route" && label.value() == "/api/x");
                (key.name() == "balancer_queue_depth" && route_label).then_some(value)
            });
        assert!(matches!(depth, Some(DebugValue::Gauge(value)) if value.0 == 1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_saturated_keeps_item_queued() {
        let upstream = MockUpstream::responding(JsonMap::new()).with_delay(Duration::from_secs(60));
        let fixture = fixture(upstream, 1);
        enqueue(&fixture).await;
        let second = enqueue(&fixture).await;
        let timer = QueueTimer::new(
            fixture.queue.clone(),
            fixture.dispatcher.clone(),
            Duration::from_secs(1),
        );

        assert!(matches!(timer.tick().await, TickOutcome::Dispatched(_)));
        assert_eq!(timer.tick().await, TickOutcome::Saturated);
        assert_eq!(fixture.queue.len(), 1);

        // 第一个分发结束后许可释放
        time::sleep(Duration::from_secs(61)).await;
        assert_eq!(timer.tick().await, TickOutcome::Dispatched(second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_dispatches_at_most_one_per_interval() {
        let fixture = fixture(MockUpstream::responding(json_map(json!({"ok": true}))), 10);
        let ids = vec![
            enqueue(&fixture).await,
            enqueue(&fixture).await,
            enqueue(&fixture).await,
        ];

        let handle = QueueTimer::new(
            fixture.queue.clone(),
            fixture.dispatcher.clone(),
            Duration::from_secs(1),
        )
        .start();

        // 第一次触发在一个周期之后
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fixture.upstream.call_count(), 0);

        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(fixture.upstream.call_count(), 1);
        assert_eq!(fixture.queue.len(), 2);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fixture.upstream.call_count(), 2);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fixture.upstream.call_count(), 3);

        for id in ids {
            let record = fixture.store.get(id).await.unwrap().unwrap();
            assert_eq!(record.status, RequestStatus::Done);
        }

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_future_ticks_but_not_inflight_dispatch() {
        let upstream = MockUpstream::responding(json_map(json!({"ok": true})))
            .with_delay(Duration::from_secs(5));
        let fixture = fixture(upstream, 10);
        let first = enqueue(&fixture).await;
        let second = enqueue(&fixture).await;

        let handle = QueueTimer::new(
            fixture.queue.clone(),
            fixture.dispatcher.clone(),
            Duration::from_secs(1),
        )
        .start();
        assert!(handle.is_running());

        time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(fixture.upstream.call_count(), 1);

        handle.stop().await;

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fixture.upstream.call_count(), 1);
        assert_eq!(fixture.queue.len(), 1);

        let done = fixture.store.get(first).await.unwrap().unwrap();
        assert_eq!(done.status, RequestStatus::Done);
        let waiting = fixture.store.get(second).await.unwrap().unwrap();
        assert_eq!(waiting.status, RequestStatus::Waiting);
    }
}
