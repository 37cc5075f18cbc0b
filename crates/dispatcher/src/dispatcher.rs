use std::sync::Arc;
use std::time::Instant;

use balancer_config::DispatcherConfig;
use balancer_core::{OutboundRequest, RequestRepository, RequestStatus, UpstreamClient};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info};

use crate::metrics::MetricsCollector;

/// 请求分发器
///
/// 对出队的请求执行上游调用，并把终态写回存储。进行中的分发数量受信号量限制。
pub struct RequestDispatcher {
    upstream: Arc<dyn UpstreamClient>,
    store: Arc<dyn RequestRepository>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    report_failures: bool,
    metrics: Arc<MetricsCollector>,
}

impl RequestDispatcher {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        store: Arc<dyn RequestRepository>,
        config: &DispatcherConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            upstream,
            store,
            permits: Arc::new(Semaphore::new(config.max_concurrent_dispatches)),
            max_concurrent: config.max_concurrent_dispatches,
            report_failures: config.report_failures,
            metrics,
        }
    }

    /// 尝试获取一个分发许可，已达到并发上限时返回 `None`
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).try_acquire_owned().ok()
    }

    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// 执行一次分发，返回请求的最终状态
    ///
    /// 上游失败时：`report_failures` 关闭则请求保持 Waiting，否则标记为 Failed。
    /// 许可在分发结束时释放。
    pub async fn dispatch(
        &self,
        request: Arc<OutboundRequest>,
        permit: OwnedSemaphorePermit,
    ) -> RequestStatus {
        self.metrics.update_inflight(self.in_flight());
        let start = Instant::now();

        debug!(
            request_id = %request.id,
            route = %request.route,
            method = %request.method,
            url = %request.url,
            "开始分发请求"
        );

        let status = match self.upstream.forward(&request).await {
            Ok(response_body) => {
                self.metrics
                    .record_dispatch(&request.route, start.elapsed().as_secs_f64());
                match self.store.mark_done(request.id, response_body).await {
                    Ok(true) => {
                        info!(request_id = %request.id, route = %request.route, "请求处理完成");
                        RequestStatus::Done
                    }
                    Ok(false) => {
                        error!(request_id = %request.id, "请求已处于终态，忽略重复完成");
                        RequestStatus::Done
                    }
                    Err(e) => {
                        error!(request_id = %request.id, error = %e, "写入请求结果失败");
                        RequestStatus::Waiting
                    }
                }
            }
            Err(e) => {
                self.metrics.record_dispatch_failure(&request.route, e.kind());
                error!(
                    request_id = %request.id,
                    route = %request.route,
                    kind = e.kind(),
                    error = %e,
                    "请求分发失败"
                );

                if self.report_failures {
                    match self.store.mark_failed(request.id, e.to_string()).await {
                        Ok(_) => RequestStatus::Failed,
                        Err(e) => {
                            error!(request_id = %request.id, error = %e, "写入失败状态失败");
                            RequestStatus::Waiting
                        }
                    }
                } else {
                    RequestStatus::Waiting
                }
            }
        };

        drop(permit);
        self.metrics.update_inflight(self.in_flight());
        status
    }
}
