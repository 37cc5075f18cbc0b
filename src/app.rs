use std::sync::Arc;

use anyhow::{Context, Result};
use balancer_api::create_app;
use balancer_config::AppConfig;
use balancer_dispatcher::{Balancer, HttpUpstream, InMemoryRequestStore};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{info, warn};

/// 主应用程序
///
/// 持有转发引擎，并负责HTTP服务和队列定时器的启停。
pub struct Application {
    config: AppConfig,
    balancer: Arc<Balancer>,
}

impl Application {
    /// 创建新的应用实例
    ///
    /// 指标句柄在这里创建，需要在安装指标导出器之后调用。
    pub fn new(config: AppConfig) -> Self {
        info!(env = %config.env, routes = config.limits.routes.len(), "初始化应用程序");

        let upstream = Arc::new(HttpUpstream::new(config.dispatcher.request_timeout_seconds));
        let store = Arc::new(InMemoryRequestStore::new());
        let balancer = Arc::new(Balancer::new(
            &config.limits,
            &config.dispatcher,
            upstream,
            store,
        ));

        Self { config, balancer }
    }

    pub fn balancer(&self) -> Arc<Balancer> {
        Arc::clone(&self.balancer)
    }

    /// 绑定配置中的地址并运行，直到收到关闭信号
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let address = &self.config.http_server.address;
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("绑定地址失败: {address}"))?;

        self.serve(listener, shutdown_rx).await
    }

    /// 在给定的监听器上运行
    ///
    /// 先启动各路由的定时器再开始接收请求；关闭时HTTP服务先停止接收，
    /// 然后停止全部定时器，进行中的分发不会被取消。
    pub async fn serve(
        &self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let started = self.balancer.start_queue_timers().await;
        if started == 0 {
            warn!("没有任何路由启动定时器，提交的请求不会被转发");
        }

        let app = create_app(Arc::clone(&self.balancer), &self.config.http_server);
        let local_addr = listener.local_addr().context("获取监听地址失败")?;
        info!("API服务器启动在 http://{local_addr}");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败");

        self.balancer.stop_queue_timers().await;
        info!("API服务器已停止");
        result
    }
}
