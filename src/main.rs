use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use balancer::app::Application;
use balancer::logging::init_logging;
use balancer::shutdown::ShutdownManager;
use balancer_config::{AppConfig, LogLevel, ObservabilityConfig, OutputFormat};
use clap::{Arg, Command};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let matches = Command::new("balancer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("按路由限流的HTTP请求转发服务")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("配置文件路径，未指定时依次尝试 CONFIG_PATH 和默认路径"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("日志级别，默认由运行环境决定")
                .value_parser(["trace", "debug", "info", "warn", "error"]),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("日志格式，默认由运行环境决定")
                .value_parser(["json", "pretty"]),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);

    // 加载配置
    let config = AppConfig::load(config_path).context("加载配置失败")?;

    // 初始化日志系统，命令行参数优先于运行环境的默认值
    let log_level = match matches.get_one::<String>("log-level") {
        Some(level) => level.parse::<LogLevel>().map_err(anyhow::Error::msg)?,
        None => config.env.default_log_level(),
    };
    let log_format = match matches.get_one::<String>("log-format") {
        Some(format) => format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?,
        None => config.env.default_log_format(),
    };
    init_logging(log_level, log_format)?;

    info!(env = %config.env, address = %config.http_server.address, "启动转发服务");

    if config.observability.metrics_enabled {
        install_metrics_exporter(&config.observability)?;
    }

    let app = Arc::new(Application::new(config));
    let shutdown_manager = ShutdownManager::new();

    // 启动应用
    let mut app_handle = {
        let shutdown_rx = shutdown_manager.subscribe().await;
        let app = Arc::clone(&app);

        tokio::spawn(async move {
            if let Err(e) = app.run(shutdown_rx).await {
                error!("应用运行失败: {e:#}");
            }
        })
    };

    // 等待关闭信号，应用提前退出（例如端口被占用）时直接结束
    let exited_early = tokio::select! {
        _ = wait_for_shutdown_signal() => {
            info!("收到关闭信号，开始优雅关闭...");
            None
        }
        joined = &mut app_handle => {
            warn!("应用已提前退出");
            Some(joined)
        }
    };

    shutdown_manager.shutdown().await;

    // 等待应用关闭，设置超时
    let outcome = match exited_early {
        Some(joined) => Ok(joined),
        None => tokio::time::timeout(Duration::from_secs(30), app_handle).await,
    };
    match outcome {
        Ok(Ok(())) => info!("应用已优雅关闭"),
        Ok(Err(e)) => error!("应用关闭时发生错误: {e}"),
        Err(_) => warn!("应用关闭超时，强制退出"),
    }

    info!("转发服务已退出");
    Ok(())
}

/// 安装 Prometheus 导出器，必须在创建应用之前调用
fn install_metrics_exporter(config: &ObservabilityConfig) -> Result<()> {
    let address: SocketAddr = config
        .metrics_address
        .parse()
        .with_context(|| format!("无效的指标监听地址: {}", config.metrics_address))?;

    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .context("安装Prometheus指标导出器失败")?;

    info!("Prometheus指标导出器已启动: http://{address}/metrics");
    Ok(())
}

/// 等待关闭信号
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("安装Ctrl+C信号处理器失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("安装SIGTERM信号处理器失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("收到Ctrl+C信号");
        },
        _ = terminate => {
            info!("收到SIGTERM信号");
        },
    }
}
