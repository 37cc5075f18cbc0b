//! 测试辅助函数

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;

/// 轮询直到条件成立或超时，返回条件是否成立
///
/// 用于集成测试中等待定时器驱动的异步状态变化。
pub async fn wait_for<F, Fut>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }

    condition().await
}
