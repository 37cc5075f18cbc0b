use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// 同时进行中的上游调用上限
    pub max_concurrent_dispatches: usize,
    /// 单次上游调用超时
    pub request_timeout_seconds: u64,
    /// 为 true 时分发失败会把请求标记为 failed，否则请求保持 waiting
    pub report_failures: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_dispatches: 100,
            request_timeout_seconds: 30,
            report_failures: false,
        }
    }
}

impl ConfigValidator for DispatcherConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_count(
            self.max_concurrent_dispatches,
            "dispatcher.max_concurrent_dispatches",
            10000,
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.request_timeout_seconds,
            "dispatcher.request_timeout_seconds",
        )?;
        Ok(())
    }
}
