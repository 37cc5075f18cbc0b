use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

/// 单条路由的限流配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLimit {
    /// 目标URL的路径，例如 `/api/x`
    pub path: String,
    /// 每次出队的间隔（秒），0 表示不启动定时器
    pub interval_seconds: u64,
}

impl RouteLimit {
    pub fn new(path: impl Into<String>, interval_seconds: u64) -> Self {
        Self {
            path: path.into(),
            interval_seconds,
        }
    }
}

/// 各路由的出队间隔和全局队列上限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub routes: Vec<RouteLimit>,
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,
}

fn default_max_queue() -> usize {
    1000
}

impl LimitsConfig {
    /// 路由路径 → 间隔秒数
    pub fn timings_by_route(&self) -> HashMap<String, u64> {
        self.routes
            .iter()
            .map(|route| (route.path.clone(), route.interval_seconds))
            .collect()
    }
}

impl ConfigValidator for LimitsConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.routes.is_empty() {
            return Err(crate::ConfigError::Validation(
                "limits.routes cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            ValidationUtils::validate_route_path(&route.path, "limits.routes.path")?;
            if !seen.insert(route.path.as_str()) {
                return Err(crate::ConfigError::Validation(format!(
                    "duplicate route in limits.routes: {}",
                    route.path
                )));
            }
        }

        ValidationUtils::validate_count(self.max_queue, "limits.max_queue", 100_000)?;
        Ok(())
    }
}
