use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    dispatcher::DispatcherConfig, limits::LimitsConfig, logging::AppEnvironment,
    observability::ObservabilityConfig, server::HttpServerConfig,
};
use crate::validation::ConfigValidator;

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/balancer.toml",
    "balancer.toml",
    "/etc/balancer/config.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: AppEnvironment,
    #[serde(default)]
    pub http_server: HttpServerConfig,
    pub limits: LimitsConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 加载配置
    ///
    /// 查找顺序：显式路径 → `CONFIG_PATH` 环境变量 → 默认路径。
    /// 文件格式按扩展名识别，之后叠加 `BALANCER_` 前缀的环境变量，
    /// 例如 `BALANCER_LIMITS__MAX_QUEUE=50`。
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = match config_path {
            Some(path) => path.to_string(),
            None => match std::env::var("CONFIG_PATH") {
                Ok(path) if !path.trim().is_empty() => path,
                _ => DEFAULT_CONFIG_PATHS
                    .iter()
                    .find(|path| Path::new(path).exists())
                    .map(|path| path.to_string())
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "未找到配置文件，请通过 --config 或 CONFIG_PATH 指定: {:?}",
                            DEFAULT_CONFIG_PATHS
                        )
                    })?,
            },
        };

        if !Path::new(&path).exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {}", path));
        }

        let config: AppConfig = ConfigBuilder::builder()
            .add_source(File::from(Path::new(&path)))
            .add_source(
                Environment::with_prefix("BALANCER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        self.http_server.validate()?;
        self.limits.validate()?;
        self.dispatcher.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_TOML: &str = r#"
env = "local"

[http_server]
address = "127.0.0.1:8081"

[limits]
max_queue = 2

[[limits.routes]]
path = "/api/x"
interval_seconds = 1

[[limits.routes]]
path = "/api/slow"
interval_seconds = 0
"#;

    #[test]
    fn test_app_config_from_toml() {
        let config = AppConfig::from_toml(SAMPLE_TOML).expect("valid config");
        assert_eq!(config.env, AppEnvironment::Local);
        assert_eq!(config.http_server.address, "127.0.0.1:8081");
        assert_eq!(config.http_server.timeout_seconds, 10);
        assert_eq!(config.limits.max_queue, 2);
        assert_eq!(config.limits.routes.len(), 2);
        assert_eq!(config.dispatcher.max_concurrent_dispatches, 100);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_app_config_requires_env() {
        let toml_str = r#"
[limits]
[[limits.routes]]
path = "/api/x"
interval_seconds = 1
"#;
        assert!(AppConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_app_config_rejects_unknown_env() {
        let toml_str = SAMPLE_TOML.replace("env = \"local\"", "env = \"staging\"");
        assert!(AppConfig::from_toml(&toml_str).is_err());
    }

    #[test]
    fn test_app_config_toml_roundtrip() {
        let config = AppConfig::from_toml(SAMPLE_TOML).unwrap();
        let serialized = config.to_toml().expect("Failed to serialize");
        let reparsed = AppConfig::from_toml(&serialized).expect("Failed to reparse");
        assert_eq!(config.limits.routes, reparsed.limits.routes);
        assert_eq!(config.limits.max_queue, reparsed.limits.max_queue);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp file");
        file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

        let path = file.path().to_str().unwrap();
        let config = AppConfig::load(Some(path)).expect("Failed to load config");
        assert_eq!(config.limits.timings_by_route().get("/api/x"), Some(&1));
        assert_eq!(config.limits.timings_by_route().get("/api/slow"), Some(&0));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let yaml = r#"
env: prod
limits:
  max_queue: 10
  routes:
    - path: /v1/items
      interval_seconds: 3
dispatcher:
  report_failures: true
"#;
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("Failed to create temp file");
        file.write_all(yaml.as_bytes()).unwrap();

        let config = AppConfig::load(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.env, AppEnvironment::Prod);
        assert_eq!(config.limits.max_queue, 10);
        assert_eq!(config.limits.routes[0].path, "/v1/items");
        assert!(config.dispatcher.report_failures);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load(Some("/definitely/not/here/balancer.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_rejects_zero_max_queue() {
        let toml_str = SAMPLE_TOML.replace("max_queue = 2", "max_queue = 0");
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(toml_str.as_bytes()).unwrap();

        assert!(AppConfig::load(Some(file.path().to_str().unwrap())).is_err());
    }
}
