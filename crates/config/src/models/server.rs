use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

/// 入站HTTP服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    pub address: String,
    /// 单个入站请求的处理超时
    pub timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            address: "localhost:8080".to_string(),
            timeout_seconds: 10,
            idle_timeout_seconds: 60,
        }
    }
}

impl ConfigValidator for HttpServerConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        ValidationUtils::validate_not_empty(&self.address, "http_server.address")?;
        ValidationUtils::validate_timeout_seconds(self.timeout_seconds, "http_server.timeout_seconds")?;
        ValidationUtils::validate_timeout_seconds(
            self.idle_timeout_seconds,
            "http_server.idle_timeout_seconds",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_server_config_validation() {
        let config = HttpServerConfig::default();
        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.address = " ".to_string();
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config;
        invalid_config.timeout_seconds = 0;
        assert!(invalid_config.validate().is_err());
    }
}
