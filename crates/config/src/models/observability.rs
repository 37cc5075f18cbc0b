use serde::{Deserialize, Serialize};

use crate::validation::{ConfigValidator, ValidationUtils};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    /// Prometheus 抓取地址
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl ConfigValidator for ObservabilityConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if self.metrics_enabled {
            ValidationUtils::validate_not_empty(
                &self.metrics_address,
                "observability.metrics_address",
            )?;
            self.metrics_address
                .parse::<std::net::SocketAddr>()
                .map_err(|e| {
                    crate::ConfigError::Validation(format!(
                        "observability.metrics_address is not a socket address: {e}"
                    ))
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ObservabilityConfig {
            metrics_enabled: false,
            metrics_address: "not-an-address".to_string(),
        };
        assert!(config.validate().is_ok());

        config.metrics_enabled = true;
        assert!(config.validate().is_err());

        config.metrics_address = "127.0.0.1:9100".to_string();
        assert!(config.validate().is_ok());
    }
}
