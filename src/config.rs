use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL for the ledger, locks and transfer stores.
    /// Absent means the in-process store (local development only).
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Apply sql/schema.sql on startup.
    #[serde(default)]
    pub auto_migrate: bool,
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
    #[serde(default)]
    pub second_factor: SecondFactorConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Endpoints of the external collaborators. Absent URLs fall back to the
/// ledger-backed validator and the local second-factor stub.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CollaboratorConfig {
    #[serde(default)]
    pub account_service_url: Option<String>,
    #[serde(default)]
    pub otp_service_url: Option<String>,
    #[serde(default)]
    pub deposit_registrar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SecondFactorConfig {
    /// Validity window of an issued code, in seconds.
    pub ttl_secs: u64,
}

impl Default for SecondFactorConfig {
    fn default() -> Self {
        Self { ttl_secs: 180 }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses() {
        let yaml = r#"
log_level: "info"
log_dir: "./logs"
log_file: "bankcore.log"
use_json: false
rotation: "never"
gateway:
  host: "127.0.0.1"
  port: 8080
"#;
        let cfg: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.postgres_url.is_none());
        assert!(!cfg.auto_migrate);
        assert_eq!(cfg.second_factor.ttl_secs, 180);
        assert!(cfg.collaborators.otp_service_url.is_none());
    }
}
