use brewline_catalog::PricingConfig;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 { 5 }

fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    /// Namespace put in front of every session key.
    pub key_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrdersConfig {
    #[serde(default = "default_placement_timeout")]
    pub placement_timeout_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_placement_timeout() -> u64 { 5000 }

fn default_page_size() -> u32 { 5 }

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            placement_timeout_ms: default_placement_timeout(),
            page_size: default_page_size(),
        }
    }
}

impl OrdersConfig {
    pub fn placement_timeout(&self) -> Duration {
        Duration::from_millis(self.placement_timeout_ms)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `BREWLINE__AUTH__JWT_SECRET=...` sets `auth.jwt_secret`
            .add_source(config::Environment::with_prefix("BREWLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Builds a config from a single TOML document.
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewline_catalog::ModifierCharge;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
        [server]
        port = 9000

        [database]
        url = "postgres://localhost/brewline"

        [redis]
        url = "redis://localhost"
        key_prefix = "test"

        [auth]
        jwt_secret = "secret"
        jwt_issuer = "brewline"
    "#;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.orders.page_size, 5);
        assert_eq!(config.orders.placement_timeout(), Duration::from_secs(5));
        assert_eq!(config.pricing.tax_rate, dec!(0.10));
        assert_eq!(config.pricing.modifier_charge, ModifierCharge::PerLine);
    }

    #[test]
    fn test_pricing_overrides() {
        let source = format!(
            "{}\n[pricing]\ntax_rate = \"0.11\"\nmodifier_charge = \"per_unit\"\n",
            MINIMAL
        );
        let config = Config::from_toml(&source).unwrap();
        assert_eq!(config.pricing.tax_rate, dec!(0.11));
        assert_eq!(config.pricing.modifier_charge, ModifierCharge::PerUnit);
        assert_eq!(config.pricing.scale, 2);
    }

    #[test]
    fn test_missing_auth_is_an_error() {
        let source = MINIMAL.replace("[auth]", "[unused]");
        assert!(Config::from_toml(&source).is_err());
    }
}
