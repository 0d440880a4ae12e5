//! Application configuration (ambient stack): a `config`-crate builder
//! layering a default file, an optional `RUST_ENV`-named override, and
//! prefixed environment variables.

use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".parse().unwrap() }
    }
}

/// Retry/debounce knobs for `sync::coordinator::SyncCoordinator` (§4.H).
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub base_delay_ms: u64,
    pub backoff_factor: u32,
    pub max_attempts: u32,
    pub max_delay_ms: u64,
    pub debounce_window_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            backoff_factor: 2,
            max_attempts: 5,
            max_delay_ms: 2_000,
            debounce_window_ms: 500,
        }
    }
}

/// The reconciler's mass-deletion guard (§4.E, §8 invariant 5).
#[derive(Debug, Clone, Deserialize)]
pub struct SafetyCapConfig {
    pub ratio: f64,
    pub floor: usize,
}

impl Default for SafetyCapConfig {
    fn default() -> Self {
        Self { ratio: 0.8, floor: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub safety_cap: SafetyCapConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Layers `config/default.{toml,yaml,...}`, an optional `config/<RUST_ENV>`
    /// override, then `NETGUARD_`-prefixed environment variables, in that
    /// order (later sources win).
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false));

        if let Ok(env) = std::env::var("RUST_ENV") {
            builder = builder.add_source(config::File::with_name(&format!("config/{env}")).required(false));
        }

        builder = builder.add_source(config::Environment::with_prefix("NETGUARD").separator("__"));

        let built = builder.build()?;
        built.try_deserialize()
    }
}
