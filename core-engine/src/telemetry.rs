//! Tracing initialisation (ambient stack): `tracing-subscriber` only, no
//! OTLP exporter, since this crate's ambient concerns stop at structured logging
//! (see DESIGN.md's dependency ledger).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

pub fn init_telemetry(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.telemetry.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .with(env_filter)
        .try_init()?;

    Ok(())
}
