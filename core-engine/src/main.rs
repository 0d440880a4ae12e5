use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use netguard_core::config::AppConfig;
use netguard_core::store::memory::MemoryRegistry;
use netguard_core::sync::coordinator::RetryPolicy;
use netguard_core::Engine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().unwrap_or_default();
    netguard_core::telemetry::init_telemetry(&config)?;

    let retry = RetryPolicy {
        base_delay: Duration::from_millis(config.sync.base_delay_ms),
        factor: config.sync.backoff_factor,
        max_attempts: config.sync.max_attempts,
        max_delay: Duration::from_millis(config.sync.max_delay_ms),
    };
    let debounce_window = Duration::from_millis(config.sync.debounce_window_ms);

    let engine = Arc::new(Engine::new(Arc::new(MemoryRegistry::new()), retry, debounce_window));
    let app = netguard_core::api::create_router(engine);

    info!(addr = %config.server.bind_addr, "listening");
    axum::Server::bind(&config.server.bind_addr).serve(app.into_make_service()).await?;

    Ok(())
}
