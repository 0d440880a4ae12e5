pub mod api;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod services;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use config::AppConfig;
pub use services::Engine;
