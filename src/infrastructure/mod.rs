// infrastructure/mod.rs
pub mod config;
pub mod database;
pub mod error;
pub mod telemetry;

pub use config::{ApiConfig, GatewayConfig};
pub use database::Database;
pub use error::{AppError, AppResult};
