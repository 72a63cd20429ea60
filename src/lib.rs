// Modules principaux
pub mod api;
pub mod core;
pub mod domain;
pub mod gateway;
pub mod infrastructure;

// Ré-exports pour faciliter l'utilisation
pub use infrastructure::{AppError, AppResult, Database};

// Version de l'application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "CarLoc";
