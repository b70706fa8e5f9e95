// Configuration management module
// Settings come from an optional TOML file overlaid with environment variables

pub mod settings;

pub use settings::{
    Config, ConfigError, DEFAULT_EMBEDDING_DIMENSION, GeminiConfig, HttpConfig, PineconeConfig,
    ServerConfig, TutorConfig,
};

use tracing::debug;

/// Load variables from a `.env` file in the working directory or its parents, if present
#[inline]
pub fn load_environment() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(error) if error.not_found() => debug!("No .env file found"),
        Err(error) => tracing::warn!("Failed to load .env file: {}", error),
    }
}
