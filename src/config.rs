use std::env;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where the model descriptor comes from. `MODEL_URL` takes precedence over
/// `MODEL_PATH`; both yield the same loaded model.
#[derive(Debug, Clone)]
pub enum ModelSource {
    Path(PathBuf),
    Url(String),
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Path(path) => write!(f, "{}", path.display()),
            ModelSource::Url(url) => write!(f, "{url}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_source: ModelSource,
    pub database_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT value: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => 8080,
        };

        let model_source = match env::var("MODEL_URL") {
            Ok(url) => ModelSource::Url(url),
            Err(_) => ModelSource::Path(
                env::var("MODEL_PATH")
                    .unwrap_or_else(|_| "model.onnx".to_string())
                    .into(),
            ),
        };

        let database_path = env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "predictions.db".to_string())
            .into();

        Ok(Self {
            host,
            port,
            model_source,
            database_path,
        })
    }
}
