use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Which classifier implementation serves predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Dense network JSON (`Network::load_json`).
    Native,
    /// Int8-quantized `.optc` file, local or fetched from `MODEL_URL`.
    Compact,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: unknown backend `{value}` (expected `native` or `compact`)")]
    UnknownBackend { var: &'static str, value: String },

    #[error("{var}: `{value}` is not a number of seconds")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{0} is not set")]
    Missing(&'static str),
}

pub const ENV_BACKEND: &str = "OPTIC_BACKEND";
pub const ENV_MODEL_PATH: &str = "OPTIC_MODEL_PATH";
pub const ENV_MODEL_URL: &str = "MODEL_URL";
pub const ENV_MODEL_CACHE: &str = "OPTIC_MODEL_CACHE";
pub const ENV_DOWNLOAD_TIMEOUT: &str = "OPTIC_DOWNLOAD_TIMEOUT_SECS";
pub const ENV_KEYWORDS_PATH: &str = "OPTIC_KEYWORDS_PATH";
pub const ENV_BIND: &str = "OPTIC_BIND";
pub const ENV_TESSERACT: &str = "OPTIC_TESSERACT";
pub const ENV_SCRATCH_DIR: &str = "OPTIC_SCRATCH_DIR";
pub const ENV_DISCORD_TOKEN: &str = "DISCORD_TOKEN";

/// Process configuration, read from the environment.
///
/// | Variable | Default |
/// |---|---|
/// | `OPTIC_BACKEND` | `compact` when `MODEL_URL` is set, else `native` |
/// | `OPTIC_MODEL_PATH` | `model.json` |
/// | `MODEL_URL` | unset |
/// | `OPTIC_MODEL_CACHE` | `<tmp>/model.optc` |
/// | `OPTIC_DOWNLOAD_TIMEOUT_SECS` | `60` |
/// | `OPTIC_KEYWORDS_PATH` | built-in list |
/// | `OPTIC_BIND` | `0.0.0.0:8000` |
/// | `OPTIC_TESSERACT` | `tesseract` |
/// | `OPTIC_SCRATCH_DIR` | system temp dir |
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend: Backend,
    pub model_path: PathBuf,
    pub model_url: Option<String>,
    pub model_cache_path: PathBuf,
    pub download_timeout: Duration,
    pub keywords_path: Option<PathBuf>,
    pub bind_addr: String,
    pub tesseract_bin: PathBuf,
    /// Where the bot writes attachment scratch files.
    pub scratch_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let model_url = get(ENV_MODEL_URL);

        let backend = match get(ENV_BACKEND).as_deref() {
            None if model_url.is_some() => Backend::Compact,
            None => Backend::Native,
            Some(v) if v.eq_ignore_ascii_case("native") => Backend::Native,
            Some(v) if v.eq_ignore_ascii_case("compact") => Backend::Compact,
            Some(v) => {
                return Err(ConfigError::UnknownBackend { var: ENV_BACKEND, value: v.to_owned() })
            }
        };

        let download_timeout = match get(ENV_DOWNLOAD_TIMEOUT) {
            None => Duration::from_secs(60),
            Some(v) => v.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidTimeout { var: ENV_DOWNLOAD_TIMEOUT, value: v })?,
        };

        Ok(Config {
            backend,
            model_path: get(ENV_MODEL_PATH).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("model.json")),
            model_url,
            model_cache_path: get(ENV_MODEL_CACHE)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("model.optc")),
            download_timeout,
            keywords_path: get(ENV_KEYWORDS_PATH).map(PathBuf::from),
            bind_addr: get(ENV_BIND).unwrap_or_else(|| "0.0.0.0:8000".to_owned()),
            tesseract_bin: get(ENV_TESSERACT).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("tesseract")),
            scratch_dir: get(ENV_SCRATCH_DIR).map(PathBuf::from),
        })
    }
}

/// Bot credential. Only the bot process requires it.
pub fn discord_token() -> Result<String, ConfigError> {
    std::env::var(ENV_DISCORD_TOKEN)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or(ConfigError::Missing(ENV_DISCORD_TOKEN))
}
