use std::env;
use std::path::PathBuf;

use crate::error::DispatchError;

/// Knobs the dispatch operator may change per deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchPolicy {
    /// When set, a successful claim marks the claiming driver busy.
    /// Off by default: the availability toggle stays with the operator.
    pub auto_busy_on_claim: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_level: String,
    pub policy: DispatchPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("taxi_data")),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            policy: DispatchPolicy {
                auto_busy_on_claim: parse_or_default("AUTO_BUSY_ON_CLAIM", false)?,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, DispatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| DispatchError::BadRequest(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
