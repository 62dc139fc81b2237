use std::time::Duration;

use crate::domain::StorageMode;

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub chain_id: u64,
    pub storage_mode: StorageMode,
    /// `None` waits on the device for as long as it takes.
    pub hardware_timeout: Option<Duration>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            storage_mode: StorageMode::Session,
            hardware_timeout: None,
        }
    }
}

impl ImportConfig {
    /// Reads `WALLET_IMPORT_CHAIN_ID`, `WALLET_IMPORT_STORAGE` and
    /// `WALLET_IMPORT_HARDWARE_TIMEOUT_MS`; unset or unparsable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(chain_id) = env_parse::<u64>("WALLET_IMPORT_CHAIN_ID") {
            cfg.chain_id = chain_id;
        }
        if let Some(mode) = env_parse::<StorageMode>("WALLET_IMPORT_STORAGE") {
            cfg.storage_mode = mode;
        }
        if let Some(ms) = env_parse::<u64>("WALLET_IMPORT_HARDWARE_TIMEOUT_MS") {
            cfg.hardware_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        cfg
    }
}

pub fn env_parse<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(var = name, value = %raw, error = %e, "ignoring invalid setting");
            None
        }
    }
}
