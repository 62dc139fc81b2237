use std::path::PathBuf;

use wallet_import_core::config::env_parse;

#[derive(Debug, Clone)]
pub struct ImportAdapterConfig {
    /// scrypt cost as a power of two.
    pub keystore_scrypt_log_n: u8,
    pub keystore_scrypt_r: u32,
    pub keystore_scrypt_p: u32,
    pub registry_path: PathBuf,
}

impl Default for ImportAdapterConfig {
    fn default() -> Self {
        Self {
            keystore_scrypt_log_n: 13,
            keystore_scrypt_r: 8,
            keystore_scrypt_p: 1,
            registry_path: PathBuf::from("accounts.json"),
        }
    }
}

impl ImportAdapterConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(log_n) = env_parse::<u8>("WALLET_IMPORT_SCRYPT_LOG_N") {
            cfg.keystore_scrypt_log_n = log_n;
        }
        if let Some(r) = env_parse::<u32>("WALLET_IMPORT_SCRYPT_R") {
            cfg.keystore_scrypt_r = r;
        }
        if let Some(p) = env_parse::<u32>("WALLET_IMPORT_SCRYPT_P") {
            cfg.keystore_scrypt_p = p;
        }
        if let Some(path) = env_parse::<PathBuf>("WALLET_IMPORT_REGISTRY") {
            cfg.registry_path = path;
        }
        cfg
    }

    /// Cheap keystore parameters for tests and tooling.
    pub fn insecure_fast() -> Self {
        Self {
            keystore_scrypt_log_n: 4,
            keystore_scrypt_r: 8,
            keystore_scrypt_p: 1,
            ..Self::default()
        }
    }
}
