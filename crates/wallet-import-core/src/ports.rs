#![allow(async_fn_in_trait)]

use alloy::primitives::{Address, B256};
use thiserror::Error;

use crate::domain::{HardwareKind, KeyObject, Wallet};
use crate::error::ImportError;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("crypto error: {0}")]
    Crypto(String),
    #[error("device error: {0}")]
    Device(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Turns user secrets into wallets.
pub trait KeyDerivationPort {
    fn is_mnemonic_valid(&self, phrase: &str) -> bool;
    async fn wallet_from_mnemonic(&self, phrase: &str, hd_path: &str)
        -> Result<Wallet, PortError>;
    async fn wallet_from_phrase(&self, phrase: &str) -> Result<Wallet, PortError>;
    async fn wallet_from_private_key(&self, private_key: &str) -> Result<Wallet, PortError>;
    async fn generate_wallet(&self) -> Result<Wallet, PortError>;
}

/// Password-based encryption of key material into key objects, and back.
pub trait KeystorePort {
    async fn encrypt(&self, wallet: &Wallet, password: &str) -> Result<KeyObject, PortError>;
    async fn decrypt(&self, key_object: &KeyObject, password: &str) -> Result<Wallet, PortError>;
}

/// Address queries against a hardware wallet. Keys never leave the device.
pub trait HardwarePort {
    async fn addresses(
        &self,
        kind: HardwareKind,
        chain_id: u64,
        hd_path: &str,
    ) -> Result<Vec<Address>, PortError>;
}

pub trait AccountRegistryPort {
    fn add_item(
        &self,
        should_persist: bool,
        key_object: &KeyObject,
        private_key: Option<B256>,
    ) -> Result<(), PortError>;
}

pub trait ErrorReporterPort {
    fn add_error(&self, message: &str, cause: &ImportError);
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;
}
