use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::state_machine::ImportState;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimestampMs(pub u64);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownKey {
    pub kind: &'static str,
    pub value: String,
}

/// How the account being imported is sourced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportType {
    #[default]
    #[serde(rename = "bipPhrase")]
    MnemonicPhrase,
    #[serde(rename = "brainPhrase")]
    BrainPhrase,
    #[serde(rename = "privateKey")]
    PrivateKey,
    #[serde(rename = "json")]
    JsonKeystore,
    #[serde(rename = "ledger")]
    Ledger,
    #[serde(rename = "trezor")]
    Trezor,
    #[serde(rename = "newKey")]
    NewKey,
}

impl ImportType {
    pub const ALL: [ImportType; 7] = [
        ImportType::MnemonicPhrase,
        ImportType::BrainPhrase,
        ImportType::PrivateKey,
        ImportType::JsonKeystore,
        ImportType::Ledger,
        ImportType::Trezor,
        ImportType::NewKey,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ImportType::MnemonicPhrase => "bipPhrase",
            ImportType::BrainPhrase => "brainPhrase",
            ImportType::PrivateKey => "privateKey",
            ImportType::JsonKeystore => "json",
            ImportType::Ledger => "ledger",
            ImportType::Trezor => "trezor",
            ImportType::NewKey => "newKey",
        }
    }

    pub fn hardware_kind(self) -> Option<HardwareKind> {
        match self {
            ImportType::Ledger => Some(HardwareKind::Ledger),
            ImportType::Trezor => Some(HardwareKind::Trezor),
            _ => None,
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ImportType {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImportType::ALL
            .into_iter()
            .find(|t| t.key() == s)
            .ok_or_else(|| UnknownKey {
                kind: "import type",
                value: s.to_owned(),
            })
    }
}

/// HD path family selected for mnemonic derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    #[default]
    Ledger,
    Trezor,
}

/// Where the imported key material lives once the account is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageMode {
    /// Memory only, gone when the session ends.
    #[default]
    #[serde(rename = "session")]
    Session,
    /// Encrypted key object written to durable storage.
    #[serde(rename = "browser")]
    Persistent,
}

impl StorageMode {
    pub fn key(self) -> &'static str {
        match self {
            StorageMode::Session => "session",
            StorageMode::Persistent => "browser",
        }
    }

    pub fn should_persist(self) -> bool {
        self == StorageMode::Persistent
    }
}

impl FromStr for StorageMode {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(StorageMode::Session),
            "browser" | "persistent" => Ok(StorageMode::Persistent),
            other => Err(UnknownKey {
                kind: "storage mode",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareKind {
    Ledger,
    Trezor,
}

impl HardwareKind {
    pub fn label(self) -> &'static str {
        match self {
            HardwareKind::Ledger => "Ledger",
            HardwareKind::Trezor => "Trezor",
        }
    }

    /// Message key reported when the device hands back no address.
    pub fn comms_error_key(self) -> &'static str {
        match self {
            HardwareKind::Ledger => "import.errors.ledgerComms",
            HardwareKind::Trezor => "import.errors.trezorComms",
        }
    }
}

impl fmt::Display for HardwareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derived key material. Hardware accounts never carry a private key.
#[derive(Clone, PartialEq, Eq)]
pub struct Wallet {
    pub address: Address,
    pub private_key: Option<B256>,
}

impl Wallet {
    pub fn watch_only(address: Address) -> Self {
        Self {
            address,
            private_key: None,
        }
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareMeta {
    #[serde(rename = "type")]
    pub kind: HardwareKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStamp {
    #[serde(rename = "importedAt")]
    pub imported_at: TimestampMs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareMeta>,
    #[serde(rename = "theBlock", default, skip_serializing_if = "Option::is_none")]
    pub the_block: Option<ImportStamp>,
    /// Keys written by other tools are carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The artifact handed to the account registry: a v3 keystore document for
/// local keys, or a bare address with a hardware tag for device accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyObject {
    #[serde(with = "keystore_address")]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub meta: KeyMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    #[serde(default, alias = "Crypto", skip_serializing_if = "Option::is_none")]
    pub crypto: Option<Value>,
    /// Top-level fields written by other wallets (e.g. `x-ethers`) travel
    /// with the document into the registry.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl KeyObject {
    pub fn hardware(kind: HardwareKind, address: Address) -> Self {
        Self {
            address,
            name: Some(kind.label().to_owned()),
            meta: KeyMeta {
                hardware: Some(HardwareMeta { kind }),
                ..KeyMeta::default()
            },
            id: None,
            version: None,
            crypto: None,
            extra: Map::new(),
        }
    }

    pub fn checksum_address(&self) -> String {
        self.address.to_checksum(None)
    }

    pub fn hardware_kind(&self) -> Option<HardwareKind> {
        self.meta.hardware.map(|h| h.kind)
    }

    pub fn imported_at(&self) -> Option<TimestampMs> {
        self.meta.the_block.map(|s| s.imported_at)
    }
}

/// Keystore files store the address as 40 hex characters without a prefix.
mod keystore_address {
    use alloy::primitives::{hex, Address};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(address: &Address, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(address.as_slice()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything the import screen holds between user edits.
#[derive(Clone)]
pub struct SessionState {
    pub import_type: ImportType,
    pub path_type: PathType,
    pub storage_mode: StorageMode,
    pub chain_id: u64,
    pub phrase: String,
    pub private_key: String,
    pub password: String,
    pub json_filename: String,
    pub json_keystore: String,
    pub display_name: String,
    pub wallet: Option<Wallet>,
    pub key_object: Option<KeyObject>,
    pub state: ImportState,
    pub busy: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            import_type: ImportType::default(),
            path_type: PathType::default(),
            storage_mode: StorageMode::default(),
            chain_id: 1,
            phrase: String::new(),
            private_key: String::new(),
            password: String::new(),
            json_filename: String::new(),
            json_keystore: String::new(),
            display_name: String::new(),
            wallet: None,
            key_object: None,
            state: ImportState::Empty,
            busy: false,
        }
    }
}

impl SessionState {
    /// Resets the form and secret fields. Selections and lifecycle are kept.
    pub fn clear_transient(&mut self) {
        self.phrase.clear();
        self.private_key.clear();
        self.password.clear();
        self.json_filename.clear();
        self.json_keystore.clear();
        self.display_name.clear();
        self.key_object = None;
        if let Some(wallet) = self.wallet.as_mut() {
            wallet.private_key = None;
        }
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(s: &str) -> &'static str {
            if s.is_empty() {
                ""
            } else {
                "<redacted>"
            }
        }

        f.debug_struct("SessionState")
            .field("import_type", &self.import_type)
            .field("path_type", &self.path_type)
            .field("storage_mode", &self.storage_mode)
            .field("chain_id", &self.chain_id)
            .field("phrase", &redact(&self.phrase))
            .field("private_key", &redact(&self.private_key))
            .field("password", &redact(&self.password))
            .field("json_filename", &self.json_filename)
            .field("json_keystore", &redact(&self.json_keystore))
            .field("display_name", &self.display_name)
            .field("wallet", &self.wallet)
            .field("key_object", &self.key_object)
            .field("state", &self.state)
            .field("busy", &self.busy)
            .finish()
    }
}

/// One import attempt, captured from the session when it starts. Each
/// variant carries only what its pipeline reads.
#[derive(Clone, PartialEq, Eq)]
pub enum ImportRequest {
    Mnemonic {
        phrase: String,
        hd_path: String,
        password: String,
    },
    BrainPhrase {
        phrase: String,
        password: String,
    },
    PrivateKey {
        private_key: String,
        password: String,
    },
    NewKey {
        password: String,
    },
    JsonKeystore {
        keystore_json: String,
        password: String,
    },
    Ledger {
        chain_id: u64,
        hd_path: String,
    },
    Trezor {
        chain_id: u64,
        hd_path: String,
    },
}

impl ImportRequest {
    pub fn import_type(&self) -> ImportType {
        match self {
            ImportRequest::Mnemonic { .. } => ImportType::MnemonicPhrase,
            ImportRequest::BrainPhrase { .. } => ImportType::BrainPhrase,
            ImportRequest::PrivateKey { .. } => ImportType::PrivateKey,
            ImportRequest::NewKey { .. } => ImportType::NewKey,
            ImportRequest::JsonKeystore { .. } => ImportType::JsonKeystore,
            ImportRequest::Ledger { .. } => ImportType::Ledger,
            ImportRequest::Trezor { .. } => ImportType::Trezor,
        }
    }
}

impl fmt::Debug for ImportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportRequest::Mnemonic { hd_path, .. } => f
                .debug_struct("Mnemonic")
                .field("hd_path", hd_path)
                .finish_non_exhaustive(),
            ImportRequest::Ledger { chain_id, hd_path } => f
                .debug_struct("Ledger")
                .field("chain_id", chain_id)
                .field("hd_path", hd_path)
                .finish(),
            ImportRequest::Trezor { chain_id, hd_path } => f
                .debug_struct("Trezor")
                .field("chain_id", chain_id)
                .field("hd_path", hd_path)
                .finish(),
            other => write!(f, "{}{{..}}", other.import_type()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another attempt is still in flight.
    Busy,
    /// A validation gate is failing for the current selection.
    Blocked,
}

/// What a call to `start_import` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Completed(Address),
    Skipped(SkipReason),
    Failed,
    /// The attempt was cancelled while in flight and its result discarded.
    Superseded,
}
