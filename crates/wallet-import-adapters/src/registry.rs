use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use alloy::primitives::{Address, B256};
use tracing::info;

use wallet_import_core::{AccountRegistryPort, KeyObject, PortError};

/// A registered account. The private key is only ever held in memory.
#[derive(Clone)]
pub struct AccountEntry {
    pub key_object: KeyObject,
    pub persisted: bool,
    pub private_key: Option<B256>,
}

impl fmt::Debug for AccountEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountEntry")
            .field("key_object", &self.key_object)
            .field("persisted", &self.persisted)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    accounts: Vec<AccountEntry>,
    writes: usize,
}

impl RegistryState {
    fn upsert(&mut self, entry: AccountEntry) {
        self.writes += 1;
        match self
            .accounts
            .iter_mut()
            .find(|a| a.key_object.address == entry.key_object.address)
        {
            Some(existing) => *existing = entry,
            None => self.accounts.push(entry),
        }
    }
}

/// Keeps every account in memory; re-adding an address replaces the entry.
#[derive(Debug, Default)]
pub struct InMemoryAccountRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryAccountRegistry {
    pub fn accounts(&self) -> Result<Vec<AccountEntry>, PortError> {
        Ok(self.lock()?.accounts.clone())
    }

    pub fn get(&self, address: Address) -> Result<Option<AccountEntry>, PortError> {
        Ok(self
            .lock()?
            .accounts
            .iter()
            .find(|a| a.key_object.address == address)
            .cloned())
    }

    /// Number of `add_item` calls received, duplicates included.
    pub fn writes(&self) -> Result<usize, PortError> {
        Ok(self.lock()?.writes)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RegistryState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Storage(format!("registry lock poisoned: {e}")))
    }
}

impl AccountRegistryPort for InMemoryAccountRegistry {
    fn add_item(
        &self,
        should_persist: bool,
        key_object: &KeyObject,
        private_key: Option<B256>,
    ) -> Result<(), PortError> {
        self.lock()?.upsert(AccountEntry {
            key_object: key_object.clone(),
            persisted: should_persist,
            private_key,
        });
        Ok(())
    }
}

/// Writes persistent key objects to a JSON file. Session accounts and all
/// private keys stay in memory.
#[derive(Debug)]
pub struct JsonFileAccountRegistry {
    path: PathBuf,
    memory: InMemoryAccountRegistry,
}

impl JsonFileAccountRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            memory: InMemoryAccountRegistry::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn memory(&self) -> &InMemoryAccountRegistry {
        &self.memory
    }

    /// Key objects currently on disk; a missing file is an empty registry.
    pub fn load(&self) -> Result<Vec<KeyObject>, PortError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read(&self.path)
            .map_err(|e| PortError::Storage(format!("read {}: {e}", self.path.display())))?;
        serde_json::from_slice(&raw)
            .map_err(|e| PortError::Storage(format!("parse {}: {e}", self.path.display())))
    }

    fn persist(&self, key_object: &KeyObject) -> Result<(), PortError> {
        let mut stored = self.load()?;
        match stored.iter_mut().find(|k| k.address == key_object.address) {
            Some(existing) => *existing = key_object.clone(),
            None => stored.push(key_object.clone()),
        }

        let encoded = serde_json::to_vec_pretty(&stored)
            .map_err(|e| PortError::Storage(format!("encode registry: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded)
            .map_err(|e| PortError::Storage(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| PortError::Storage(format!("replace {}: {e}", self.path.display())))?;
        info!(address = %key_object.address, path = %self.path.display(), "account persisted");
        Ok(())
    }
}

impl AccountRegistryPort for JsonFileAccountRegistry {
    fn add_item(
        &self,
        should_persist: bool,
        key_object: &KeyObject,
        private_key: Option<B256>,
    ) -> Result<(), PortError> {
        if should_persist {
            self.persist(key_object)?;
        }
        self.memory.add_item(should_persist, key_object, private_key)
    }
}
