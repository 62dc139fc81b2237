use std::sync::{Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, B256};
use tracing::{debug, info, warn};

use crate::config::ImportConfig;
use crate::domain::{
    HardwareKind, ImportOutcome, ImportRequest, ImportStamp, ImportType, KeyObject, PathType,
    SessionState, SkipReason, StorageMode, TimestampMs, Wallet,
};
use crate::error::{ImportError, IMPORT_FAIL_KEY};
use crate::hdpath::{ledger_hd_path, trezor_hd_path};
use crate::ports::{
    AccountRegistryPort, ClockPort, ErrorReporterPort, HardwarePort, KeyDerivationPort,
    KeystorePort,
};
use crate::state_machine::{
    import_transition, initial_action, ImportAction, ImportState, StateTransition,
};
use crate::validation::ValidationGates;

#[derive(Debug, Default)]
struct Session {
    fields: SessionState,
    generation: u64,
    transitions: Vec<StateTransition>,
}

impl Session {
    fn apply(&mut self, action: ImportAction) -> Result<(), ImportError> {
        let (next, transition) = import_transition(self.fields.state, action)?;
        debug!(from = ?transition.from, to = ?transition.to, "import transition");
        self.fields.state = next;
        self.transitions.push(transition);
        Ok(())
    }

    fn reset(&mut self) {
        if let Err(error) = self.apply(ImportAction::Reset) {
            warn!(%error, "reset rejected, forcing empty state");
            self.fields.state = ImportState::Empty;
        }
    }
}

/// Selections captured alongside the request when an attempt starts.
#[derive(Debug)]
struct Attempt {
    generation: u64,
    should_persist: bool,
    display_name: String,
}

/// Owns the import screen's session and runs one import pipeline at a time.
///
/// Setters and queries never block on an attempt in flight: the session lock
/// is only held between awaits.
pub struct ImportCoordinator<D, K, H, R, E, C>
where
    D: KeyDerivationPort,
    K: KeystorePort,
    H: HardwarePort,
    R: AccountRegistryPort,
    E: ErrorReporterPort,
    C: ClockPort,
{
    pub derivation: D,
    pub keystore: K,
    pub hardware: H,
    pub registry: R,
    pub errors: E,
    pub clock: C,
    config: ImportConfig,
    session: Mutex<Session>,
}

impl<D, K, H, R, E, C> ImportCoordinator<D, K, H, R, E, C>
where
    D: KeyDerivationPort,
    K: KeystorePort,
    H: HardwarePort,
    R: AccountRegistryPort,
    E: ErrorReporterPort,
    C: ClockPort,
{
    pub fn new(
        derivation: D,
        keystore: K,
        hardware: H,
        registry: R,
        errors: E,
        clock: C,
        config: ImportConfig,
    ) -> Self {
        let fields = SessionState {
            storage_mode: config.storage_mode,
            chain_id: config.chain_id,
            ..SessionState::default()
        };
        Self {
            derivation,
            keystore,
            hardware,
            registry,
            errors,
            clock,
            config,
            session: Mutex::new(Session {
                fields,
                ..Session::default()
            }),
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_current(&self, generation: u64) -> Result<MutexGuard<'_, Session>, ImportError> {
        let session = self.lock();
        if session.generation != generation {
            return Err(ImportError::Superseded);
        }
        Ok(session)
    }

    // ---- setters ----

    pub fn set_import_type(&self, import_type: ImportType) {
        let mut session = self.lock();
        if session.fields.import_type != import_type {
            session.fields.clear_transient();
            session.fields.import_type = import_type;
        }
    }

    pub fn set_storage_mode(&self, storage_mode: StorageMode) {
        let mut session = self.lock();
        if session.fields.storage_mode != storage_mode {
            session.fields.clear_transient();
            session.fields.storage_mode = storage_mode;
        }
    }

    pub fn set_derivation_path_type(&self, path_type: PathType) {
        self.lock().fields.path_type = path_type;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.lock().fields.chain_id = chain_id;
    }

    pub fn set_phrase(&self, phrase: &str) {
        self.lock().fields.phrase = phrase.to_lowercase();
    }

    pub fn set_private_key(&self, private_key: &str) {
        self.lock().fields.private_key = private_key.to_owned();
    }

    pub fn set_password(&self, password: &str) {
        self.lock().fields.password = password.to_owned();
    }

    pub fn set_json_keystore(&self, filename: &str, text: &str) {
        let mut session = self.lock();
        session.fields.json_filename = filename.to_owned();
        session.fields.json_keystore = text.to_owned();
    }

    pub fn set_display_name(&self, name: &str) {
        self.lock().fields.display_name = name.to_owned();
    }

    // ---- queries ----

    pub fn session(&self) -> SessionState {
        self.lock().fields.clone()
    }

    pub fn state(&self) -> ImportState {
        self.lock().fields.state
    }

    pub fn is_busy(&self) -> bool {
        self.lock().fields.busy
    }

    /// Transitions taken by the most recent attempt, oldest first.
    pub fn transitions(&self) -> Vec<StateTransition> {
        self.lock().transitions.clone()
    }

    pub fn gates(&self) -> ValidationGates {
        let session = self.lock();
        ValidationGates::evaluate(&session.fields, |p| self.derivation.is_mnemonic_valid(p))
    }

    pub fn has_blocking_error(&self) -> bool {
        self.gates().has_blocking_error()
    }

    pub fn hd_path(&self) -> String {
        let session = self.lock();
        hd_path_for(session.fields.path_type, session.fields.chain_id)
    }

    /// Derived address, or the zero address before anything was derived.
    pub fn address(&self) -> Address {
        self.lock()
            .fields
            .wallet
            .as_ref()
            .map(|w| w.address)
            .unwrap_or(Address::ZERO)
    }

    pub fn is_generated(&self) -> bool {
        let session = self.lock();
        let has_key = session
            .fields
            .wallet
            .as_ref()
            .is_some_and(|w| w.private_key.is_some());
        has_key && session.fields.key_object.is_some()
    }

    pub fn key_object(&self) -> Option<KeyObject> {
        self.lock().fields.key_object.clone()
    }

    // ---- actions ----

    /// Puts the lifecycle back to `Empty`. Ignored while an attempt runs.
    pub fn clear_state(&self) {
        let mut session = self.lock();
        if !session.fields.busy && session.fields.state != ImportState::Empty {
            session.reset();
        }
    }

    /// Abandons the attempt in flight. Its provider call is left to finish on
    /// its own and whatever it returns is discarded.
    pub fn cancel(&self) -> bool {
        let mut session = self.lock();
        if !session.fields.busy {
            return false;
        }
        session.generation = session.generation.saturating_add(1);
        session.fields.busy = false;
        session.reset();
        info!("account import cancelled");
        true
    }

    pub async fn start_import(&self) -> ImportOutcome {
        let (attempt, request) = {
            let mut session = self.lock();
            if session.fields.busy {
                debug!("import already in flight, ignoring");
                return ImportOutcome::Skipped(SkipReason::Busy);
            }
            let gates =
                ValidationGates::evaluate(&session.fields, |p| self.derivation.is_mnemonic_valid(p));
            if gates.has_blocking_error() {
                return ImportOutcome::Skipped(SkipReason::Blocked);
            }

            let request = build_request(&session.fields);
            session.generation = session.generation.saturating_add(1);
            session.fields.busy = true;
            session.transitions.clear();
            let attempt = Attempt {
                generation: session.generation,
                should_persist: session.fields.storage_mode.should_persist(),
                display_name: session.fields.display_name.clone(),
            };
            (attempt, request)
        };

        info!(import_type = %request.import_type(), "account import started");
        let result = self.run_pipeline(&attempt, request).await;
        self.settle(&attempt, result)
    }

    fn settle(&self, attempt: &Attempt, result: Result<Address, ImportError>) -> ImportOutcome {
        let mut session = self.lock();
        if session.generation != attempt.generation {
            debug!("discarding result of superseded import");
            return ImportOutcome::Superseded;
        }

        match result.and_then(|address| session.apply(ImportAction::Complete).map(|()| address)) {
            Ok(address) => {
                session.fields.clear_transient();
                session.fields.busy = false;
                info!(%address, "account import completed");
                ImportOutcome::Completed(address)
            }
            Err(error) => {
                if session.apply(ImportAction::Fail).is_err() {
                    session.fields.state = ImportState::Error;
                }
                session.fields.busy = false;
                drop(session);
                warn!(%error, "account import failed");
                self.errors.add_error(IMPORT_FAIL_KEY, &error);
                ImportOutcome::Failed
            }
        }
    }

    fn advance(&self, attempt: &Attempt, action: ImportAction) -> Result<(), ImportError> {
        self.lock_current(attempt.generation)?.apply(action)
    }

    async fn run_pipeline(
        &self,
        attempt: &Attempt,
        request: ImportRequest,
    ) -> Result<Address, ImportError> {
        self.advance(attempt, initial_action(request.import_type()))?;

        match request {
            ImportRequest::Mnemonic {
                phrase,
                hd_path,
                password,
            } => {
                let wallet = self
                    .derivation
                    .wallet_from_mnemonic(&phrase, &hd_path)
                    .await?;
                self.add_from_wallet(attempt, wallet, &password).await
            }
            ImportRequest::BrainPhrase { phrase, password } => {
                let wallet = self.derivation.wallet_from_phrase(&phrase).await?;
                self.add_from_wallet(attempt, wallet, &password).await
            }
            ImportRequest::PrivateKey {
                private_key,
                password,
            } => {
                let wallet = self
                    .derivation
                    .wallet_from_private_key(&private_key)
                    .await?;
                self.add_from_wallet(attempt, wallet, &password).await
            }
            ImportRequest::NewKey { password } => {
                let wallet = self.derivation.generate_wallet().await?;
                self.encrypt_and_register(attempt, wallet, &password).await
            }
            ImportRequest::JsonKeystore {
                keystore_json,
                password,
            } => self.import_keystore(attempt, &keystore_json, &password).await,
            ImportRequest::Ledger { chain_id, hd_path } => {
                self.import_hardware(attempt, HardwareKind::Ledger, chain_id, &hd_path)
                    .await
            }
            ImportRequest::Trezor { chain_id, hd_path } => {
                self.import_hardware(attempt, HardwareKind::Trezor, chain_id, &hd_path)
                    .await
            }
        }
    }

    async fn add_from_wallet(
        &self,
        attempt: &Attempt,
        wallet: Wallet,
        password: &str,
    ) -> Result<Address, ImportError> {
        self.advance(attempt, ImportAction::EncryptKey)?;
        self.encrypt_and_register(attempt, wallet, password).await
    }

    async fn encrypt_and_register(
        &self,
        attempt: &Attempt,
        wallet: Wallet,
        password: &str,
    ) -> Result<Address, ImportError> {
        let private_key = wallet.private_key.ok_or(ImportError::MissingPrivateKey)?;
        self.lock_current(attempt.generation)?.fields.wallet = Some(wallet.clone());
        let key_object = self.keystore.encrypt(&wallet, password).await?;
        self.register(attempt, key_object, Some(private_key))
    }

    async fn import_keystore(
        &self,
        attempt: &Attempt,
        keystore_json: &str,
        password: &str,
    ) -> Result<Address, ImportError> {
        let key_object: KeyObject = serde_json::from_str(keystore_json)
            .map_err(|e| ImportError::InvalidKeystore(e.to_string()))?;
        {
            let mut session = self.lock_current(attempt.generation)?;
            session.fields.wallet = Some(Wallet::watch_only(key_object.address));
            session.fields.key_object = Some(key_object.clone());
        }

        let wallet = self.keystore.decrypt(&key_object, password).await?;
        if wallet.address != key_object.address {
            return Err(ImportError::AddressMismatch {
                expected: key_object.address,
                actual: wallet.address,
            });
        }
        let private_key = wallet.private_key.ok_or(ImportError::MissingPrivateKey)?;
        self.lock_current(attempt.generation)?.fields.wallet = Some(wallet);
        self.register(attempt, key_object, Some(private_key))
    }

    async fn import_hardware(
        &self,
        attempt: &Attempt,
        kind: HardwareKind,
        chain_id: u64,
        hd_path: &str,
    ) -> Result<Address, ImportError> {
        let query = self.hardware.addresses(kind, chain_id, hd_path);
        let addresses = match self.config.hardware_timeout {
            Some(timeout) => tokio::time::timeout(timeout, query)
                .await
                .map_err(|_| ImportError::HardwareTimeout { kind, timeout })??,
            None => query.await?,
        };

        let address = addresses
            .into_iter()
            .next()
            .filter(|a| !a.is_zero())
            .ok_or(ImportError::HardwareComms(kind))?;
        self.register(attempt, KeyObject::hardware(kind, address), None)
    }

    /// Stamps the key object and hands it to the registry. The session lock is
    /// held across the write so a cancel cannot interleave with it.
    ///
    /// The registry call is synchronous and runs on the calling task; a
    /// file-backed registry blocks the executor thread for one write and
    /// rename, and setters wait on the lock until it returns.
    fn register(
        &self,
        attempt: &Attempt,
        mut key_object: KeyObject,
        private_key: Option<B256>,
    ) -> Result<Address, ImportError> {
        let now = TimestampMs(self.clock.now_ms()?);
        let mut session = self.lock_current(attempt.generation)?;
        session.apply(ImportAction::AddAccount)?;

        if !attempt.display_name.is_empty() {
            key_object.name = Some(attempt.display_name.clone());
        }
        key_object.meta.the_block = Some(ImportStamp { imported_at: now });
        let address = key_object.address;
        if session.fields.wallet.as_ref().map(|w| w.address) != Some(address) {
            session.fields.wallet = Some(Wallet::watch_only(address));
        }

        self.registry
            .add_item(attempt.should_persist, &key_object, private_key)?;
        session.fields.key_object = Some(key_object);
        Ok(address)
    }
}

fn hd_path_for(path_type: PathType, chain_id: u64) -> String {
    match path_type {
        // TODO: confirm with product whether a Trezor selection should derive
        // along trezor_hd_path; both selections have always resolved to the
        // Ledger path.
        PathType::Ledger | PathType::Trezor => ledger_hd_path(chain_id),
    }
}

fn build_request(fields: &SessionState) -> ImportRequest {
    let password = fields.password.clone();
    match fields.import_type {
        ImportType::MnemonicPhrase => ImportRequest::Mnemonic {
            phrase: fields.phrase.clone(),
            hd_path: hd_path_for(fields.path_type, fields.chain_id),
            password,
        },
        ImportType::BrainPhrase => ImportRequest::BrainPhrase {
            phrase: fields.phrase.clone(),
            password,
        },
        ImportType::PrivateKey => ImportRequest::PrivateKey {
            private_key: fields.private_key.clone(),
            password,
        },
        ImportType::NewKey => ImportRequest::NewKey { password },
        ImportType::JsonKeystore => ImportRequest::JsonKeystore {
            keystore_json: fields.json_keystore.clone(),
            password,
        },
        ImportType::Ledger => ImportRequest::Ledger {
            chain_id: fields.chain_id,
            hd_path: ledger_hd_path(fields.chain_id),
        },
        ImportType::Trezor => ImportRequest::Trezor {
            chain_id: fields.chain_id,
            hd_path: trezor_hd_path(fields.chain_id),
        },
    }
}
