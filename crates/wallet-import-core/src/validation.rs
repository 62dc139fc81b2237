//! Validation gates for the import form
//!
//! Gates are recomputed from the session on every read, never cached.

use serde_json::Value;

use crate::domain::{ImportType, SessionState};

/// `0x` + 64 hex digits.
pub const PRIVATE_KEY_LEN: usize = 66;
pub const KEYSTORE_ADDRESS_LEN: usize = 40;

/// `0x`-prefixed hex with an even number of digits.
pub fn is_hex_valid(value: &str) -> bool {
    match value.strip_prefix("0x") {
        Some(digits) => digits.len() % 2 == 0 && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

pub fn is_private_key_invalid(private_key: &str) -> bool {
    private_key.len() != PRIVATE_KEY_LEN || !is_hex_valid(private_key)
}

/// True unless the text is a JSON object whose `address` is 40 hex digits.
pub fn is_keystore_json_invalid(text: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return true;
    };
    match value.get("address").and_then(Value::as_str) {
        Some(address) => {
            address.len() != KEYSTORE_ADDRESS_LEN
                || !address.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => true,
    }
}

pub fn is_hardware(import_type: ImportType) -> bool {
    import_type.hardware_kind().is_some()
}

pub fn password_required(session: &SessionState) -> bool {
    session.storage_mode.should_persist()
        && !matches!(
            session.import_type,
            ImportType::JsonKeystore | ImportType::Ledger | ImportType::Trezor
        )
}

pub fn phrase_required(import_type: ImportType) -> bool {
    matches!(
        import_type,
        ImportType::MnemonicPhrase | ImportType::BrainPhrase
    )
}

pub fn should_show_password(import_type: ImportType) -> bool {
    !is_hardware(import_type)
}

pub fn should_show_path(import_type: ImportType) -> bool {
    import_type == ImportType::MnemonicPhrase
}

/// Snapshot of every gate for one session state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationGates {
    pub password_required: bool,
    pub phrase_required: bool,
    pub private_key_required: bool,
    pub json_required: bool,
    pub empty_password: bool,
    pub invalid_phrase: bool,
    pub invalid_private_key: bool,
    pub json_error: bool,
}

impl ValidationGates {
    /// `is_mnemonic_valid` backs the checksum check applied to BIP-39 phrases.
    pub fn evaluate(session: &SessionState, is_mnemonic_valid: impl Fn(&str) -> bool) -> Self {
        let import_type = session.import_type;
        let blank_phrase = session.phrase.trim().is_empty();
        Self {
            password_required: password_required(session),
            phrase_required: phrase_required(import_type),
            private_key_required: import_type == ImportType::PrivateKey,
            json_required: import_type == ImportType::JsonKeystore,
            empty_password: session.password.is_empty(),
            invalid_phrase: blank_phrase
                || (import_type == ImportType::MnemonicPhrase
                    && !is_mnemonic_valid(&session.phrase)),
            invalid_private_key: is_private_key_invalid(&session.private_key),
            json_error: is_keystore_json_invalid(&session.json_keystore),
        }
    }

    pub fn password_blocking(&self) -> bool {
        self.password_required && self.empty_password
    }

    pub fn phrase_blocking(&self) -> bool {
        self.phrase_required && self.invalid_phrase
    }

    pub fn private_key_blocking(&self) -> bool {
        self.private_key_required && self.invalid_private_key
    }

    pub fn json_blocking(&self) -> bool {
        self.json_required && self.json_error
    }

    pub fn has_blocking_error(&self) -> bool {
        self.password_blocking()
            || self.phrase_blocking()
            || self.private_key_blocking()
            || self.json_blocking()
    }
}
