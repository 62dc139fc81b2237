use std::time::Duration;

use alloy::primitives::Address;
use thiserror::Error;

use crate::domain::HardwareKind;
use crate::ports::PortError;
use crate::state_machine::{ImportAction, ImportState};

/// Message key handed to the error reporter for every failed attempt.
pub const IMPORT_FAIL_KEY: &str = "import.errors.importFail";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Port(#[from] PortError),
    #[error("{}", .0.comms_error_key())]
    HardwareComms(HardwareKind),
    #[error("{kind} did not answer within {timeout:?}")]
    HardwareTimeout { kind: HardwareKind, timeout: Duration },
    #[error("invalid keystore json: {0}")]
    InvalidKeystore(String),
    #[error("keystore address mismatch: document {expected}, decrypted {actual}")]
    AddressMismatch { expected: Address, actual: Address },
    #[error("derived wallet carries no private key")]
    MissingPrivateKey,
    #[error("illegal import transition: {from:?} on {action:?}")]
    IllegalTransition {
        from: ImportState,
        action: ImportAction,
    },
    #[error("import attempt superseded")]
    Superseded,
}
