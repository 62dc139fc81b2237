use crate::domain::{HardwareKind, ImportType};
use crate::error::ImportError;

/// Lifecycle of the import screen, surfaced to the UI for progress feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportState {
    #[default]
    Empty,
    DerivingWallet,
    EncryptingKey,
    DecodingKeystore,
    AwaitingHardware(HardwareKind),
    AddingAccount,
    Completed,
    Error,
}

impl ImportState {
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            ImportState::DerivingWallet
                | ImportState::EncryptingKey
                | ImportState::DecodingKeystore
                | ImportState::AwaitingHardware(_)
                | ImportState::AddingAccount
        )
    }

    pub fn is_idle(self) -> bool {
        matches!(
            self,
            ImportState::Empty | ImportState::Completed | ImportState::Error
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    DeriveWallet,
    EncryptKey,
    DecodeKeystore,
    ContactHardware(HardwareKind),
    AddAccount,
    Complete,
    Fail,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    pub from: ImportState,
    pub to: ImportState,
    pub action: ImportAction,
}

/// First substate entered by each pipeline.
pub fn initial_action(import_type: ImportType) -> ImportAction {
    match import_type {
        ImportType::MnemonicPhrase | ImportType::BrainPhrase | ImportType::PrivateKey => {
            ImportAction::DeriveWallet
        }
        ImportType::NewKey => ImportAction::EncryptKey,
        ImportType::JsonKeystore => ImportAction::DecodeKeystore,
        ImportType::Ledger => ImportAction::ContactHardware(HardwareKind::Ledger),
        ImportType::Trezor => ImportAction::ContactHardware(HardwareKind::Trezor),
    }
}

pub fn import_transition(
    state: ImportState,
    action: ImportAction,
) -> Result<(ImportState, StateTransition), ImportError> {
    use ImportAction as A;
    use ImportState as S;

    let next = match (state, action) {
        (s, A::DeriveWallet) if s.is_idle() => S::DerivingWallet,
        (S::DerivingWallet, A::EncryptKey) => S::EncryptingKey,
        (s, A::EncryptKey) if s.is_idle() => S::EncryptingKey,
        (s, A::DecodeKeystore) if s.is_idle() => S::DecodingKeystore,
        (s, A::ContactHardware(kind)) if s.is_idle() => S::AwaitingHardware(kind),
        (S::EncryptingKey | S::DecodingKeystore | S::AwaitingHardware(_), A::AddAccount) => {
            S::AddingAccount
        }
        (S::AddingAccount, A::Complete) => S::Completed,
        (s, A::Fail) if s.is_in_flight() => S::Error,
        (_, A::Reset) => S::Empty,
        (from, action) => return Err(ImportError::IllegalTransition { from, action }),
    };

    Ok((
        next,
        StateTransition {
            from: state,
            to: next,
            action,
        },
    ))
}
