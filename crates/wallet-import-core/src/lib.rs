pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod hdpath;
pub mod ports;
pub mod state_machine;
pub mod validation;

pub use config::ImportConfig;
pub use coordinator::ImportCoordinator;
pub use domain::{
    HardwareKind, HardwareMeta, ImportOutcome, ImportRequest, ImportStamp, ImportType, KeyMeta,
    KeyObject, PathType, SessionState, SkipReason, StorageMode, TimestampMs, UnknownKey, Wallet,
};
pub use error::{ImportError, IMPORT_FAIL_KEY};
pub use ports::{
    AccountRegistryPort, ClockPort, ErrorReporterPort, HardwarePort, KeyDerivationPort,
    KeystorePort, PortError,
};
pub use state_machine::{
    import_transition, initial_action, ImportAction, ImportState, StateTransition,
};
pub use validation::ValidationGates;
