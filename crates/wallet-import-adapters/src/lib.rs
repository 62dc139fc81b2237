pub mod clock;
pub mod config;
pub mod derivation;
pub mod hardware;
pub mod keystore;
pub mod registry;
pub mod reporter;

pub use clock::SystemClockAdapter;
pub use config::ImportAdapterConfig;
pub use derivation::LocalKeyDerivation;
pub use hardware::{HardwareCall, ScriptedHardware};
pub use keystore::Web3Keystore;
pub use registry::{AccountEntry, InMemoryAccountRegistry, JsonFileAccountRegistry};
pub use reporter::{ErrorReport, RecordingErrorReporter, TracingErrorReporter};
