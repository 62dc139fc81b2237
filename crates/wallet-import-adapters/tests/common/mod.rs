#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, B256};

use wallet_import_adapters::{
    ImportAdapterConfig, InMemoryAccountRegistry, LocalKeyDerivation, RecordingErrorReporter,
    ScriptedHardware, Web3Keystore,
};
use wallet_import_core::{
    AccountRegistryPort, ClockPort, ImportConfig, ImportCoordinator, PortError,
};

pub const START_MS: u64 = 1_739_750_400_000;

pub const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + START_MS)
    }
}

pub type Coordinator<R> = ImportCoordinator<
    LocalKeyDerivation,
    Web3Keystore,
    ScriptedHardware,
    R,
    RecordingErrorReporter,
    TestClock,
>;

pub type TestCoordinator = Coordinator<InMemoryAccountRegistry>;

pub fn fast_keystore() -> Web3Keystore {
    Web3Keystore::with_config(&ImportAdapterConfig::insecure_fast())
}

pub fn build_coordinator<R: AccountRegistryPort>(
    hardware: ScriptedHardware,
    registry: R,
    config: ImportConfig,
) -> Coordinator<R> {
    ImportCoordinator::new(
        LocalKeyDerivation,
        fast_keystore(),
        hardware,
        registry,
        RecordingErrorReporter::default(),
        TestClock::default(),
        config,
    )
}

pub fn new_coordinator() -> TestCoordinator {
    build_coordinator(
        ScriptedHardware::default(),
        InMemoryAccountRegistry::default(),
        ImportConfig::default(),
    )
}

pub fn with_hardware(hardware: ScriptedHardware) -> TestCoordinator {
    build_coordinator(
        hardware,
        InMemoryAccountRegistry::default(),
        ImportConfig::default(),
    )
}

/// First account of the well-known development mnemonic.
pub fn dev_address() -> Address {
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        .parse()
        .expect("valid dev address")
}

pub fn dev_private_key() -> B256 {
    TEST_PRIVATE_KEY.parse().expect("valid dev private key")
}

pub fn device_address() -> Address {
    "0x000000000000000000000000000000000000beef"
        .parse()
        .expect("valid device address")
}
