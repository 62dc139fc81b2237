//! wallet-import: headless account import into a local registry
//!
//! Usage: `wallet-import <bipPhrase|brainPhrase|privateKey|json|newKey>`

use std::env;

use eyre::{bail, eyre, WrapErr};

use wallet_import_adapters::{
    ImportAdapterConfig, JsonFileAccountRegistry, LocalKeyDerivation, ScriptedHardware,
    SystemClockAdapter, TracingErrorReporter, Web3Keystore,
};
use wallet_import_core::{
    ImportConfig, ImportCoordinator, ImportOutcome, ImportType, SkipReason, StorageMode,
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let import_type: ImportType = env::args()
        .nth(1)
        .ok_or_else(|| eyre!("usage: wallet-import <import type>"))?
        .parse::<ImportType>()
        .wrap_err("unknown import type")?;
    if import_type.hardware_kind().is_some() {
        bail!("{import_type} imports need a device transport, which this binary does not link");
    }

    let mut config = ImportConfig::from_env();
    if env::var("WALLET_IMPORT_PERSIST").is_ok_and(|v| v == "1") {
        config.storage_mode = StorageMode::Persistent;
    }
    let adapter_config = ImportAdapterConfig::from_env();

    tracing::info!(
        %import_type,
        chain_id = config.chain_id,
        storage = config.storage_mode.key(),
        registry = %adapter_config.registry_path.display(),
        "Starting wallet-import"
    );

    let coordinator = ImportCoordinator::new(
        LocalKeyDerivation,
        Web3Keystore::with_config(&adapter_config),
        ScriptedHardware::default(),
        JsonFileAccountRegistry::new(adapter_config.registry_path.clone()),
        TracingErrorReporter,
        SystemClockAdapter,
        config,
    );
    coordinator.set_import_type(import_type);

    let secret = env::var("WALLET_IMPORT_SECRET").unwrap_or_default();
    match import_type {
        ImportType::MnemonicPhrase | ImportType::BrainPhrase => coordinator.set_phrase(&secret),
        ImportType::PrivateKey => coordinator.set_private_key(secret.trim()),
        ImportType::JsonKeystore => {
            let text = std::fs::read_to_string(&secret)
                .wrap_err_with(|| format!("reading keystore {secret}"))?;
            coordinator.set_json_keystore(&secret, &text);
        }
        _ => {}
    }
    if let Ok(password) = env::var("WALLET_IMPORT_PASSWORD") {
        coordinator.set_password(&password);
    }
    if let Ok(name) = env::var("WALLET_IMPORT_NAME") {
        coordinator.set_display_name(&name);
    }

    let gates = coordinator.gates();
    match coordinator.start_import().await {
        ImportOutcome::Completed(address) => {
            println!("{}", address.to_checksum(None));
            Ok(())
        }
        ImportOutcome::Skipped(SkipReason::Blocked) => bail!("import input rejected: {gates:?}"),
        ImportOutcome::Skipped(SkipReason::Busy) | ImportOutcome::Superseded => {
            bail!("import did not run to completion")
        }
        ImportOutcome::Failed => bail!("import failed, see log for the cause"),
    }
}
