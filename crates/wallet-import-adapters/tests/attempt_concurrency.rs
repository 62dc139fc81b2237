mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use wallet_import_adapters::{
    InMemoryAccountRegistry, LocalKeyDerivation, RecordingErrorReporter, ScriptedHardware,
    Web3Keystore,
};
use wallet_import_core::{
    HardwareKind, ImportAction, ImportConfig, ImportCoordinator, ImportOutcome, ImportState,
    ImportType, KeyObject, KeystorePort, PortError, SkipReason, StateTransition, Wallet,
};

use common::{
    build_coordinator, dev_address, dev_private_key, device_address, fast_keystore,
    with_hardware, TestClock, TestCoordinator, TEST_MNEMONIC, TEST_PRIVATE_KEY,
};

/// Keystore whose calls stay pending until released, one release per call.
#[derive(Debug, Clone)]
struct GatedKeystore {
    inner: Web3Keystore,
    gate: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl GatedKeystore {
    fn new() -> Self {
        Self {
            inner: fast_keystore(),
            gate: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release(&self) {
        self.gate.notify_one();
    }
}

impl KeystorePort for GatedKeystore {
    async fn encrypt(&self, wallet: &Wallet, password: &str) -> Result<KeyObject, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.inner.encrypt(wallet, password).await
    }

    async fn decrypt(&self, key_object: &KeyObject, password: &str) -> Result<Wallet, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.inner.decrypt(key_object, password).await
    }
}

type GatedCoordinator = ImportCoordinator<
    LocalKeyDerivation,
    GatedKeystore,
    ScriptedHardware,
    InMemoryAccountRegistry,
    RecordingErrorReporter,
    TestClock,
>;

fn gated_coordinator(import_type: ImportType) -> GatedCoordinator {
    let coordinator = ImportCoordinator::new(
        LocalKeyDerivation,
        GatedKeystore::new(),
        ScriptedHardware::gated(),
        InMemoryAccountRegistry::default(),
        RecordingErrorReporter::default(),
        TestClock::default(),
        ImportConfig::default(),
    );
    coordinator.set_import_type(import_type);
    coordinator.set_password("pw");
    match import_type {
        ImportType::MnemonicPhrase => coordinator.set_phrase(TEST_MNEMONIC),
        ImportType::BrainPhrase => coordinator.set_phrase("this is a sample phrase"),
        ImportType::PrivateKey => coordinator.set_private_key(TEST_PRIVATE_KEY),
        ImportType::JsonKeystore => {
            let wallet = Wallet {
                address: dev_address(),
                private_key: Some(dev_private_key()),
            };
            let document = fast_keystore()
                .encrypt_blocking(&wallet, "pw")
                .expect("encrypt dev wallet");
            coordinator.set_json_keystore(
                "UTC--dev.json",
                &serde_json::to_string(&document).expect("serialize keystore"),
            );
        }
        ImportType::Ledger | ImportType::Trezor => {
            let kind = import_type.hardware_kind().expect("hardware type");
            coordinator
                .hardware
                .push_addresses(kind, vec![device_address()])
                .expect("script device");
        }
        ImportType::NewKey => {}
    }
    coordinator
}

/// Provider calls made so far, whichever provider holds this type's attempt.
fn pending_calls(coordinator: &GatedCoordinator, import_type: ImportType) -> usize {
    if import_type.hardware_kind().is_some() {
        coordinator.hardware.calls().expect("calls").len()
    } else {
        coordinator.keystore.calls()
    }
}

async fn wait_until_busy(coordinator: &TestCoordinator) {
    while !coordinator.is_busy() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn second_start_while_busy_is_a_no_op() {
    let hardware = ScriptedHardware::gated();
    hardware
        .push_addresses(HardwareKind::Ledger, vec![device_address()])
        .expect("script device");
    let coordinator = with_hardware(hardware);
    coordinator.set_import_type(ImportType::Ledger);

    let (first, second) = tokio::join!(coordinator.start_import(), async {
        wait_until_busy(&coordinator).await;
        assert_eq!(
            coordinator.state(),
            ImportState::AwaitingHardware(HardwareKind::Ledger)
        );
        let outcome = coordinator.start_import().await;
        coordinator.hardware.release();
        outcome
    });

    assert_eq!(first, ImportOutcome::Completed(device_address()));
    assert_eq!(second, ImportOutcome::Skipped(SkipReason::Busy));
    assert_eq!(coordinator.hardware.calls().expect("calls").len(), 1);
    assert_eq!(coordinator.registry.writes().expect("writes"), 1);
}

#[tokio::test]
async fn busy_start_is_a_no_op_for_every_import_type() {
    for import_type in ImportType::ALL {
        let coordinator = gated_coordinator(import_type);

        let (first, second) = tokio::join!(coordinator.start_import(), async {
            while pending_calls(&coordinator, import_type) == 0 {
                tokio::task::yield_now().await;
            }
            let state = coordinator.state();
            let outcome = coordinator.start_import().await;
            assert_eq!(coordinator.state(), state, "{import_type}");
            assert_eq!(pending_calls(&coordinator, import_type), 1, "{import_type}");

            if import_type.hardware_kind().is_some() {
                coordinator.hardware.release();
            } else {
                coordinator.keystore.release();
            }
            outcome
        });

        assert!(
            matches!(first, ImportOutcome::Completed(_)),
            "{import_type}: {first:?}"
        );
        assert_eq!(second, ImportOutcome::Skipped(SkipReason::Busy), "{import_type}");
        assert_eq!(coordinator.registry.writes().expect("writes"), 1, "{import_type}");
        assert!(coordinator.errors.reports().expect("reports").is_empty());
    }
}

#[tokio::test]
async fn setters_stay_responsive_while_device_is_pending() {
    let hardware = ScriptedHardware::gated();
    hardware
        .push_addresses(HardwareKind::Trezor, vec![device_address()])
        .expect("script device");
    let coordinator = with_hardware(hardware);
    coordinator.set_import_type(ImportType::Trezor);

    let (outcome, ()) = tokio::join!(coordinator.start_import(), async {
        wait_until_busy(&coordinator).await;
        coordinator.set_display_name("typed while waiting");
        assert_eq!(coordinator.session().display_name, "typed while waiting");
        coordinator.hardware.release();
    });

    assert_eq!(outcome, ImportOutcome::Completed(device_address()));
    let key_object = coordinator
        .registry
        .get(device_address())
        .expect("registry readable")
        .expect("account registered")
        .key_object;
    // The name captured at start wins; the device label is used when it was blank.
    assert_eq!(key_object.name.as_deref(), Some("Trezor"));
}

#[tokio::test]
async fn cancelled_attempt_is_discarded() {
    let hardware = ScriptedHardware::gated();
    hardware
        .push_addresses(HardwareKind::Ledger, vec![device_address()])
        .expect("script device");
    let coordinator = with_hardware(hardware);
    coordinator.set_import_type(ImportType::Ledger);

    let (outcome, cancelled) = tokio::join!(coordinator.start_import(), async {
        wait_until_busy(&coordinator).await;
        let cancelled = coordinator.cancel();
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.state(), ImportState::Empty);
        coordinator.hardware.release();
        cancelled
    });

    assert!(cancelled);
    assert_eq!(outcome, ImportOutcome::Superseded);
    assert_eq!(coordinator.state(), ImportState::Empty);

    let last = *coordinator
        .transitions()
        .last()
        .expect("cancel recorded in transition log");
    assert_eq!(
        last,
        StateTransition {
            from: ImportState::AwaitingHardware(HardwareKind::Ledger),
            to: ImportState::Empty,
            action: ImportAction::Reset,
        }
    );
    assert_eq!(coordinator.registry.writes().expect("writes"), 0);
    assert!(coordinator.errors.reports().expect("reports").is_empty());
}

#[tokio::test]
async fn stale_device_answer_cannot_clobber_a_newer_import() {
    let hardware = ScriptedHardware::gated();
    hardware
        .push_addresses(HardwareKind::Ledger, vec![device_address()])
        .expect("script device");
    let coordinator = with_hardware(hardware);
    coordinator.set_import_type(ImportType::Ledger);

    let (stale, fresh) = tokio::join!(coordinator.start_import(), async {
        wait_until_busy(&coordinator).await;
        assert!(coordinator.cancel());

        coordinator.set_import_type(ImportType::PrivateKey);
        coordinator.set_private_key(TEST_PRIVATE_KEY);
        let fresh = coordinator.start_import().await;
        coordinator.hardware.release();
        fresh
    });

    assert_eq!(fresh, ImportOutcome::Completed(dev_address()));
    assert_eq!(stale, ImportOutcome::Superseded);
    assert_eq!(coordinator.state(), ImportState::Completed);
    assert_eq!(coordinator.address(), dev_address());

    let accounts = coordinator.registry.accounts().expect("accounts");
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].key_object.address, dev_address());
}

#[tokio::test]
async fn cancel_without_attempt_does_nothing() {
    let coordinator = with_hardware(ScriptedHardware::default());
    assert!(!coordinator.cancel());
    assert_eq!(coordinator.state(), ImportState::Empty);
}

#[tokio::test]
async fn unanswered_device_times_out_when_configured() {
    let coordinator = build_coordinator(
        ScriptedHardware::gated(),
        InMemoryAccountRegistry::default(),
        ImportConfig {
            hardware_timeout: Some(Duration::from_millis(50)),
            ..ImportConfig::default()
        },
    );
    coordinator.set_import_type(ImportType::Ledger);

    assert_eq!(coordinator.start_import().await, ImportOutcome::Failed);
    assert_eq!(coordinator.state(), ImportState::Error);
    assert!(!coordinator.is_busy());

    let reports = coordinator.errors.reports().expect("reports");
    assert_eq!(reports.len(), 1);
    assert!(reports[0].cause.contains("did not answer"));
}
