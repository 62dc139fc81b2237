use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;
use tokio::sync::Notify;

use wallet_import_core::{HardwareKind, HardwarePort, PortError};

/// One address query as seen by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareCall {
    pub kind: HardwareKind,
    pub chain_id: u64,
    pub hd_path: String,
}

#[derive(Debug, Default)]
struct ScriptState {
    responses: HashMap<HardwareKind, VecDeque<Result<Vec<Address>, String>>>,
    calls: Vec<HardwareCall>,
}

/// In-process stand-in for a USB device. Answers come from a queue per
/// device kind; an unscripted query answers with no addresses.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHardware {
    state: Arc<Mutex<ScriptState>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedHardware {
    /// Every query waits for a matching `release` before answering.
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::default()
        }
    }

    pub fn push_addresses(
        &self,
        kind: HardwareKind,
        addresses: Vec<Address>,
    ) -> Result<(), PortError> {
        self.push(kind, Ok(addresses))
    }

    pub fn push_failure(&self, kind: HardwareKind, reason: &str) -> Result<(), PortError> {
        self.push(kind, Err(reason.to_owned()))
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Result<Vec<HardwareCall>, PortError> {
        let g = self
            .state
            .lock()
            .map_err(|e| PortError::Device(format!("hardware lock poisoned: {e}")))?;
        Ok(g.calls.clone())
    }

    fn push(
        &self,
        kind: HardwareKind,
        response: Result<Vec<Address>, String>,
    ) -> Result<(), PortError> {
        let mut g = self
            .state
            .lock()
            .map_err(|e| PortError::Device(format!("hardware lock poisoned: {e}")))?;
        g.responses.entry(kind).or_default().push_back(response);
        Ok(())
    }
}

impl HardwarePort for ScriptedHardware {
    async fn addresses(
        &self,
        kind: HardwareKind,
        chain_id: u64,
        hd_path: &str,
    ) -> Result<Vec<Address>, PortError> {
        {
            let mut g = self
                .state
                .lock()
                .map_err(|e| PortError::Device(format!("hardware lock poisoned: {e}")))?;
            g.calls.push(HardwareCall {
                kind,
                chain_id,
                hd_path: hd_path.to_owned(),
            });
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let response = {
            let mut g = self
                .state
                .lock()
                .map_err(|e| PortError::Device(format!("hardware lock poisoned: {e}")))?;
            g.responses.get_mut(&kind).and_then(VecDeque::pop_front)
        };
        tracing::debug!(%kind, chain_id, hd_path, "hardware address query answered");
        match response {
            Some(Ok(addresses)) => Ok(addresses),
            Some(Err(reason)) => Err(PortError::Device(reason)),
            None => Ok(Vec::new()),
        }
    }
}
