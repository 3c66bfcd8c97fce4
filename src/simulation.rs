//! Simulation wiring and the control surface contract
//!
//! Starts the controller task plus one actor per device, all sharing one
//! cancellation token. Whatever drives the simulation (console, tests) only
//! needs the operations exposed here: toggle a mask, read history, read
//! status and shut down.

use crate::config::SimulationConfig;
use crate::controller::{
    ControllerHandle, ControllerState, ExecutionLogEntry, InterruptController, InterruptEvent,
};
use crate::device::{DeviceHandle, DeviceKind};
use crate::error::SimulationError;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Totals collected while joining every actor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub poll_cycles: u64,
    pub requests: Vec<(DeviceKind, u64)>,
    pub serviced: usize,
}

#[derive(Debug)]
pub struct Simulation {
    token: CancellationToken,
    controller_handle: ControllerHandle,
    controller: Arc<InterruptController>,
    devices: Vec<DeviceHandle>,
}

impl Simulation {
    pub fn start(config: &SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        info!("Starting interrupt simulation with config: {:?}", config);

        let token = CancellationToken::new();
        let controller_handle = ControllerHandle::spawn(
            Some(config.controller.clone()),
            config.event_capacity,
            token.child_token(),
        )?;
        let controller = controller_handle.controller();

        let mut devices = Vec::with_capacity(DeviceKind::COUNT);
        for kind in DeviceKind::DESCENDING_PRIORITY {
            let handle = DeviceHandle::spawn(
                kind,
                Arc::clone(&controller),
                config.devices.clone(),
                token.child_token(),
            );
            match handle {
                Ok(handle) => devices.push(handle),
                Err(e) => {
                    // Stop whatever already runs before reporting
                    token.cancel();
                    return Err(e);
                }
            }
        }

        Ok(Self {
            token,
            controller_handle,
            controller,
            devices,
        })
    }

    pub fn controller(&self) -> Arc<InterruptController> {
        Arc::clone(&self.controller)
    }

    /// Toggles the mask of the device at control panel index 1..=3
    pub async fn toggle(&self, index: u8) -> Result<bool, SimulationError> {
        let device = DeviceKind::from_index(index)?;
        Ok(self.controller.toggle_mask(device).await)
    }

    pub fn history(&self) -> Vec<ExecutionLogEntry> {
        self.controller.history_snapshot()
    }

    pub async fn status(&self) -> ControllerState {
        self.controller.status_snapshot().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InterruptEvent> {
        self.controller.subscribe()
    }

    /// Cancels every actor and waits for all of them to exit
    ///
    /// A running ISR finishes first, so its history entry is kept.
    pub async fn shutdown(mut self) -> Result<ShutdownReport, SimulationError> {
        info!("Shutdown requested, cancelling all actors");
        self.token.cancel();

        // Devices are joined even when the controller task failed
        let poll_cycles = self.controller_handle.join().await;
        if let Err(e) = &poll_cycles {
            warn!("Controller task failed, still joining devices: {}", e);
        }

        let mut report = ShutdownReport::default();
        for device in &mut self.devices {
            match device.join().await {
                Ok(requests) => report.requests.push((device.kind(), requests)),
                Err(e) => warn!("Failed to join {} device: {}", device.kind(), e),
            }
        }

        report.poll_cycles = poll_cycles?;
        report.serviced = self.controller.history_snapshot().len();
        info!(
            "Simulation stopped: {} poll cycles, {} ISRs serviced",
            report.poll_cycles, report.serviced
        );
        Ok(report)
    }
}
