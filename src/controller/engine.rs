//! Poll loop with statum state machine for the controller task
//!
//! ```text
//! Configured ──► Running ──► Stopped
//!                   │
//!            (cancellation token)
//! ```
//!
//! The running engine polls the controller, then idles for the poll interval.
//! Only the idle wait observes cancellation: a cycle that is dispatching an
//! ISR always runs to completion, so shutdown never leaves the state lock held
//! or drops a finished history entry.

use super::interrupt_controller::InterruptController;
use super::isr::IsrExecutor;
use crate::error::SimulationError;
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Timing for the controller task
///
/// # Examples
///
/// ```rust
/// use irqsim::controller::ControllerSettings;
///
/// // Faster cadence for demos
/// let settings = ControllerSettings {
///     poll_interval_ms: 50,
///     isr_duration_ms: 500,
/// };
/// assert_ne!(settings, ControllerSettings::default());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Idle time between two poll cycles
    pub poll_interval_ms: u64,

    /// Simulated service time of one ISR, spent holding the state lock
    pub isr_duration_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            isr_duration_ms: 1500,
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum PollEngineState {
    Configured, // Controller attached, loop not started
    Running,    // Polling until cancelled
    Stopped,    // Loop exited
}

#[machine]
#[derive(Debug)]
pub struct PollEngine<S: PollEngineState> {
    controller: Arc<InterruptController>,
    poll_interval: Duration,
    cycles: u64,
}

impl<S: PollEngineState> PollEngine<S> {
    /// Number of completed poll cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl PollEngine<Configured> {
    pub fn create(controller: Arc<InterruptController>, poll_interval: Duration) -> Self {
        debug!("Configuring poll engine with interval {:?}", poll_interval);
        Self::new(controller, poll_interval, 0)
    }

    pub fn activate(self) -> PollEngine<Running> {
        info!("Activating interrupt controller poll loop");
        self.transition()
    }
}

impl PollEngine<Running> {
    /// Polls until `token` is cancelled
    pub async fn run_until_cancelled(mut self, token: CancellationToken) -> PollEngine<Stopped> {
        info!(
            "Starting poll loop ({}ms interval)",
            self.poll_interval.as_millis()
        );

        while !token.is_cancelled() {
            let outcome = self.controller.poll_once().await;
            self.cycles += 1;
            if !outcome.is_idle() {
                debug!("Cycle {} outcome: {:?}", self.cycles, outcome);
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("Interrupt Controller shutting down after {} cycles", self.cycles);
        self.transition()
    }
}

/// Handle for the controller task
///
/// Owns the shared [`InterruptController`] and the poll loop's join handle.
/// Device actors and the control surface talk to the controller through
/// [`ControllerHandle::controller`].
#[derive(Debug)]
pub struct ControllerHandle {
    controller: Arc<InterruptController>,
    task_handle: Option<JoinHandle<u64>>,
}

impl ControllerHandle {
    /// Builds the controller and spawns its poll loop
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidConfig`] if the poll interval is zero.
    pub fn spawn(
        settings: Option<ControllerSettings>,
        event_capacity: usize,
        token: CancellationToken,
    ) -> Result<Self, SimulationError> {
        let settings = settings.unwrap_or_default();
        info!("Spawning interrupt controller with settings: {:?}", settings);

        if settings.poll_interval_ms == 0 {
            return Err(SimulationError::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        let isr = IsrExecutor::new(Duration::from_millis(settings.isr_duration_ms));
        let controller = Arc::new(InterruptController::new(isr, event_capacity));

        let engine = PollEngine::create(
            Arc::clone(&controller),
            Duration::from_millis(settings.poll_interval_ms),
        )
        .activate();

        let task_handle = tokio::spawn(async move {
            let stopped = engine.run_until_cancelled(token).await;
            stopped.cycles()
        });

        Ok(Self {
            controller,
            task_handle: Some(task_handle),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_task(
        controller: Arc<InterruptController>,
        task_handle: JoinHandle<u64>,
    ) -> Self {
        Self {
            controller,
            task_handle: Some(task_handle),
        }
    }

    pub fn controller(&self) -> Arc<InterruptController> {
        Arc::clone(&self.controller)
    }

    /// Waits for the poll loop to exit, returning its cycle count
    ///
    /// Cancel the token passed to [`ControllerHandle::spawn`] first.
    pub async fn join(&mut self) -> Result<u64, SimulationError> {
        match self.task_handle.take() {
            Some(handle) => match handle.await {
                Ok(cycles) => {
                    debug!("Controller task completed after {} cycles", cycles);
                    Ok(cycles)
                }
                Err(e) => {
                    error!("Controller task panicked: {}", e);
                    Err(SimulationError::TaskJoin(format!(
                        "controller task failed: {}",
                        e
                    )))
                }
            },
            None => {
                debug!("Controller task already joined");
                Ok(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceKind;

    fn fast_settings() -> ControllerSettings {
        ControllerSettings {
            poll_interval_ms: 5,
            isr_duration_ms: 10,
        }
    }

    #[tokio::test]
    async fn loop_dispatches_pending_requests() {
        let token = CancellationToken::new();
        let mut handle = ControllerHandle::spawn(Some(fast_settings()), 32, token.clone()).unwrap();
        let controller = handle.controller();

        // Keyboard first: the loop may already poll between the two requests
        controller.request_interrupt(DeviceKind::Keyboard).await;
        controller.request_interrupt(DeviceKind::Printer).await;

        let mut history = controller.subscribe_history();
        tokio::time::timeout(
            Duration::from_secs(2),
            history.wait_for(|log| log.len() == 2),
        )
        .await
        .unwrap()
        .unwrap();

        token.cancel();
        let cycles = handle.join().await.unwrap();
        assert!(cycles >= 2);

        let order: Vec<DeviceKind> = controller
            .history_snapshot()
            .iter()
            .map(|entry| entry.device)
            .collect();
        assert_eq!(order, vec![DeviceKind::Keyboard, DeviceKind::Printer]);
    }

    #[tokio::test]
    async fn cancellation_waits_for_running_isr() {
        let token = CancellationToken::new();
        let settings = ControllerSettings {
            poll_interval_ms: 5,
            isr_duration_ms: 120,
        };
        let mut handle = ControllerHandle::spawn(Some(settings), 32, token.clone()).unwrap();
        let controller = handle.controller();
        let mut events = controller.subscribe();

        controller.request_interrupt(DeviceKind::Mouse).await;
        loop {
            let event = events.recv().await.unwrap();
            if matches!(event, crate::controller::InterruptEvent::IsrTriggered { .. }) {
                break;
            }
        }

        token.cancel();
        handle.join().await.unwrap();

        assert_eq!(controller.history_snapshot().len(), 1);
        // The lock was released on exit
        let status = tokio::time::timeout(Duration::from_millis(100), controller.status_snapshot())
            .await
            .unwrap();
        assert!(!status.pending[DeviceKind::Mouse]);
    }

    #[tokio::test]
    async fn zero_poll_interval_is_rejected() {
        let settings = ControllerSettings {
            poll_interval_ms: 0,
            isr_duration_ms: 10,
        };
        let result = ControllerHandle::spawn(Some(settings), 8, CancellationToken::new());
        assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn join_twice_is_harmless() {
        let token = CancellationToken::new();
        let mut handle = ControllerHandle::spawn(Some(fast_settings()), 8, token.clone()).unwrap();
        token.cancel();
        handle.join().await.unwrap();
        assert_eq!(handle.join().await.unwrap(), 0);
    }
}
