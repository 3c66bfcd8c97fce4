//! Simulated interrupt service routine
//!
//! The executor runs while the controller's state lock is held, which makes it
//! the single point of serialization: one ISR at a time, system-wide.

use super::events::{EventSink, ExecutionLogEntry, InterruptEvent};
use super::interrupt_controller::ControllerState;
use crate::device::DeviceKind;
use chrono::Local;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct IsrExecutor {
    service_duration: Duration,
}

impl IsrExecutor {
    pub fn new(service_duration: Duration) -> Self {
        Self { service_duration }
    }

    pub fn service_duration(&self) -> Duration {
        self.service_duration
    }

    /// Services one request for `device`
    ///
    /// `state` is borrowed from the controller's lock guard, so the hold below
    /// keeps the critical section closed. Clears the device's pending flag once
    /// the routine completes.
    pub async fn execute(
        &self,
        device: DeviceKind,
        state: &mut ControllerState,
        events: &EventSink,
    ) -> ExecutionLogEntry {
        let started_at = Local::now();
        info!("ISR started for {}", device);
        events.emit(InterruptEvent::IsrTriggered {
            device,
            timestamp: started_at,
        });

        tokio::time::sleep(self.service_duration).await;

        let finished_at = Local::now();
        info!(
            "ISR completed for {} after {}ms",
            device,
            (finished_at - started_at).num_milliseconds()
        );
        events.emit(InterruptEvent::IsrCompleted {
            device,
            timestamp: finished_at,
        });

        state.pending[device] = false;

        ExecutionLogEntry {
            device,
            started_at,
            finished_at,
        }
    }
}
