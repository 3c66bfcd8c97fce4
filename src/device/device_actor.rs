//! Device actor - one background task per simulated peripheral
//!
//! Each cycle waits a random duration drawn from `[min, min + range)` and then
//! raises one interrupt request. The wait is the only cancellation point, so a
//! cancelled actor exits without raising a request.

use super::DeviceKind;
use crate::controller::InterruptController;
use crate::error::SimulationError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Request timing shared by all devices
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Shortest wait between two requests
    pub min_delay_ms: u64,
    /// Width of the random window added on top of `min_delay_ms`
    pub delay_range_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: 3000,
            delay_range_ms: 7000,
        }
    }
}

impl DeviceSettings {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.delay_range_ms == 0 {
            return Err(SimulationError::InvalidConfig(
                "delay_range_ms must be greater than zero".to_string(),
            ));
        }
        if self.min_delay_ms.checked_add(self.delay_range_ms).is_none() {
            return Err(SimulationError::InvalidConfig(
                "min_delay_ms + delay_range_ms overflows".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct DeviceActor {
    kind: DeviceKind,
    controller: Arc<InterruptController>,
    settings: DeviceSettings,
    rng: StdRng,
}

impl DeviceActor {
    pub fn new(
        kind: DeviceKind,
        controller: Arc<InterruptController>,
        settings: DeviceSettings,
    ) -> Result<Self, SimulationError> {
        Self::with_rng(kind, controller, settings, StdRng::from_entropy())
    }

    /// Builds an actor drawing its delays from `rng`
    ///
    /// # Errors
    ///
    /// [`SimulationError::InvalidConfig`] if `settings` describe an empty or
    /// overflowing delay window.
    pub fn with_rng(
        kind: DeviceKind,
        controller: Arc<InterruptController>,
        settings: DeviceSettings,
        rng: StdRng,
    ) -> Result<Self, SimulationError> {
        settings.validate()?;
        Ok(Self {
            kind,
            controller,
            settings,
            rng,
        })
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Draws the next wait uniformly from `[min, min + range)`
    pub fn next_delay(&mut self) -> Duration {
        let min = self.settings.min_delay_ms;
        let millis = self.rng.gen_range(min..min + self.settings.delay_range_ms);
        Duration::from_millis(millis)
    }

    /// Wait-then-signal loop, returns the number of requests raised
    pub async fn run(mut self, token: CancellationToken) -> u64 {
        info!("{} device started", self.kind);
        let mut requests = 0;

        loop {
            let delay = self.next_delay();
            debug!("{} sleeping for {:?}", self.kind, delay);

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            self.controller.request_interrupt(self.kind).await;
            requests += 1;
        }

        info!("{} device shutting down after {} requests", self.kind, requests);
        requests
    }
}

/// Handle for a spawned device task
#[derive(Debug)]
pub struct DeviceHandle {
    kind: DeviceKind,
    task_handle: Option<JoinHandle<u64>>,
}

impl DeviceHandle {
    pub fn spawn(
        kind: DeviceKind,
        controller: Arc<InterruptController>,
        settings: DeviceSettings,
        token: CancellationToken,
    ) -> Result<Self, SimulationError> {
        info!("Spawning {} device with settings: {:?}", kind, settings);

        let actor = DeviceActor::new(kind, controller, settings)?;
        let task_handle = tokio::spawn(actor.run(token));

        Ok(Self {
            kind,
            task_handle: Some(task_handle),
        })
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Waits for the device task to exit, returning its request count
    pub async fn join(&mut self) -> Result<u64, SimulationError> {
        let Some(handle) = self.task_handle.take() else {
            return Ok(0);
        };

        handle.await.map_err(|e| {
            error!("{} device task failed: {}", self.kind, e);
            SimulationError::TaskJoin(format!("{} device task failed: {}", self.kind, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{InterruptEvent, IsrExecutor};

    fn controller() -> Arc<InterruptController> {
        Arc::new(InterruptController::new(
            IsrExecutor::new(Duration::from_millis(1)),
            64,
        ))
    }

    #[test]
    fn delays_stay_inside_window() {
        let settings = DeviceSettings::default();
        let mut actor = DeviceActor::with_rng(
            DeviceKind::Mouse,
            controller(),
            settings,
            StdRng::seed_from_u64(7),
        )
        .unwrap();

        for _ in 0..500 {
            let delay = actor.next_delay().as_millis();
            assert!((3000..10000).contains(&delay), "delay {} out of range", delay);
        }
    }

    #[test]
    fn empty_window_is_rejected() {
        let settings = DeviceSettings {
            min_delay_ms: 10,
            delay_range_ms: 0,
        };
        assert!(matches!(
            settings.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));
        assert!(DeviceSettings::default().validate().is_ok());
    }

    #[test]
    fn actor_refuses_unusable_window() {
        let empty = DeviceSettings {
            min_delay_ms: 10,
            delay_range_ms: 0,
        };
        assert!(matches!(
            DeviceActor::with_rng(
                DeviceKind::Printer,
                controller(),
                empty,
                StdRng::seed_from_u64(1),
            ),
            Err(SimulationError::InvalidConfig(_))
        ));

        let overflowing = DeviceSettings {
            min_delay_ms: u64::MAX,
            delay_range_ms: 1,
        };
        assert!(matches!(
            DeviceActor::new(DeviceKind::Mouse, controller(), overflowing),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn actor_raises_requests_until_cancelled() {
        let controller = controller();
        let mut events = controller.subscribe();
        let token = CancellationToken::new();
        let settings = DeviceSettings {
            min_delay_ms: 1,
            delay_range_ms: 5,
        };

        let mut handle = DeviceHandle::spawn(
            DeviceKind::Keyboard,
            Arc::clone(&controller),
            settings,
            token.clone(),
        )
        .unwrap();

        let first = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            first,
            InterruptEvent::Requested {
                device: DeviceKind::Keyboard,
                ..
            }
        ));

        token.cancel();
        let requests = handle.join().await.unwrap();
        assert!(requests >= 1);
        assert!(controller.status_snapshot().await.pending[DeviceKind::Keyboard]);
    }

    #[tokio::test]
    async fn cancelled_wait_raises_nothing() {
        let controller = controller();
        let token = CancellationToken::new();
        let mut handle = DeviceHandle::spawn(
            DeviceKind::Printer,
            Arc::clone(&controller),
            DeviceSettings::default(),
            token.clone(),
        )
        .unwrap();

        token.cancel();
        let requests = tokio::time::timeout(Duration::from_millis(500), handle.join())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(requests, 0);
        assert!(!controller.status_snapshot().await.pending[DeviceKind::Printer]);
        assert_eq!(handle.kind(), DeviceKind::Printer);
    }
}
