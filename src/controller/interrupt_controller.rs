//! Interrupt controller core
//!
//! Owns the pending-request and mask tables behind one state lock and applies
//! the dispatch policy each poll cycle:
//!
//! 1. Scan devices highest priority first
//! 2. Pending and masked: clear the flag, emit an "ignored" notification, keep scanning
//! 3. Pending and unmasked: stop scanning and run the ISR for that device
//!
//! Scan, selection and the ISR hold form one critical section. Requests and
//! mask toggles from other actors wait for it to end.

use super::events::{EventSink, ExecutionLogEntry, InterruptEvent};
use super::isr::IsrExecutor;
use crate::device::{DeviceKind, DeviceTable};
use chrono::Local;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

/// Per-device flags guarded by the controller's state lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    /// true: an unserviced interrupt is outstanding
    pub pending: DeviceTable<bool>,
    /// true: interrupts from this device are suppressed
    pub mask: DeviceTable<bool>,
}

/// Result of one priority scan over the state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Device chosen for service, if any
    pub selected: Option<DeviceKind>,
    /// Masked devices whose pending flag was cleared, in scan order
    pub discarded: Vec<DeviceKind>,
}

impl ControllerState {
    /// Applies the priority and mask policy without running any ISR
    ///
    /// Masked requests seen before the first unmasked one are discarded.
    /// Devices below the selected one are left untouched for the next cycle.
    pub fn select_for_service(&mut self) -> Selection {
        let mut selection = Selection::default();

        for kind in DeviceKind::DESCENDING_PRIORITY {
            if !self.pending[kind] {
                continue;
            }
            if self.mask[kind] {
                self.pending[kind] = false;
                selection.discarded.push(kind);
            } else {
                selection.selected = Some(kind);
                break;
            }
        }

        selection
    }
}

/// What a single poll cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub serviced: Option<ExecutionLogEntry>,
    pub discarded: Vec<DeviceKind>,
}

impl PollOutcome {
    pub fn is_idle(&self) -> bool {
        self.serviced.is_none() && self.discarded.is_empty()
    }
}

#[derive(Debug)]
pub struct InterruptController {
    state: Mutex<ControllerState>,
    isr: IsrExecutor,
    events: EventSink,
    history: watch::Sender<Vec<ExecutionLogEntry>>,
}

impl InterruptController {
    pub fn new(isr: IsrExecutor, event_capacity: usize) -> Self {
        debug!(
            "Creating interrupt controller (ISR hold {:?}, event buffer {})",
            isr.service_duration(),
            event_capacity
        );
        let (history, _) = watch::channel(Vec::new());

        Self {
            state: Mutex::new(ControllerState::default()),
            isr,
            events: EventSink::new(event_capacity),
            history,
        }
    }

    /// Marks `device` as having an outstanding request
    ///
    /// Idempotent while the request is still pending. Only waits for the state
    /// lock, which is held for at most one ISR duration.
    pub async fn request_interrupt(&self, device: DeviceKind) {
        // Stamped when the device fires, not when the lock frees up
        info!("{} requests interrupt", device);
        self.events.emit(InterruptEvent::Requested {
            device,
            timestamp: Local::now(),
        });

        let mut state = self.state.lock().await;
        if state.pending[device] {
            debug!("{} already pending, request coalesced", device);
        }
        state.pending[device] = true;
    }

    /// Flips the mask for `device` and returns the new value
    pub async fn toggle_mask(&self, device: DeviceKind) -> bool {
        let mut state = self.state.lock().await;
        let masked = !state.mask[device];
        state.mask[device] = masked;
        info!(
            "{} interrupts are now {}",
            device,
            if masked { "masked" } else { "enabled" }
        );
        self.events.emit(InterruptEvent::MaskToggled {
            device,
            masked,
            timestamp: Local::now(),
        });
        masked
    }

    /// Runs one scan-select-dispatch cycle under the state lock
    pub async fn poll_once(&self) -> PollOutcome {
        let mut state = self.state.lock().await;
        let selection = state.select_for_service();

        for device in &selection.discarded {
            warn!("{} interrupt ignored (masked)", device);
            self.events.emit(InterruptEvent::Ignored {
                device: *device,
                timestamp: Local::now(),
            });
        }

        let serviced = match selection.selected {
            Some(device) => {
                let entry = self.isr.execute(device, &mut state, &self.events).await;
                self.history.send_modify(|log| log.push(entry.clone()));
                Some(entry)
            }
            None => None,
        };

        PollOutcome {
            serviced,
            discarded: selection.discarded,
        }
    }

    /// Copy of every completed ISR, in completion order
    ///
    /// Reads the published log, never the state lock.
    pub fn history_snapshot(&self) -> Vec<ExecutionLogEntry> {
        self.history.borrow().clone()
    }

    pub fn subscribe_history(&self) -> watch::Receiver<Vec<ExecutionLogEntry>> {
        self.history.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InterruptEvent> {
        self.events.subscribe()
    }

    /// Consistent copy of pending and mask flags, read under the state lock
    pub async fn status_snapshot(&self) -> ControllerState {
        *self.state.lock().await
    }
}
