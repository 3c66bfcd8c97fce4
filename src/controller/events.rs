//! Notifications and history records produced by the controller
//!
//! Every notification carries the device it concerns and a chrono timestamp.
//! Rendering follows the control panel's `HH:MM:SS.mmm` clock format.

use crate::device::DeviceKind;
use chrono::{DateTime, Local};
use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

/// Clock format used for every rendered timestamp
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S.%3f";

/// Notification emitted by the controller for any UI to render
#[derive(Debug, Clone, PartialEq)]
pub enum InterruptEvent {
    Requested {
        device: DeviceKind,
        timestamp: DateTime<Local>,
    },
    Ignored {
        device: DeviceKind,
        timestamp: DateTime<Local>,
    },
    IsrTriggered {
        device: DeviceKind,
        timestamp: DateTime<Local>,
    },
    IsrCompleted {
        device: DeviceKind,
        timestamp: DateTime<Local>,
    },
    MaskToggled {
        device: DeviceKind,
        masked: bool,
        timestamp: DateTime<Local>,
    },
}

impl InterruptEvent {
    pub fn device(&self) -> DeviceKind {
        match self {
            InterruptEvent::Requested { device, .. }
            | InterruptEvent::Ignored { device, .. }
            | InterruptEvent::IsrTriggered { device, .. }
            | InterruptEvent::IsrCompleted { device, .. }
            | InterruptEvent::MaskToggled { device, .. } => *device,
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            InterruptEvent::Requested { timestamp, .. }
            | InterruptEvent::Ignored { timestamp, .. }
            | InterruptEvent::IsrTriggered { timestamp, .. }
            | InterruptEvent::IsrCompleted { timestamp, .. }
            | InterruptEvent::MaskToggled { timestamp, .. } => *timestamp,
        }
    }
}

impl fmt::Display for InterruptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = self.timestamp().format(TIMESTAMP_FORMAT);
        match self {
            InterruptEvent::Requested { device, .. } => {
                write!(f, "[{}] >>> [{}] requests interrupt! <<<", stamp, device)
            }
            InterruptEvent::Ignored { device, .. } => {
                write!(f, "[{}] {} Interrupt Ignored (Masked)", stamp, device)
            }
            InterruptEvent::IsrTriggered { device, .. } => {
                write!(
                    f,
                    "[{}] {} Interrupt Triggered -> Handling ISR...",
                    stamp, device
                )
            }
            InterruptEvent::IsrCompleted { device, .. } => {
                write!(f, "[{}] {} ISR Completed.", stamp, device)
            }
            InterruptEvent::MaskToggled { device, masked, .. } => {
                let state = if *masked { "MASKED (Disabled)" } else { "ENABLED" };
                write!(f, "[{}] --- {} interrupts are now {} ---", stamp, device, state)
            }
        }
    }
}

/// One serviced interrupt, appended once its ISR completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionLogEntry {
    pub device: DeviceKind,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl ExecutionLogEntry {
    /// Renders the start and end lines shown by the history view
    pub fn render_lines(&self) -> [String; 2] {
        [
            format!(
                "[{}] {} Interrupt Triggered -> Handling ISR...",
                self.started_at.format(TIMESTAMP_FORMAT),
                self.device
            ),
            format!(
                "[{}] {} ISR Completed.",
                self.finished_at.format(TIMESTAMP_FORMAT),
                self.device
            ),
        ]
    }
}

/// Fan-out point for notifications
///
/// Sending never blocks the controller. Slow subscribers lag and lose the
/// oldest notifications instead of stalling dispatch.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: broadcast::Sender<InterruptEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: InterruptEvent) {
        debug!("Emitting event: {:?}", event);
        // No subscribers is fine, the event is still traced above
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InterruptEvent> {
        self.sender.subscribe()
    }
}
