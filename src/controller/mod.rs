//! Interrupt controller subsystem
//!
//! Splits the controller into four pieces:
//!
//! 1. [`interrupt_controller`] - Pending/mask state and the dispatch policy
//! 2. [`isr`] - Simulated service routine run inside the critical section
//! 3. [`engine`] - Poll loop state machine and task handle
//! 4. [`events`] - Notifications and execution history records
//!
//! # Architecture
//!
//! ```text
//! Devices ──request──► State lock ──poll──► ISR ──► History
//!                          ▲                 │
//! Control surface ─toggle──┘                 └──► InterruptEvent broadcast
//! ```

pub mod engine;
pub mod events;
pub mod interrupt_controller;
pub mod isr;

pub use engine::{ControllerHandle, ControllerSettings, PollEngine};
pub use events::{ExecutionLogEntry, InterruptEvent, TIMESTAMP_FORMAT};
pub use interrupt_controller::{ControllerState, InterruptController, PollOutcome};
pub use isr::IsrExecutor;
