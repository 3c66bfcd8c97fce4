//! Interrupt subsystem simulator
//!
//! Device actors raise interrupt requests at random intervals. A single
//! controller task polls them, applies the fixed device priority and the
//! per-device mask, and runs one simulated ISR at a time.
//!
//! ```text
//! Device actors ──► InterruptController ──► IsrExecutor ──► history
//!                          ▲                                   │
//!                  Control surface (toggle / history / quit) ◄─┘
//! ```

pub mod config;
pub mod console;
pub mod controller;
pub mod device;
pub mod error;
pub mod simulation;
