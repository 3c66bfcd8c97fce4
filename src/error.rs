//! Error definitions for the interrupt simulation

use thiserror::Error;

/// Errors surfaced by the simulation and its control surface
///
/// None of the controller's state operations can fail; these cover
/// configuration, console input and actor teardown.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration values that cannot drive the simulation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Console input that does not map to any command
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    /// Device index outside 1..=3
    #[error("Invalid device index: {0}")]
    InvalidDeviceIndex(u8),

    /// An actor task panicked or was aborted before it could be joined
    #[error("Task join error: {0}")]
    TaskJoin(String),
}
