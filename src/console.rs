//! Text control panel
//!
//! Reads one command per line, forwards it to the [`Simulation`] and renders
//! controller notifications as they arrive. Unknown input is reported and
//! ignored; `q` or end of input shuts the simulation down.

use crate::controller::{ControllerState, ExecutionLogEntry, InterruptEvent};
use crate::error::SimulationError;
use crate::simulation::{ShutdownReport, Simulation};
use color_eyre::eyre::{Result, WrapErr};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const RULE: &str = "==================================================";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Control panel index, checked by the simulation
    ToggleMask(u8),
    ShowHistory,
    ShowStatus,
    Quit,
}

impl Command {
    /// Parses one line of input, case-insensitive
    pub fn parse(input: &str) -> Result<Self, SimulationError> {
        let trimmed = input.trim().to_lowercase();
        match trimmed.as_str() {
            "h" | "history" => Ok(Command::ShowHistory),
            "s" | "status" => Ok(Command::ShowStatus),
            "q" | "quit" => Ok(Command::Quit),
            other => other
                .parse::<u8>()
                .map(Command::ToggleMask)
                .map_err(|_| SimulationError::UnknownCommand(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn render_banner() -> String {
    [
        RULE,
        "   Simulation Running. Control Panel:",
        "   [1] Toggle Keyboard Mask",
        "   [2] Toggle Mouse Mask",
        "   [3] Toggle Printer Mask",
        "   [h] Show ISR History",
        "   [s] Show Device Status",
        "   [q] Quit Simulation",
        RULE,
    ]
    .join("\n")
}

pub fn render_history(history: &[ExecutionLogEntry]) -> String {
    let mut lines = vec!["--- Interrupt Execution History ---".to_string()];
    if history.is_empty() {
        lines.push("No interrupts handled yet.".to_string());
    } else {
        for entry in history {
            lines.extend(entry.render_lines());
        }
    }
    lines.push("----------------------------------------".to_string());
    lines.join("\n")
}

pub fn render_status(state: &ControllerState) -> String {
    let mut lines = vec!["--- Device Status ---".to_string()];
    for (device, pending) in state.pending.iter() {
        lines.push(format!(
            "{:<8} priority {}  {:<8}  {}",
            device.name(),
            device.priority(),
            if state.mask[device] { "MASKED" } else { "ENABLED" },
            if pending { "pending" } else { "idle" }
        ));
    }
    lines.join("\n")
}

/// Prints notifications until the controller is dropped
pub fn spawn_event_printer(mut events: broadcast::Receiver<InterruptEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event printer lagged, {} notifications skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event stream closed, printer exiting");
                    break;
                }
            }
        }
    })
}

pub struct Console<W> {
    simulation: Simulation,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(simulation: Simulation, out: W) -> Self {
        Self { simulation, out }
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => return self.reject(e),
        };

        match command {
            Command::ToggleMask(index) => match self.simulation.toggle(index).await {
                Ok(masked) => debug!("Mask at index {} is now {}", index, masked),
                Err(e) => return self.reject(e),
            },
            Command::ShowHistory => {
                writeln!(self.out, "{}", render_history(&self.simulation.history()))?;
            }
            Command::ShowStatus => {
                writeln!(self.out, "{}", render_status(&self.simulation.status().await))?;
            }
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn reject(&mut self, error: SimulationError) -> Result<Flow> {
        debug!("Rejected console input: {}", error);
        writeln!(self.out, "Invalid input. Use 1, 2, 3, h, s, or q.")?;
        Ok(Flow::Continue)
    }

    /// Processes input until `q` or end of input, then shuts down
    pub async fn run<R>(mut self, input: R) -> Result<ShutdownReport>
    where
        R: AsyncBufRead + Unpin,
    {
        writeln!(self.out, "{}", render_banner())?;

        let mut lines = input.lines();
        while let Some(line) = lines
            .next_line()
            .await
            .wrap_err("Failed to read console input")?
        {
            if self.handle_line(&line).await? == Flow::Quit {
                break;
            }
        }

        writeln!(self.out, "Shutting down simulation...")?;
        self.out.flush()?;
        let report = self.simulation.shutdown().await?;
        writeln!(
            self.out,
            "Simulation stopped. {} ISRs serviced.",
            report.serviced
        )?;
        Ok(report)
    }
}
