use irqsim::config::SimulationConfig;
use irqsim::console::{self, Console};
use irqsim::simulation::Simulation;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = SimulationConfig::discover(std::env::args().nth(1).map(PathBuf::from))?;
    info!("Interrupt handling simulation starting");
    println!("Interrupt Handling Simulation Starting...");

    let simulation =
        Simulation::start(&config).map_err(|e| eyre!("Failed to start simulation: {}", e))?;

    let printer = console::spawn_event_printer(simulation.subscribe());

    let console = Console::new(simulation, std::io::stdout());
    let report = console.run(BufReader::new(tokio::io::stdin())).await?;

    // Sender side is gone once every actor has been joined
    printer.await?;
    info!("Shutdown complete: {:?}", report);
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}
