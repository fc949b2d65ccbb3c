use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "alertmate", version, about = "AlertMate personal safety CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emergency contact management
    Contacts {
        #[command(subcommand)]
        action: commands::contacts::ContactsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Last known location used in outgoing alerts
    Location {
        #[command(subcommand)]
        action: commands::location::LocationAction,
    },
    /// Send alerts
    Alert {
        #[command(subcommand)]
        action: commands::alert::AlertAction,
    },
    /// Safety timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Replay a scripted sequence of sensor and key events
    Simulate(commands::simulate::SimulateArgs),
    /// Show recently dispatched alerts
    History(commands::history::HistoryArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("ALERTMATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Contacts { action } => commands::contacts::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Location { action } => commands::location::run(action),
        Commands::Alert { action } => commands::alert::run(action),
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::History(args) => commands::history::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
