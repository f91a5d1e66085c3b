use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "chronofocus-cli", version, about = "ChronoFocus CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Battle session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Monster catalog
    Monsters {
        #[command(subcommand)]
        action: commands::monsters::MonstersAction,
    },
    /// Player statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::Monsters { action } => commands::monsters::run(action),
        Commands::Stats { action } => commands::stats::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
