use clap::{Parser, Subcommand};

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "pollify-cli", version, about = "Pollify CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Form management
    Form {
        #[command(subcommand)]
        action: commands::form::FormAction,
    },
    /// Fill a form interactively
    Fill {
        /// Form id
        form_id: String,
        /// Completion-identity key (defaults to the configured identity)
        #[arg(long)]
        identity: Option<String>,
    },
    /// Per-question behavioral metrics
    Metrics {
        /// Form id
        form_id: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Form { action } => commands::form::run(action),
        Commands::Fill { form_id, identity } => commands::fill::run(&form_id, identity),
        Commands::Metrics { form_id } => commands::metrics::run(&form_id),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
