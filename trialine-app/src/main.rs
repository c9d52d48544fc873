use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod app;
use app::{App, RunOptions};

#[derive(Parser)]
#[command(name = "trialine", version, about = "Trial timeline runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one headless session and store its data
    Run(RunOptions),
    /// Print the expanded timeline for a config
    Timeline {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Check an experiment folder's config.json
    Validate { folder: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(options) => {
            let app = App::new(options)?;
            app.run()
        }
        Commands::Timeline { config } => app::print_timeline(config.as_deref()),
        Commands::Validate { folder } => app::validate(&folder),
    }
}
