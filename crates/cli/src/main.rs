mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use paperflow_infra::config::{WorkerConfig, load_dotenv};

#[derive(Parser)]
#[command(
    name = "paperflow",
    version,
    about = "Queue worker and operator tools for the document pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume the job queue and persist extracted batches
    Worker {
        /// Process jobs until the queue is empty, then exit
        #[arg(long)]
        once: bool,
    },
    /// Push a job onto the queue
    Enqueue {
        /// Inline batch JSON, or a path to a batch file readable by the worker
        #[arg(long, conflicts_with = "file_url", required_unless_present = "file_url")]
        payload: Option<String>,

        /// Document URL to fetch and send to the extraction endpoint
        #[arg(long)]
        file_url: Option<String>,
    },
    /// Show pending and dead-lettered job counts
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print dead-lettered jobs, newest first
    DeadLetters {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Move dead-lettered jobs back onto the queue, oldest first
    Requeue {
        #[arg(short, long, default_value_t = 1)]
        limit: usize,
    },
    /// Persist a batch or extraction response JSON file
    Persist {
        /// Path to the JSON file
        payload: PathBuf,
    },
    /// Send a document to the extraction endpoint and print the response
    Extract {
        file: PathBuf,

        /// Extraction endpoint (default: OCR_SERVICE_URL)
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Check the OCR service, the queue and the document store
    Healthcheck,
}

fn main() -> ExitCode {
    load_dotenv();
    paperflow_observability::init_cli();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    match cli.command {
        Commands::Worker { once } => commands::worker::run(&config, once),
        Commands::Enqueue { payload, file_url } => {
            commands::queue::enqueue(&config, payload.as_deref(), file_url.as_deref())
        }
        Commands::Status { json } => commands::queue::status(&config, json),
        Commands::DeadLetters { limit } => commands::queue::dead_letters(&config, limit),
        Commands::Requeue { limit } => commands::queue::requeue(&config, limit),
        Commands::Persist { payload } => commands::persist::run(&config, &payload),
        Commands::Extract { file, endpoint } => commands::extract::run(&config, &file, endpoint),
        Commands::Healthcheck => commands::healthcheck::run(&config),
    }
}
