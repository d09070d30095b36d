// Nightshift — Resumable day/night batch driver for a local image-generation queue
// License: Apache-2.0

use clap::{Parser, Subcommand};
use nightshift::batch::{BatchPlan, BatchRunner};
use nightshift::config::Config;
use nightshift::progress::Checkpoint;
use nightshift::prompts::read_prompts;
use nightshift::queue::http::HttpQueue;
use std::path::PathBuf;

const LOGO: &str = "🌗";

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(
    name = "nightshift",
    about = "Nightshift — resumable day/night batch driver for an image-generation queue",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit every remaining prompt and wait for each job
    Run {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
        /// Build the jobs without contacting the service or saving progress
        #[arg(long)]
        dry_run: bool,
    },
    /// Show configured paths and checkpoint position
    Status {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Delete the progress file so the next run starts from the first prompt
    Reset {
        /// Config file path
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Show version information
    Version,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    nightshift::logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Run { config, dry_run }) => run_cmd(config, dry_run).await,
        Some(Commands::Status { config }) => status_cmd(config).await,
        Some(Commands::Reset { config }) => reset_cmd(config).await,
        Some(Commands::Version) => {
            version_cmd();
            Ok(())
        }
        // Default: run with the configured paths
        None => run_cmd(None, false).await,
    };

    if let Err(e) = result {
        eprintln!("{} Error: {:#}", LOGO, e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_cmd(config_path: Option<String>, dry_run: bool) -> anyhow::Result<()> {
    let cfg = load_config(config_path.as_deref())?;
    cfg.validate()?;

    // Validate every local input before the first network call.
    let plan = BatchPlan::load(&cfg)?;

    let queue = HttpQueue::new(&cfg.service)?;
    tracing::info!(
        service = %queue.base_url(),
        progress = %cfg.paths.progress.display(),
        dry_run,
        "Nightshift batch starting"
    );

    let summary = BatchRunner::new(&queue, &cfg)
        .dry_run(dry_run)
        .run(&plan)
        .await?;

    println!(
        "{} DONE: {} submitted, {} already complete, {} total",
        LOGO, summary.completed, summary.skipped, summary.total
    );
    Ok(())
}

async fn status_cmd(config_path: Option<String>) -> anyhow::Result<()> {
    let cfg = load_config(config_path.as_deref())?;

    println!("{} Nightshift Status\n", LOGO);
    println!("  Service:   {}", cfg.service_base());

    let workflow = &cfg.paths.workflow;
    if workflow.exists() {
        println!("  Workflow:  ✅ {}", workflow.display());
    } else {
        println!("  Workflow:  ❌ {} (missing)", workflow.display());
    }

    let total = match read_prompts(&cfg.paths.prompts) {
        Ok(prompts) => {
            println!(
                "  Prompts:   ✅ {} ({} prompts)",
                cfg.paths.prompts.display(),
                prompts.len()
            );
            Some(prompts.len())
        }
        Err(e) => {
            println!("  Prompts:   ❌ {}", e);
            None
        }
    };

    let checkpoint = Checkpoint::load(&cfg.paths.progress).await;
    let done = checkpoint.resume_index();
    match total {
        Some(total) => println!(
            "  Progress:  {}/{} done ({})",
            done.min(total),
            total,
            cfg.paths.progress.display()
        ),
        None => println!(
            "  Progress:  {} done ({})",
            done,
            cfg.paths.progress.display()
        ),
    }
    if let Some(updated_at) = checkpoint.updated_at {
        println!("  Updated:   {}", updated_at);
    }

    Ok(())
}

async fn reset_cmd(config_path: Option<String>) -> anyhow::Result<()> {
    let cfg = load_config(config_path.as_deref())?;
    let path = &cfg.paths.progress;

    if Checkpoint::reset(path).await? {
        println!("{} Removed {}", LOGO, path.display());
    } else {
        println!("{} No progress file at {}", LOGO, path.display());
    }
    Ok(())
}

fn version_cmd() {
    println!("{} nightshift v{}", LOGO, nightshift::VERSION);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => Config::default_path().unwrap_or_else(|_| PathBuf::from("config.json")),
    };

    Ok(Config::load(&config_path)?)
}
