//! Command line front end for the declaration submission robot.
//!
//! Credentials come from the environment (or an env file): numbered slots
//! `PORTAL_ENTITY_n` / `PORTAL_USER_n` / `PORTAL_PASS_n` / `PORTAL_TAXID_n`.
//!
//! Exit codes: 0 = accepted, 1 = business failure (rejection, bad
//! credentials, unknown entity), 2 = infrastructure failure or undetermined
//! result.

use anyhow::{Context, Result};
use clap::Parser;
use issbot::{CredentialStore, Mode, Outcome, PortalConfig, Robot, SelectorMap, Task};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "issbot")]
#[command(about = "Submits a declaration file to the municipal tax portal")]
struct Cli {
    /// Absolute path of the declaration file to submit.
    artifact: PathBuf,

    /// Municipal registration id of the entity to submit for.
    entity: String,

    /// Run the browser unattended instead of visibly.
    #[arg(long)]
    headless: bool,

    /// JSON file overriding the built-in selector map.
    #[arg(long)]
    selectors: Option<PathBuf>,

    /// Env file to load before reading credentials (defaults to ./.env).
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Print the outcome as JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(outcome) if outcome.success => ExitCode::SUCCESS,
        Ok(outcome) => {
            // Undetermined results map to the infrastructure exit code so a
            // scheduler knows a re-check may settle them.
            if outcome.message.contains("unavailable") || outcome.message.contains("undetermined")
            {
                ExitCode::from(2)
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<Outcome> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "issbot=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("cannot load env file {}", path.display()))?;
        }
        None => {
            // Optional by design; deployments may configure the process
            // environment directly.
            let _ = dotenvy::dotenv();
        }
    }

    let store = CredentialStore::from_env();
    if store.is_empty() {
        anyhow::bail!("no credential slots found in the environment (PORTAL_ENTITY_1, ...)");
    }
    info!(entities = store.len(), "credential store loaded");

    let selectors = match &cli.selectors {
        Some(path) => SelectorMap::load(path)
            .with_context(|| format!("cannot load selector map {}", path.display()))?,
        None => SelectorMap::default_map().clone(),
    };

    let mode = if cli.headless {
        Mode::Headless
    } else {
        Mode::Interactive
    };
    let task = Task::new(&cli.artifact, &cli.entity, mode)
        .with_progress_sink(Arc::new(|line: &str| println!(">> {line}")));

    let robot = Robot::with_driver(
        Arc::new(issbot::ChromiumDriver::new()),
        Arc::new(store),
        PortalConfig::from_env(),
        selectors,
    );

    let outcome = robot.execute(&task).await;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{outcome}");
    }
    Ok(outcome)
}
