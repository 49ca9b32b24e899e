use std::path::PathBuf;
use std::time::Duration;

use anchorscan_agent::commands::{decode_frame, ensure_identity};
use anchorscan_agent::run_agent;
use anchorscan_config::{ConfigLoad, ConfigLoader};
use anchorscan_core::beacon::Namespace;
use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "anchorscan-agent")]
#[command(about = "Beacon anchor: scans for event tags and reports what it hears")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct RunArgs {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Alternate .env file to load before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Poll for jobs and scan (default)
    Run,
    /// Print the anchor identifier, creating it if missing
    Identity {
        #[arg(long, env = "ANCHORSCAN_IDENTITY_PATH", default_value = "./anchor_id")]
        path: PathBuf,
    },
    /// Decode a service-data frame given as hex
    Decode {
        frame: String,

        /// Expected 10 byte namespace as 20 hex characters
        #[arg(long, env = "ANCHORSCAN_NAMESPACE")]
        namespace: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            init_tracing();
            let config = load_config(&cli.run)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            let result = runtime.block_on(run_agent(config));
            // Stdin is read on a blocking thread that never returns on its own.
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
            result
        }
        Command::Identity { path } => {
            let id = ensure_identity(&path)?;
            println!("{id}");
            Ok(())
        }
        Command::Decode { frame, namespace } => {
            let namespace = match namespace {
                Some(raw) => raw
                    .parse::<Namespace>()
                    .with_context(|| format!("invalid namespace '{raw}'"))?,
                None => Namespace::DEFAULT,
            };
            println!("{}", decode_frame(&frame, &namespace)?);
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                |_| "info,anchorscan_core=info,reqwest=warn".into(),
            ),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(args: &RunArgs) -> anyhow::Result<anchorscan_config::Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &args.env_file {
        loader = loader.with_env_file(path);
    }

    let ConfigLoad { config, warnings } =
        loader.load().context("failed to load configuration")?;

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file in use");
    }
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }

    info!(
        poll_interval_ms = config.orchestrator.poll_interval_ms,
        debug_scan_secs = config.orchestrator.debug_scan_secs,
        namespace = %config.orchestrator.namespace,
        request_timeout = ?config.api.request_timeout,
        dev_mode = config.dev_mode,
        "configuration in effect"
    );

    Ok(config)
}
