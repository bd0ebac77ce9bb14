use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gcpscan::adapters::{default_adapters, AdapterRegistry};
use gcpscan::config::Config;
use gcpscan::discovery::{CancellationToken, DiscoveryContext, DiscoveryIdentity};
use gcpscan::gcp::auth::GcpCredentials;
use gcpscan::gcp::client::{Endpoints, GcpClient};
use gcpscan::gcp::http::{format_gcp_error, GcpHttpClient};
use gcpscan::state::ResourceState;
use gcpscan::ui::progress::run_with_progress;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Environment variable holding a pre-issued access token
const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Discover GCP resources into a provenance-tracked JSON state tree
#[derive(Parser, Debug)]
#[command(name = "gcpscan", version = gcpscan::VERSION, about, long_about = None)]
struct Args {
    /// GCP project to scan
    #[arg(short, long)]
    project: Option<String>,

    /// GCP zone to scan ("all" for every zone)
    #[arg(short, long)]
    zone: Option<String>,

    /// Concurrent workers per adaptation batch
    #[arg(short, long)]
    workers: Option<usize>,

    /// Services to scan (compute, storage, container, iam)
    #[arg(short, long, value_delimiter = ',')]
    services: Vec<String>,

    /// Write the state tree to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Do not draw the progress gauge
    #[arg(long)]
    no_progress: bool,

    /// Save the effective project, zone and workers to the config file
    #[arg(long)]
    save: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, err);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcpscan {} started with log level: {:?}", gcpscan::VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcpscan").join("gcpscan.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcpscan").join("gcpscan.log");
    }
    PathBuf::from("gcpscan.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Discovery failed: {:#}", err);
            eprintln!("Error: {}", format_gcp_error(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();

    let project = config.effective_project(args.project.as_deref()).context(
        "No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project flag",
    )?;
    let zone = config.effective_zone(args.zone.as_deref());
    let workers = config.effective_workers(args.workers);
    let services = config.effective_services(&args.services);

    tracing::info!(
        "Using project: {}, zone: {}, workers: {}",
        project,
        zone,
        workers
    );

    // Fail on unknown service names before touching the network
    let registry = AdapterRegistry::new(default_adapters()).select(services.as_slice())?;

    let client = build_client(&config, &project, &zone).await?;

    if args.save {
        config.project_id = Some(project.clone());
        config.zone = Some(zone.clone());
        config.workers = Some(workers);
        config.save()?;
    }

    let identity = DiscoveryIdentity::new("gcp", &project, &client.location());
    let cancellation = CancellationToken::new();
    let ctx = DiscoveryContext::new(identity, workers).with_cancellation(cancellation.clone());

    // Ctrl-C stops workers from claiming new items; in-flight requests finish
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling discovery");
            cancellation.cancel();
        }
    });

    let discovery = registry.run(&ctx, &client);
    let state = if args.no_progress {
        discovery.await?
    } else {
        run_with_progress(ctx.shared_tracker(), discovery).await??
    };

    tracing::info!("Discovered {} resources", state.resource_count());
    write_output(&state, args.output.as_deref())
}

async fn build_client(config: &Config, project: &str, zone: &str) -> Result<GcpClient> {
    let timeout = config.request_timeout();

    let mut client = match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.is_empty() => {
            tracing::info!("Using access token from {}", ACCESS_TOKEN_ENV);
            GcpClient::with_parts(
                GcpCredentials::from_token(token),
                GcpHttpClient::with_timeout(timeout)?,
                project,
                zone,
                Endpoints::google(),
            )
        }
        _ => GcpClient::new(project, zone, timeout).await?,
    };

    if let Some(base) = &config.api_base_url {
        tracing::info!("Routing API requests to {}", base);
        client.endpoints = Endpoints::with_base(base);
    }

    Ok(client)
}

fn write_output(state: &ResourceState, output: Option<&std::path::Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;

    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write output {:?}", path))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }

    Ok(())
}
