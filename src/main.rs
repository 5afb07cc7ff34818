use clap::{Parser, Subcommand};
use mesh_exporter::config::{self, Config, Overrides};
use mesh_exporter::feed;
use mesh_exporter::mesh::Dispatcher;
use mesh_exporter::server;
use mesh_exporter::telemetry::{exposition, init_logging, MetricsModel};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "mesh-exporter")]
#[command(about = "Exports mesh radio node and traffic state as Prometheus metrics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Process a packet feed and serve metrics until interrupted
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Address for the scrape endpoint
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Process a packet file offline and print the metrics
    Render {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Path to config.toml
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// JSON-lines packet input ("-" for stdin)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Node snapshot to seed the registry with
    #[arg(short, long)]
    nodes: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate config.toml
    Validate {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config {
            action: ConfigAction::Validate { config },
        } => cmd_config_validate(&config),
        Commands::Run { source, listen } => cmd_run(source, listen),
        Commands::Render { source } => cmd_render(source),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn cmd_config_validate(path: &Path) -> mesh_exporter::Result<()> {
    let config = config::load(path)?;
    let result = config::validate(&config);
    result.print_diagnostics();

    if result.has_errors() {
        return Err(mesh_exporter::Error::Config(format!(
            "{} has {} error(s)",
            path.display(),
            result.errors.len()
        )));
    }
    println!("{} is valid", path.display());
    Ok(())
}

/// Loads config, applies CLI overrides, starts logging and validates.
fn prepare(source: SourceArgs, listen: Option<String>) -> mesh_exporter::Result<Config> {
    let mut config = config::load_or_default(&source.config)?;
    config.apply(Overrides {
        listen,
        input: source.input,
        nodes: source.nodes,
    });

    init_logging(Some(&config.logging));

    let result = config::validate(&config);
    for warning in &result.warnings {
        warn!("{}", warning);
    }
    if result.has_errors() {
        return Err(mesh_exporter::Error::Config(result.errors.join("; ")));
    }
    Ok(config)
}

/// Builds a dispatcher and seeds it from the configured snapshot.
fn seeded_dispatcher(
    config: &Config,
    metrics: Arc<MetricsModel>,
) -> mesh_exporter::Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new(metrics);
    if let Some(ref nodes) = config.feed.nodes {
        let records = feed::load_snapshot(nodes)?;
        let published = dispatcher.seed(records);
        info!(
            "Radio connected: {} cached nodes, {} with identity",
            dispatcher.registry().len(),
            published
        );
    }
    Ok(dispatcher)
}

fn cmd_run(source: SourceArgs, listen: Option<String>) -> mesh_exporter::Result<()> {
    let config = prepare(source, listen)?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        let metrics = Arc::new(MetricsModel::new());
        let dispatcher = seeded_dispatcher(&config, metrics.clone())?;

        let server_config = config.server.clone();
        let server_metrics = metrics.clone();
        let mut server = tokio::spawn(async move {
            server::serve(server_metrics, &server_config).await
        });

        let (tx, rx) = mpsc::channel(config.feed.channel_capacity);
        let consumer = tokio::spawn(feed::run_dispatcher(dispatcher, rx));

        let packet_source = feed::open_source(&config.feed).await?;
        let reader = tokio::spawn(feed::read_packets(packet_source, tx));

        tokio::select! {
            served = &mut server => {
                return flatten(served);
            }
            read = reader => {
                flatten(read)?;
            }
        }

        let dispatcher = consumer
            .await
            .map_err(|e| mesh_exporter::Error::Feed(e.to_string()))?;
        info!(
            "Input exhausted, {} nodes known; serving last state until interrupted",
            dispatcher.registry().len()
        );

        tokio::select! {
            served = server => flatten(served),
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                Ok(())
            }
        }
    })
}

fn cmd_render(source: SourceArgs) -> mesh_exporter::Result<()> {
    let config = prepare(source, None)?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        let metrics = Arc::new(MetricsModel::new());
        let dispatcher = seeded_dispatcher(&config, metrics.clone())?;

        let (tx, rx) = mpsc::channel(config.feed.channel_capacity);
        let consumer = tokio::spawn(feed::run_dispatcher(dispatcher, rx));

        let packet_source = feed::open_source(&config.feed).await?;
        feed::read_packets(packet_source, tx).await?;
        consumer
            .await
            .map_err(|e| mesh_exporter::Error::Feed(e.to_string()))?;

        print!("{}", exposition::render(&metrics, &config.server.prefix));
        Ok::<(), mesh_exporter::Error>(())
    })
}

fn flatten<T>(
    joined: Result<mesh_exporter::Result<T>, tokio::task::JoinError>,
) -> mesh_exporter::Result<T> {
    joined.map_err(|e| mesh_exporter::Error::Feed(e.to_string()))?
}
