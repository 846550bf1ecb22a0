//! Beertemp Exporter binary
//!
//! Samples one-wire temperature probes and serves their readings to Prometheus.

use anyhow::Context;
use beertemp_exporter::{
    probes::{config::DEFAULT_W1_ROOT, ProbeInfo},
    render, start_web_server, BusConfig, BusDeviceDirectory, BusDriver, MonotonicClock,
    ProbeRegistry, Reading, SamplerConfig, SamplingScheduler, WebConfig, DEFAULT_INTERVAL_MS,
    DEFAULT_WEB_PORT, MAX_DEVICES,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "beertemp_exporter")]
#[command(about = "Beertemp Exporter - one-wire temperature probes for Prometheus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    long_about = "Samples DS18B20 temperature probes on a one-wire bus at a fixed interval and serves the latest readings in the Prometheus text format"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Sampling interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MS)]
    interval: u32,

    /// Maximum number of probes to track; extra probes are ignored
    #[arg(long, default_value_t = MAX_DEVICES)]
    max_devices: usize,

    /// Directory holding the kernel one-wire devices
    #[arg(long, default_value = DEFAULT_W1_ROOT)]
    w1_root: PathBuf,

    /// Use a simulated bus with this many probes instead of real hardware
    #[arg(long, value_name = "PROBES")]
    simulate: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample continuously and serve metrics (default)
    Serve,

    /// Take a single reading of every probe and exit
    Snapshot(SnapshotArgs),

    /// List the probes found on the bus
    Probes,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = SnapshotFormat::Text)]
    format: SnapshotFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum SnapshotFormat {
    /// Prometheus exposition text
    Text,
    /// JSON array of probes and readings
    Json,
}

#[derive(Serialize)]
struct ProbeSnapshot {
    #[serde(flatten)]
    probe: ProbeInfo,
    reading: Option<Reading>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve) | None => serve_command(&cli).await?,
        Some(Commands::Snapshot(args)) => snapshot_command(&cli, args)?,
        Some(Commands::Probes) => probes_command(&cli)?,
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn sampler_config(cli: &Cli) -> anyhow::Result<SamplerConfig> {
    let config = SamplerConfig::default()
        .with_interval_ms(cli.interval)
        .with_max_devices(cli.max_devices);
    config.validate()?;
    Ok(config)
}

fn bus_config(cli: &Cli) -> BusConfig {
    match cli.simulate {
        Some(probes) => BusConfig::Simulated { probes },
        None => BusConfig::W1Sysfs {
            root: cli.w1_root.clone(),
        },
    }
}

/// Open the bus and enumerate its probes.
fn open_registry(
    cli: &Cli,
    config: &SamplerConfig,
) -> anyhow::Result<(Box<dyn BusDriver>, Arc<ProbeRegistry>)> {
    let bus_config = bus_config(cli);
    let mut bus = bus_config
        .open()
        .with_context(|| format!("failed to open bus {:?}", bus_config))?;
    let directory = BusDeviceDirectory::enumerate(&mut bus, config.max_devices);
    Ok((bus, Arc::new(ProbeRegistry::new(directory))))
}

async fn serve_command(cli: &Cli) -> anyhow::Result<()> {
    info!("Starting beertemp exporter...");

    let config = sampler_config(cli)?;
    let (bus, registry) = open_registry(cli, &config)?;

    let sampler = SamplingScheduler::new(bus, Arc::clone(&registry), config.interval_ms);
    tokio::spawn(sampler.run(MonotonicClock::new(), Duration::from_millis(config.poll_ms)));
    info!(
        "Sampling {} probes every {}ms",
        registry.directory().len(),
        config.interval_ms
    );

    let web_config = WebConfig::new(&cli.host, cli.port);
    start_web_server(web_config, registry).await?;

    Ok(())
}

fn snapshot_command(cli: &Cli, args: &SnapshotArgs) -> anyhow::Result<()> {
    let config = sampler_config(cli)?;
    let (bus, registry) = open_registry(cli, &config)?;

    let clock = MonotonicClock::new();
    let mut sampler = SamplingScheduler::new(bus, Arc::clone(&registry), config.interval_ms);
    sampler.sample_blocking(clock.now_ms());

    match args.format {
        SnapshotFormat::Text => print!("{}", render(&registry)),
        SnapshotFormat::Json => {
            let probes: Vec<ProbeSnapshot> = registry
                .readings()
                .map(|(probe, reading)| ProbeSnapshot {
                    probe: *probe,
                    reading,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&probes)?);
        }
    }

    Ok(())
}

fn probes_command(cli: &Cli) -> anyhow::Result<()> {
    let config = sampler_config(cli)?;
    let (_bus, registry) = open_registry(cli, &config)?;
    let directory = registry.directory();

    println!("Device count: {}", directory.len());
    for probe in directory.iter() {
        println!(
            "  [{}] {}  resolution: {} bits",
            probe.index, probe.id, probe.resolution_bits
        );
    }

    Ok(())
}
