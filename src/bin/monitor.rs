use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use plant_monitor::{
    AlertEvaluator, SensorReader,
    actors::{messages::MonitorState, monitor::MonitorHandle},
    config::{Config, read_config_file},
    publisher::{LocalOutput, MqttPublisher},
};
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Watches a plant's sensors and publishes alerts over MQTT")]
struct Args {
    /// Config file (JSON); built-in defaults are used without one
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new()
        .with_target("plant_monitor", level)
        .with_default(LevelFilter::WARN);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => read_config_file(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => Config::default(),
    };

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Resolves on SIGINT or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            Ok("SIGINT")
        }
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> anyhow::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("SIGINT")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = load_config(args.file.as_ref())?;
    debug!("using config: {config:?}");

    let reader = SensorReader::from_config(&config.sensors);
    let evaluator = AlertEvaluator::new(config.thresholds);

    let broker = config.broker.clone();
    let reconnect = config.reconnect.clone();
    info!("connecting to {} (topic {})", broker.address(), broker.topic);

    let (mut handle, mut task) = MonitorHandle::spawn(
        reader,
        evaluator,
        LocalOutput::stdout(),
        config.interval(),
        async move { MqttPublisher::connect(&broker, &reconnect).await },
    );

    if args.once {
        // the initial cycle runs as soon as the connection is up
        if handle.wait_for_state(MonitorState::Running).await == MonitorState::Running {
            handle.shutdown().await?;
        }
        return task.await?.context("monitor failed");
    }

    tokio::select! {
        result = &mut task => {
            return result?.context("monitor failed");
        }
        signal = shutdown_signal() => {
            let signal = signal?;
            warn!("received {signal}, finishing current cycle");
            if let Err(e) = handle.shutdown().await {
                debug!("{e:#}");
            }
        }
    }

    task.await?.context("monitor failed")?;
    info!("shutdown complete");
    Ok(())
}
