mod fix_logger;

use clap::{CommandFactory, Parser};
use common::position::Position;
use fix_logger::FixLogger;
use module_core::{Event, EventBus, EventKind, Module};
use positioning::PositioningSubsystem;
use positioning::constant_source::ConstantPositioning;
use positioning::gpsd_source::GpsdPositioning;
use provider_session::{LocatorModule, SessionConfig};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Velocity in m/s used to drive the simulated route.
const FAKE_VELOCITY: f64 = 10.0;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long)]
    gps_fake: bool,
    #[arg(short = 'f', long)]
    gps_source_file: Option<String>,
    #[arg(short = 'd', long)]
    gpsd: bool,
    #[arg(long, default_value = "127.0.0.1:2947")]
    gpsd_address: String,
    /// JSON file with the session configuration.
    #[arg(short, long)]
    config: Option<String>,
    /// Overrides the poll interval of the configuration.
    #[arg(short, long)]
    interval_ms: Option<u64>,
    /// Overrides the minimum distance of the configuration.
    #[arg(short, long)]
    min_distance: Option<f64>,
}

fn read_route_from_file(file_path: &str) -> Result<Vec<Position>, ()> {
    let mut rdr = csv::Reader::from_path(file_path).map_err(|e| {
        error!("Failed to open route file {file_path}. Error: {e}");
    })?;
    let mut positions = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| error!("Failed to read route file. Error: {e}"))?;
        let coordinate = |index: usize| {
            record
                .get(index)
                .and_then(|value| f64::from_str(value.trim()).ok())
                .ok_or_else(|| error!("Invalid route record {record:?}"))
        };
        let longitude = coordinate(0)?;
        let latitude = coordinate(1)?;
        positions.push(Position::new(&latitude, &longitude));
    }
    debug!("length of positions: {}", positions.len());
    Ok(positions)
}

fn load_config(cli: &Cli) -> Result<SessionConfig, ()> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| error!("Failed to read config file {path}. Error: {e}"))?;
            SessionConfig::from_json(&json)
                .map_err(|e| error!("Failed to parse config file {path}. Error: {e}"))?
        }
        None => SessionConfig::default(),
    };
    if let Some(interval_ms) = cli.interval_ms {
        config = config.with_poll_interval(Duration::from_millis(interval_ms));
    }
    if let Some(min_distance) = cli.min_distance {
        config = config.with_min_distance(min_distance);
    }
    Ok(config)
}

async fn get_gpsd_subsystem(cli: &Cli) -> Result<Arc<dyn PositioningSubsystem>, ()> {
    match GpsdPositioning::new(&cli.gpsd_address).await {
        Ok(gpsd) => Ok(Arc::new(gpsd)),
        Err(e) => {
            error!("Failed to connect to gpsd!. Error: {}", e);
            Err(())
        }
    }
}

fn create_fake_subsystem(cli: &Cli) -> Result<Arc<dyn PositioningSubsystem>, ()> {
    if let Some(source_file) = &cli.gps_source_file {
        let positions = read_route_from_file(source_file)?;
        match ConstantPositioning::new(&positions, FAKE_VELOCITY) {
            Ok(constant) => Ok(Arc::new(constant)),
            Err(e) => {
                error!("Failed to create simulated route. Error: {e}");
                Err(())
            }
        }
    } else {
        error!("Failed to create simulated route. Error: gps_source_file not set");
        let _ = Cli::command().print_help();
        Err(())
    }
}

fn install_quit_handler(eb: &EventBus) -> Result<(), ()> {
    let publisher = eb.context().publisher();
    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, shutting down");
        let _ = publisher.send(Event {
            kind: EventKind::QuitEvent,
        });
    })
    .map_err(|e| error!("Failed to install Ctrl-C handler. Error: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = load_config(&cli)?;
    let subsystem: Arc<dyn PositioningSubsystem> = if cli.gpsd {
        get_gpsd_subsystem(&cli).await?
    } else if cli.gps_fake {
        create_fake_subsystem(&cli)?
    } else {
        error!("No GPS source specified. Use --gpsd or --gps-fake");
        let _ = Cli::command().print_help();
        return Err(());
    };

    let eb = EventBus::default();
    install_quit_handler(&eb)?;
    let mut locator = LocatorModule::new(eb.context(), subsystem, config);
    let mut logger = FixLogger::new(eb.context());

    info!("Starting modules...");
    let locator_run = async {
        let result = locator.run().await;
        // Also ends the logger if the locator failed to start.
        eb.publish(&Event {
            kind: EventKind::QuitEvent,
        });
        result
    };
    let (locator_result, logger_result) = tokio::join!(locator_run, logger.run());
    locator_result.and(logger_result)
}
