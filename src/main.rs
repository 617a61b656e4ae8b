//! # Hand Drive
//!
//! Drive a stepper-actuated robotic hand from a PS2 game controller.
//!
//! The application polls the controller over SPI and pulses the shared
//! step line of every actuator, each on its own interval.

use anyhow::{Context, Result};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use hand_drive::clock::MonotonicClock;
use hand_drive::config::{Config, LoggingConfig};
use hand_drive::hand::Hand;
use hand_drive::telemetry::TelemetryLogger;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of ticks between status log messages
const LOG_INTERVAL_TICKS: u64 = 500;

/// Main entry point for Hand Drive
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging with tracing subscriber
///    - Open the hardware and drive actuators toward their home targets
///
/// 2. **Main Loop**
///    - Tick all actuators on the drive interval
///    - Poll the controller on the poll interval, reconfiguring on failure
///    - Record telemetry when enabled
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - De-energize every actuator
///    - Flush telemetry
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or the hardware
/// cannot be opened.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&path).with_context(|| format!("failed to load configuration from {}", path))?;

    let _log_guard = init_logging(&config.logging);

    info!("Hand Drive v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from {}", path);

    let hand = open_hand(&config)?;
    run(hand, &config).await
}

/// Install the tracing subscriber, tee'd to a daily log file when configured
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (file, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stdout.and(file))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

#[cfg(feature = "rpi")]
fn open_hand(
    config: &Config,
) -> Result<
    Hand<
        hand_drive::hardware::rpi::PiBus,
        rppal::gpio::OutputPin,
        rppal::gpio::OutputPin,
        rppal::gpio::OutputPin,
        rppal::gpio::OutputPin,
        MonotonicClock,
    >,
> {
    let hardware = hand_drive::hardware::rpi::PiHardware::open(config)?;
    let hand = Hand::from_config(
        config,
        hardware.bus,
        hardware.attention,
        hardware.step,
        hardware.actuators,
        MonotonicClock::new(),
        MonotonicClock::new(),
    )?;
    Ok(hand)
}

#[cfg(not(feature = "rpi"))]
fn open_hand(
    config: &Config,
) -> Result<
    Hand<
        hand_drive::hardware::sim::SimBus,
        hand_drive::hardware::sim::SimAttention,
        hand_drive::hardware::sim::SimPin,
        hand_drive::hardware::sim::SimPin,
        hand_drive::hardware::sim::SimPin,
        MonotonicClock,
    >,
> {
    use hand_drive::hardware::sim::{SimPin, SimulatedGamepad};

    warn!("Built without the `rpi` feature, driving a simulated controller and pins");
    let pad = SimulatedGamepad::new();
    let lines = config.actuators.iter().map(|_| (SimPin::new(), SimPin::new())).collect();
    let hand = Hand::from_config(
        config,
        pad.bus(),
        pad.attention(),
        SimPin::new(),
        lines,
        MonotonicClock::new(),
        MonotonicClock::new(),
    )?;
    Ok(hand)
}

/// Application loop; returns after Ctrl+C
async fn run<B, P, EN, DIR, S>(mut hand: Hand<B, P, EN, DIR, S, MonotonicClock>, config: &Config) -> Result<()>
where
    B: SpiBus<u8>,
    P: OutputPin,
    EN: OutputPin,
    DIR: OutputPin,
    S: OutputPin,
{
    let mut telemetry = if config.telemetry.enabled {
        let logger = TelemetryLogger::from_config(&config.telemetry).context("failed to open telemetry log")?;
        info!("Recording telemetry to {}", logger.dir().display());
        Some(logger)
    } else {
        None
    };

    if let Err(e) = hand.connect() {
        warn!("Controller not ready: {}", e);
    }

    let mut tick_interval = interval(Duration::from_millis(config.drive.tick_interval_ms));
    let mut poll_interval = interval(Duration::from_millis(config.gamepad.poll_interval_ms));
    let mut retry_interval = interval(Duration::from_millis(config.gamepad.retry_interval_ms));
    let mut telemetry_interval = interval(Duration::from_millis(config.telemetry.log_interval_ms));
    for timer in [&mut tick_interval, &mut poll_interval, &mut retry_interval, &mut telemetry_interval] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }

    info!(
        "Starting control loop (tick every {} ms, poll every {} ms)",
        config.drive.tick_interval_ms, config.gamepad.poll_interval_ms
    );

    let mut tick_count = 0u64;
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                match hand.tick() {
                    Ok(report) => {
                        tick_count += 1;
                        if tick_count % LOG_INTERVAL_TICKS == 0 {
                            debug!("Tick {}: {} actuators moving", tick_count, report.active);
                        }
                    }
                    Err(e) => error!("Tick failed: {}", e),
                }
            }

            _ = poll_interval.tick(), if hand.is_connected() => {
                if let Err(e) = hand.poll() {
                    warn!("Controller poll failed: {}", e);
                }
            }

            _ = retry_interval.tick(), if !hand.is_connected() => {
                match hand.connect() {
                    Ok(()) => info!("Controller connected"),
                    Err(_) if hand.is_connected() => info!("Controller connected without pressure data"),
                    Err(e) => debug!("Controller not ready: {}", e),
                }
            }

            _ = telemetry_interval.tick(), if telemetry.is_some() => {
                if let Some(logger) = telemetry.as_mut() {
                    if let Err(e) = logger.log(&hand.snapshot()) {
                        warn!("Failed to write telemetry: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    hand.shutdown().context("failed to disable actuators")?;
    if let Some(logger) = telemetry.as_mut() {
        logger.flush()?;
    }
    info!("Shutdown complete after {} ticks", tick_count);
    Ok(())
}
