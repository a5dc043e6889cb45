use clap::Parser;
use smatrix_exporter::config::{Config, ConfigLoader, LogFormat};
use smatrix_exporter::{
    logging, AppResult, FrameCollector, Supervisor, SystemPortOpener, TeardownSignal,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Reads an 868MHz RF receiver on a serial port and exports the frames it picks up.",
    long_about = "Keeps the serial link to the receiver alive (resetting it after read errors or prolonged silence), filters the lines it emits and collects the well-formed protocol frames."
)]
struct Args {
    /// Path to usb device connecting 868MHz RF antenna.
    #[arg(long, env = "ANTENNA_USB_DEVICE_PATH")]
    antenna_usb_device_path: Option<String>,

    /// Path to the config.toml file.
    #[arg(long, env = "SMATRIX_CONFIG")]
    config_path: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

fn load_config(args: &Args) -> AppResult<Config> {
    let loader = match &args.config_path {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();

    if let Some(device) = &args.antenna_usb_device_path {
        config.antenna.device_path = device.clone();
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed loading config: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.logging);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Exporter stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> AppResult<()> {
    info!(
        location = %config.location,
        device = %config.antenna.device_path,
        samples = config.samples.len(),
        "Loaded config"
    );
    for sample in &config.samples {
        info!(
            entity = %sample.entity_name,
            sample = %sample.sample_name,
            thermostat = %sample.thermostat_id,
            "Configured sample"
        );
    }

    let collector = Arc::new(FrameCollector::new(config.collector.capacity));
    let teardown = TeardownSignal::new();
    let handle = Supervisor::start_with_signal(
        &config.antenna.device_path,
        Arc::new(SystemPortOpener),
        collector.clone(),
        config.link_settings(),
        teardown.clone(),
    )?;

    let mut supervision = tokio::task::spawn_blocking(move || handle.wait());

    let finished = tokio::select! {
        result = &mut supervision => Some(result),
        _ = shutdown_signal() => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            teardown.trigger();
            supervision.await
        }
    };
    let report = result??;

    let summary = collector.summary();
    info!(
        lines = report.reader.session.lines,
        frames = report.reader.verdicts.valid_frames,
        dropped = summary.dropped,
        resets = report.reader.session.resets,
        "Stored {} frames, exiting...",
        summary.accepted
    );

    Ok(())
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown...");
}
