use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global tracing subscriber
///
/// Events go to stderr so stdout only carries findings. With `log_dir` set
/// they go to a timestamped file in that directory instead. `RUST_LOG`
/// overrides the level picked from `debug`.
pub fn init_logger(debug: bool, log_dir: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug));

    match log_dir {
        Some(log_dir) => {
            // Create log directory if it doesn't exist
            if !Path::new(log_dir).exists() {
                fs::create_dir_all(log_dir)
                    .with_context(|| format!("Failed to create log directory {}", log_dir))?;
            }

            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            let log_file = format!("{}/reflect_probe_{}.log", log_dir, timestamp);
            let file = fs::File::create(&log_file)
                .with_context(|| format!("Failed to create log file {}", log_file))?;

            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_target(false)
                .with_ansi(false)
                .with_writer(file)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    info!("Logger initialized");
    Ok(())
}

fn default_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("reflect_probe=debug")
    } else {
        EnvFilter::new("reflect_probe=warn")
    }
}
