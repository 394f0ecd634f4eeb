use anyhow::{Context, Result};
use clap::Parser;
use reflect_probe::scan::config::{DEFAULT_WORKERS, MAX_REDIRECTS};
use reflect_probe::utils::logger::init_logger;
use reflect_probe::{Renderer, ScanConfig, Scanner};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::warn;

/// Probe URLs for reflected special characters in the request path
#[derive(Debug, Parser)]
#[command(name = "reflect_probe", version)]
struct Cli {
    /// Number of concurrent workers
    #[arg(short = 't', long = "threads", default_value_t = DEFAULT_WORKERS)]
    threads: usize,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Maximum number of redirects to follow
    #[arg(long, default_value_t = MAX_REDIRECTS)]
    max_redirects: usize,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Read URLs from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write logs to a timestamped file in this directory instead of stderr
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ScanConfig::new()
        .with_workers(cli.threads)
        .with_max_redirects(cli.max_redirects)
        .with_request_timeout(Duration::from_secs(cli.timeout))
        .with_debug(cli.debug);
    init_logger(config.debug, cli.log_dir.as_deref())?;

    let input: Box<dyn AsyncBufRead + Unpin> = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let renderer = Renderer::new(!cli.no_color);
    let scanner = Scanner::new(config)?;
    let stdout = io::stdout();
    let stderr = io::stderr();

    scanner
        .run(input, |outcome| {
            let (mut out, mut err) = (stdout.lock(), stderr.lock());
            if let Err(e) = renderer.render(outcome, &mut out, &mut err) {
                warn!("Failed to write result: {}", e);
            }
            if let Err(e) = out.flush() {
                warn!("Failed to flush stdout: {}", e);
            }
        })
        .await?;

    Ok(())
}
