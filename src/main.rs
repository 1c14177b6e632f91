//! Ciphercalc host: encrypted arithmetic over a line protocol.
//!
//! Reads one request per line from stdin and writes one reply per line to
//! stdout (`ok <result>` or `err <message>`). Logs go to stderr or a file.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ciphercalc::adapters::bfv::BfvAdapter;
use ciphercalc::adapters::sanitize::SanitizingMakeWriter;
use ciphercalc::application::command;
use ciphercalc::config::{LogTarget, ServiceConfig};
use ciphercalc::ArithmeticService;

fn main() -> Result<()> {
    let config = ServiceConfig::from_env().context("failed to read configuration")?;

    // Stdout carries replies; logs never go there.
    let (writer, _guard) = match &config.log_target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                // Best-effort: don't fail startup just because the directory is missing.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogTarget::Stderr => tracing_appender::non_blocking(io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Ciphercalc...");

    let service = ArithmeticService::new(BfvAdapter::new(), config.parameters, config.options);
    service
        .init()
        .context("failed to initialize the encryption context")?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read request")?;
        let Some((reply, quit)) = command::respond(&service, &line) else {
            continue;
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
        if quit {
            break;
        }
    }

    tracing::info!("Ciphercalc shutdown complete.");
    Ok(())
}
