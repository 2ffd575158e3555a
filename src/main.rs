mod alerts;
mod config;
mod poller;
mod snapshot;

use clap::Parser;
use config::{Config, Thresholds};
use poller::{Poller, PollerSettings};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "statsprobe")]
#[command(version)]
struct Cli {
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "не удалось загрузить конфигурацию");
            std::process::exit(1);
        }
    };

    info!(
        url = %cfg.url,
        interval = %humantime::format_duration(cfg.interval()),
        timeout = %humantime::format_duration(cfg.timeout()),
        max_consecutive_errors = cfg.max_consecutive_errors,
        "запуск statsprobe"
    );

    let poller = match Poller::new(PollerSettings::from(&cfg)) {
        Ok(p) => p,
        Err(err) => {
            error!(error = %err, "не удалось создать HTTP-клиент");
            std::process::exit(1);
        }
    };

    let (payloads, poller_task) = poller.spawn();
    if let Err(err) = consume(payloads, &cfg.thresholds, &mut io::stdout()).await {
        error!(error = %err, "не удалось вывести оповещение");
    }

    match poller_task.await {
        Ok(summary) => info!(
            payloads = summary.payloads,
            failures = summary.failures,
            "опрос завершён"
        ),
        Err(err) => error!(error = %err, "задача опроса завершилась аварийно"),
    }
}

async fn consume(
    mut payloads: mpsc::Receiver<String>,
    thresholds: &Thresholds,
    out: &mut impl Write,
) -> io::Result<()> {
    while let Some(payload) = payloads.recv().await {
        let snapshot = match snapshot::parse(&payload) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(payload = %payload, "Error parsing metrics: {err}");
                continue;
            }
        };

        for alert in alerts::evaluate(&snapshot, thresholds) {
            writeln!(out, "{alert}")?;
        }
        out.flush()?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, config::ConfigError> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(url) = &cli.url {
        cfg.url = url.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
