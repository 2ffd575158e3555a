use crate::config::Config;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub url: String,
    pub max_consecutive_errors: u32,
    pub timeout: Duration,
    pub interval: Duration,
    pub buffer_size: usize,
}

impl From<&Config> for PollerSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            url: cfg.url.clone(),
            max_consecutive_errors: cfg.max_consecutive_errors,
            timeout: cfg.timeout(),
            interval: cfg.interval(),
            buffer_size: cfg.buffer_size,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),
}

impl FetchError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status(status) => Some(*status),
            FetchError::Transport(err) | FetchError::BodyRead(err) => err.status(),
        }
    }
}

pub type PollOutcome = Result<String, FetchError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub payloads: u64,
    pub failures: u64,
}

pub struct Poller {
    client: Client,
    settings: PollerSettings,
}

impl Poller {
    pub fn new(settings: PollerSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("statsprobe/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    pub async fn fetch_once(&self) -> PollOutcome {
        let resp = self
            .client
            .get(&self.settings.url)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        resp.text().await.map_err(FetchError::BodyRead)
    }

    /// Starts polling in the background. The receiver yields one body per
    /// successful fetch and closes once the error budget is spent.
    pub fn spawn(self) -> (mpsc::Receiver<String>, JoinHandle<PollSummary>) {
        let (tx, rx) = mpsc::channel(self.settings.buffer_size.max(1));
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    async fn run(self, tx: mpsc::Sender<String>) -> PollSummary {
        let mut summary = PollSummary::default();
        let mut consecutive_errors = 0_u32;

        loop {
            time::sleep(self.settings.interval).await;
            if tx.is_closed() {
                debug!("receiver dropped, poller stopping");
                break;
            }

            match self.fetch_once().await {
                Ok(body) => {
                    consecutive_errors = 0;
                    summary.payloads += 1;
                    if tx.send(body).await.is_err() {
                        debug!("receiver dropped, poller stopping");
                        break;
                    }
                }
                Err(err) => {
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    summary.failures += 1;
                    warn!(
                        url = %self.settings.url,
                        error = %err,
                        status = err.status().map(|s| s.as_u16()),
                        consecutive_errors,
                        "poll attempt failed"
                    );
                    if consecutive_errors >= self.settings.max_consecutive_errors {
                        error!(
                            url = %self.settings.url,
                            max_consecutive_errors = self.settings.max_consecutive_errors,
                            "превышено число ошибок подряд, опрос остановлен"
                        );
                        break;
                    }
                }
            }
        }

        summary
    }
}
