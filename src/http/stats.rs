//! Best-effort usage statistics.
//!
//! Every successful jump can be reported to an external collector. Reports
//! are fire-and-forget: failures are logged at debug and never reach the
//! client.

use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::observability::metrics;

const SUBMIT_TIMEOUT: Duration = Duration::from_millis(100);

/// One redirect as seen by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: String,
    pub from_ip: String,
    /// Unix epoch milliseconds.
    pub ts: u64,
    pub file_name: String,
    pub service: String,
    pub dest: String,
    pub referer: String,
}

impl LogRecord {
    /// `path` is the service name followed by the requested resource.
    pub fn new(from_ip: IpAddr, server: &str, path: &str, referer: &str) -> Self {
        let mut segments = path.trim_start_matches('/').splitn(2, '/');
        let service = segments.next().unwrap_or_default().to_string();
        let file_name = segments.next().unwrap_or_default().to_string();

        let dest = server
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .to_string();

        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4().to_string(),
            from_ip: from_ip.to_string(),
            ts,
            file_name,
            service,
            dest,
            referer: referer.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("remote call failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("bad status code {status}, body {body}")]
    BadStatus { status: StatusCode, body: String },
}

/// Posts `LogRecord`s to the collector.
#[derive(Debug, Clone)]
pub struct StatsSubmitter {
    client: Client,
    url: String,
}

impl StatsSubmitter {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(SUBMIT_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn submit(&self, record: &LogRecord) -> Result<(), StatsError> {
        let response = self.client.post(&self.url).json(record).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(StatsError::BadStatus { status, body });
        }
        Ok(())
    }

    /// Submit in the background; the caller never waits.
    pub fn spawn_submit(&self, record: LogRecord) {
        let submitter = self.clone();
        tokio::spawn(async move {
            let result = submitter.submit(&record).await;
            metrics::record_stats_submission(result.is_ok());
            if let Err(e) = result {
                tracing::debug!(error = %e, "Can't submit stats");
            }
        });
    }
}
