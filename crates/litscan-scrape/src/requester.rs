//! Remote client: a transport seam, throttling, and a scoped session.
//!
//! A [`Session`] is obtained from [`Requester::open`] at the start of a run.
//! Dropping it closes the request log, so the session is released on every
//! exit path including `?` propagation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument};

use litscan_common::config::RequestConfig;
use litscan_common::sandbox::SandboxClient;
use litscan_common::{LitscanError, Result};

use crate::document::Document;
use crate::urls::Target;

/// Raw GET of a fully composed URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

/// Transport over the allowlisted HTTP client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: SandboxClient,
}

impl HttpTransport {
    /// The host of `base_url` plus any configured extra domains are allowed.
    pub fn new(config: &RequestConfig, base_url: &str) -> Result<Self> {
        let mut client = SandboxClient::new(config.timeout())?;
        client.allow_host_of(base_url)?;
        for domain in &config.allowed_domains {
            client.allow_domain(domain);
        }
        Ok(Self { client })
    }
}

fn transient(url: &str, reason: impl ToString) -> LitscanError {
    LitscanError::TransientFetch { target: url.to_string(), reason: reason.to_string() }
}

fn malformed(url: &str, reason: impl ToString) -> LitscanError {
    LitscanError::MalformedResponse { target: url.to_string(), reason: reason.to_string() }
}

fn classify(url: &str, err: reqwest::Error) -> LitscanError {
    if err.is_decode() {
        malformed(url, err)
    } else {
        // timeouts, refused connections, truncated bodies
        transient(url, err)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url)?.send().await.map_err(|e| classify(url, e))?;

        let status = resp.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(transient(url, format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(malformed(url, format!("HTTP {status}")));
        }

        resp.text().await.map_err(|e| classify(url, e))
    }
}

/// Bookkeeping for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLog {
    pub is_active: bool,
    pub n_requests: u64,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Owns the transport and spaces out consecutive requests.
pub struct Requester<T: Transport> {
    transport: T,
    min_interval: Option<Duration>,
    last_request: Option<Instant>,
    log: RequestLog,
}

impl<T: Transport> Requester<T> {
    pub fn new(transport: T, min_interval: Option<Duration>) -> Self {
        Self { transport, min_interval, last_request: None, log: RequestLog::default() }
    }

    pub fn from_config(transport: T, config: &RequestConfig) -> Self {
        Self::new(transport, config.min_interval())
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn log(&self) -> &RequestLog {
        &self.log
    }

    /// Start a session; the request counter restarts.
    pub fn open(&mut self) -> Session<'_, T> {
        self.log = RequestLog {
            is_active: true,
            n_requests: 0,
            opened_at: Some(Utc::now()),
            closed_at: None,
        };
        debug!("Opened request session");
        Session { requester: self }
    }

    fn close(&mut self) {
        if self.log.is_active {
            self.log.is_active = false;
            self.log.closed_at = Some(Utc::now());
            debug!(n_requests = self.log.n_requests, "Closed request session");
        }
    }

    async fn throttle(&mut self) {
        if let (Some(interval), Some(last)) = (self.min_interval, self.last_request) {
            let ready_at = last + interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    async fn get_text(&mut self, target: &Target) -> Result<String> {
        self.throttle().await;
        self.log.n_requests += 1;
        self.transport.get(&target.url).await
    }
}

/// An open session. Closes the request log when dropped.
pub struct Session<'a, T: Transport> {
    requester: &'a mut Requester<T>,
}

impl<T: Transport> Session<'_, T> {
    /// Issue `target` and parse the body in the target's format.
    #[instrument(skip(self), fields(endpoint = %target.endpoint))]
    pub async fn fetch(&mut self, target: &Target) -> Result<Document> {
        let body = self.requester.get_text(target).await?;
        Document::parse(&body, target.format()).map_err(|e| malformed(&target.url, e))
    }

    pub fn log(&self) -> &RequestLog {
        self.requester.log()
    }

    /// Close explicitly and return the final log.
    pub fn finish(self) -> RequestLog {
        self.requester.close();
        self.requester.log.clone()
    }
}

impl<T: Transport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.requester.close();
    }
}
