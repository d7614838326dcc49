use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::LitscanError;

/// Hosts every client may reach without extra configuration.
const DEFAULT_ALLOWED: &[&str] = &[
    "eutils.ncbi.nlm.nih.gov", // PubMed E-utilities
    "localhost",
    "127.0.0.1",
];

/// An HTTP client that only allows requests to approved domains.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, LitscanError> {
        let allowlist = DEFAULT_ALLOWED.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("litscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LitscanError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        if self.allowlist.insert(domain.to_string()) {
            debug!(domain, "Added to HTTP allowlist");
        }
    }

    /// Appends the host of a URL to the allowlist.
    pub fn allow_host_of(&mut self, url: &str) -> Result<(), LitscanError> {
        let parsed = Url::parse(url)
            .map_err(|e| LitscanError::Configuration(format!("Invalid URL {}: {}", url, e)))?;
        match parsed.host_str() {
            Some(host) => {
                self.allow_domain(host);
                Ok(())
            }
            None => Err(LitscanError::Configuration(format!("URL has no host: {}", url))),
        }
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Builds a GET request for an allowed URL.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, LitscanError> {
        if !self.is_allowed(url) {
            warn!(url, "Blocked request outside allowlist");
            return Err(LitscanError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}
