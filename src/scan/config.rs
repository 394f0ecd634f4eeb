use anyhow::{Context, Result};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tracing::debug;

use crate::reflection::DEFAULT_MARKER;

// Defaults for the probing pipeline
pub const DEFAULT_WORKERS: usize = 40;
pub const QUEUE_SIZE: usize = 100;
pub const MAX_REDIRECTS: usize = 10;
const REQUEST_TIMEOUT: u64 = 30; // seconds
const CONNECT_TIMEOUT: u64 = 15; // seconds
const TCP_KEEPALIVE: u64 = 1; // seconds

/// Desktop Chrome User-Agent sent with every request. Some servers and WAFs
/// answer non-browser clients differently.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/80.0.3987.100 Safari/537.36";

/// Configuration for a scan run
///
/// Constructed once by the caller and handed to the resolver, the prober and
/// the worker pool. Nothing in the pipeline reads process-wide state.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    // Concurrency
    pub workers: usize,
    pub queue_size: usize,

    // Redirect handling
    pub max_redirects: usize,

    // Transport
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub accept_invalid_certs: bool,
    pub user_agent: String,

    // Detection
    pub marker: String,
    pub debug: bool,
}

impl ScanConfig {
    /// Creates a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of concurrent probe workers (at least one)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets the capacity of the task queue feeding the workers
    pub fn with_queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size.max(1);
        self
    }

    /// Sets the maximum number of redirect hops to follow
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Sets the overall per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the timeout for establishing new connections
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether invalid TLS certificates are accepted
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Sets the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the marker injected into probe paths
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Enables debug diagnostics
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builds an HTTP client from this configuration
    ///
    /// The redirect resolver walks hops itself and passes `Policy::none()`;
    /// the prober lets the transport follow up to `max_redirects` hops.
    pub fn build_client(&self, redirect: Policy) -> Result<Client> {
        debug!(
            "Building HTTP client: timeout={:?}, connect_timeout={:?}, accept_invalid_certs={}",
            self.request_timeout, self.connect_timeout, self.accept_invalid_certs
        );

        Client::builder()
            .redirect(redirect)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .tcp_keepalive(Duration::from_secs(TCP_KEEPALIVE))
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .user_agent(self.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")
    }

    /// Redirect policy for probe requests
    pub fn probe_redirect_policy(&self) -> Policy {
        Policy::limited(self.max_redirects)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_size: QUEUE_SIZE,

            max_redirects: MAX_REDIRECTS,

            request_timeout: Duration::from_secs(REQUEST_TIMEOUT),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT),
            accept_invalid_certs: true,
            user_agent: BROWSER_USER_AGENT.to_string(),

            marker: DEFAULT_MARKER.to_string(),
            debug: false,
        }
    }
}
