use anyhow::{Context, Result};
use reqwest::{header::LOCATION, redirect::Policy, Client, StatusCode};
use std::collections::HashSet;
use tracing::{debug, info, instrument, trace, warn};
use url::Url;

use crate::scan::config::ScanConfig;
use crate::url_parser::ensure_trailing_slash;

/// Result of walking a URL's redirect chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectResult {
    /// Every URL requested, starting with the input URL
    pub chain: Vec<String>,
    /// Number of redirects followed
    pub hop_count: usize,
}

impl RedirectResult {
    fn new(start_url: &str) -> Self {
        Self {
            chain: vec![start_url.to_string()],
            hop_count: 0,
        }
    }

    /// The last URL reached
    pub fn final_url(&self) -> &str {
        self.chain.last().map(String::as_str).unwrap_or_default()
    }
}

/// What a single hop told us about the next one
enum Hop {
    Final,
    Redirect(String),
}

/// Follows HTTP redirects to find the URL a target really lands on
///
/// Only 3xx responses (other than 304) that carry a `Location` header are
/// followed, at most `max_redirects` times. Failures never propagate: the
/// chain stops at the last URL that was reached.
#[derive(Debug, Clone)]
pub struct RedirectResolver {
    client: Client,
    max_redirects: usize,
}

impl RedirectResolver {
    /// Creates a resolver with its own non-following client
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let client = config.build_client(Policy::none())?;
        Ok(Self::with_client(client, config.max_redirects))
    }

    /// Creates a resolver around an existing client. The client must not
    /// follow redirects on its own.
    pub fn with_client(client: Client, max_redirects: usize) -> Self {
        Self { client, max_redirects }
    }

    /// Resolves `start_url` and returns only the final URL
    pub async fn resolve(&self, start_url: &str) -> String {
        self.resolve_chain(start_url).await.final_url().to_string()
    }

    /// Walks the redirect chain starting at `start_url`
    #[instrument(level = "debug", skip_all, fields(url = %start_url))]
    pub async fn resolve_chain(&self, start_url: &str) -> RedirectResult {
        let mut result = RedirectResult::new(start_url);
        let mut visited = HashSet::with_capacity(self.max_redirects + 1);
        let mut current_url = start_url.to_string();
        visited.insert(current_url.clone());

        loop {
            trace!("Requesting {} (hop {}/{})", current_url, result.hop_count, self.max_redirects);
            let next_url = match self.next_hop(&current_url).await {
                Ok(Hop::Final) => break,
                Ok(Hop::Redirect(next_url)) => next_url,
                Err(e) => {
                    debug!("Redirect resolution stopped at {}: {:#}", current_url, e);
                    break;
                }
            };

            if result.hop_count >= self.max_redirects {
                warn!("Max redirect hops ({}) reached at {}", self.max_redirects, current_url);
                break;
            }
            if !visited.insert(next_url.clone()) {
                warn!("Redirect loop detected at {} -> {}", current_url, next_url);
                break;
            }

            debug!("Following redirect {} -> {}", current_url, next_url);
            result.chain.push(next_url.clone());
            result.hop_count += 1;
            current_url = next_url;
        }

        if result.hop_count > 0 {
            info!("Resolved {} to {} in {} hop(s)", start_url, result.final_url(), result.hop_count);
        }
        result
    }

    async fn next_hop(&self, current_url: &str) -> Result<Hop> {
        let resp = self
            .client
            .get(current_url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", current_url))?;

        let status = resp.status();
        trace!("Response status {} from {}", status, current_url);
        if !status.is_redirection() || status == StatusCode::NOT_MODIFIED {
            return Ok(Hop::Final);
        }

        let Some(location) = resp.headers().get(LOCATION) else {
            warn!("Redirect status {} without Location header at {}", status, current_url);
            return Ok(Hop::Final);
        };
        let location = location
            .to_str()
            .context("Failed to parse redirect location header")?;

        let next_url = resolve_location(current_url, location)?;
        Ok(Hop::Redirect(ensure_trailing_slash(&next_url)))
    }
}

/// Turns a `Location` header value into an absolute URL
///
/// Absolute values are used as they are; anything else is joined against the
/// URL that produced the redirect.
pub fn resolve_location(current_url: &str, location: &str) -> Result<String> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return Ok(location.to_string());
    }

    let base = Url::parse(current_url)
        .with_context(|| format!("Failed to parse {} as base for relative redirect", current_url))?;
    let joined = base
        .join(location)
        .with_context(|| format!("Failed to resolve relative redirect {}", location))?;

    Ok(joined.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn resolver(max_redirects: usize) -> RedirectResolver {
        RedirectResolver::new(&ScanConfig::new().with_max_redirects(max_redirects))
            .expect("client should build")
    }

    #[test]
    fn test_resolve_location_absolute() {
        let next = resolve_location("http://a.test/x/", "https://b.test/y").unwrap();
        assert_eq!(next, "https://b.test/y");
    }

    #[test]
    fn test_resolve_location_relative() {
        let next = resolve_location("http://a.test:8080/x/?q=1", "/new/").unwrap();
        assert_eq!(next, "http://a.test:8080/new/");

        let next = resolve_location("http://a.test/x/", "y/").unwrap();
        assert_eq!(next, "http://a.test/x/y/");
    }

    #[tokio::test]
    async fn test_no_redirect_returns_input() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/").with_status(200).create_async().await;

        let start = format!("{}/", server.url());
        let result = resolver(10).resolve_chain(&start).await;

        assert_eq!(result.final_url(), start);
        assert_eq!(result.hop_count, 0);
        assert_eq!(result.chain, vec![start]);
    }

    #[tokio::test]
    async fn test_follows_relative_redirect() {
        let mut server = Server::new_async().await;
        let _m1 = server
            .mock("GET", "/")
            .with_status(301)
            .with_header("location", "/new")
            .create_async()
            .await;
        let _m2 = server.mock("GET", "/new/").with_status(200).create_async().await;

        let start = format!("{}/", server.url());
        let final_url = resolver(10).resolve(&start).await;

        assert_eq!(final_url, format!("{}/new/", server.url()));
    }

    #[tokio::test]
    async fn test_location_on_non_redirect_status_is_ignored() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("location", "/elsewhere/")
            .create_async()
            .await;

        let start = format!("{}/", server.url());
        assert_eq!(resolver(10).resolve(&start).await, start);
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_final() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/").with_status(302).create_async().await;

        let start = format!("{}/", server.url());
        assert_eq!(resolver(10).resolve(&start).await, start);
    }

    #[tokio::test]
    async fn test_hop_cap_returns_last_fetched_url() {
        let mut server = Server::new_async().await;
        let mut mocks = Vec::new();
        for i in 0..5 {
            mocks.push(
                server
                    .mock("GET", format!("/{}/", i).as_str())
                    .with_status(302)
                    .with_header("location", &format!("/{}/", i + 1))
                    .create_async()
                    .await,
            );
        }

        let start = format!("{}/0/", server.url());
        let result = resolver(2).resolve_chain(&start).await;

        assert_eq!(result.hop_count, 2);
        assert_eq!(result.final_url(), format!("{}/2/", server.url()));
    }

    #[tokio::test]
    async fn test_redirect_loop_stops() {
        let mut server = Server::new_async().await;
        let _a = server
            .mock("GET", "/a/")
            .with_status(302)
            .with_header("location", "/b/")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b/")
            .with_status(302)
            .with_header("location", "/a/")
            .create_async()
            .await;

        let start = format!("{}/a/", server.url());
        let result = resolver(10).resolve_chain(&start).await;

        assert_eq!(result.hop_count, 1);
        assert_eq!(result.final_url(), format!("{}/b/", server.url()));
    }

    #[tokio::test]
    async fn test_transport_error_returns_input() {
        // Nothing listens on port 9 of the loopback interface
        let start = "http://127.0.0.1:9/";
        assert_eq!(resolver(10).resolve(start).await, start);
    }

    #[tokio::test]
    async fn test_unparseable_url_returns_input() {
        let start = "definitely not a url/";
        assert_eq!(resolver(10).resolve(start).await, start);
    }
}
