use anyhow::{Context, Result};
use reqwest::Client;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, instrument, trace};

use crate::scan::config::ScanConfig;

/// Marker appended to the probed path. Unusual enough not to appear in
/// ordinary page content.
pub const DEFAULT_MARKER: &str = "smhtahxssin33";

/// Characters appended to the marker during the character phase
pub const SPECIAL_CHARS: [char; 12] = ['"', '\'', '<', '>', '$', '|', '(', ')', ':', ';', '{', '}'];

/// Outcome of probing one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reflection {
    /// The marker never came back
    None,
    /// The marker came back but every special character was escaped or dropped
    Basic,
    /// These characters came back verbatim right after the marker
    Characters(BTreeSet<char>),
}

impl Reflection {
    /// Whether this outcome should be reported
    pub fn is_hit(&self) -> bool {
        !matches!(self, Reflection::None)
    }

    /// Reflected characters, empty unless some survived unescaped
    pub fn characters(&self) -> Vec<char> {
        match self {
            Reflection::Characters(chars) => chars.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_basic(&self) -> bool {
        matches!(self, Reflection::Basic)
    }
}

impl fmt::Display for Reflection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reflection::None => write!(f, "none"),
            Reflection::Basic => write!(f, "[basic]"),
            Reflection::Characters(chars) => {
                let chars: Vec<String> = chars.iter().map(char::to_string).collect();
                write!(f, "[{}]", chars.join(" "))
            }
        }
    }
}

/// Checks whether a path reflects request input into the response body
///
/// Probing runs in two phases. The marker phase requests
/// `origin + path + marker` and looks for the marker in the body. Only when
/// it is found does the character phase request `origin + path + marker + c`
/// for every character in [`SPECIAL_CHARS`], recording `c` when the exact
/// string `marker + c` comes back. Requests run strictly one after another.
#[derive(Debug, Clone)]
pub struct ReflectionProber {
    client: Client,
    marker: String,
}

impl ReflectionProber {
    /// Creates a prober with a client built from `config`
    pub fn new(config: &ScanConfig) -> Result<Self> {
        let client = config.build_client(config.probe_redirect_policy())?;
        Ok(Self::with_client(client, &config.marker))
    }

    pub fn with_client(client: Client, marker: &str) -> Self {
        Self {
            client,
            marker: marker.to_string(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Probes `origin + path`. Any request or body read failure aborts the
    /// probe and is returned.
    #[instrument(level = "debug", skip(self))]
    pub async fn probe(&self, origin: &str, path: &str) -> Result<Reflection> {
        let marker_url = format!("{}{}{}", origin, path, self.marker);
        let body = self.fetch_body(&marker_url).await?;

        if !body.contains(&self.marker) {
            debug!("No reflection for marker {} in URL {}", self.marker, marker_url);
            return Ok(Reflection::None);
        }
        debug!("Marker reflected at {}, probing special characters", marker_url);

        let mut reflected = BTreeSet::new();
        for ch in SPECIAL_CHARS {
            let probe_url = format!("{}{}", marker_url, ch);
            let body = self.fetch_body(&probe_url).await?;

            if reflects_verbatim(&body, &self.marker, ch) {
                trace!("Character {:?} reflected at {}", ch, probe_url);
                reflected.insert(ch);
            }
        }

        let result = if reflected.is_empty() {
            Reflection::Basic
        } else {
            Reflection::Characters(reflected)
        };
        info!("Reflection at {}{}: {}", origin, path, result);

        Ok(result)
    }

    async fn fetch_body(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;
        trace!("Response status {} from {}", resp.status(), url);

        resp.text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))
    }
}

/// True when `marker` immediately followed by `ch` appears in `body`
pub fn reflects_verbatim(body: &str, marker: &str, ch: char) -> bool {
    let mut needle = String::with_capacity(marker.len() + ch.len_utf8());
    needle.push_str(marker);
    needle.push(ch);
    body.contains(&needle)
}
