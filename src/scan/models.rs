use anyhow::Error;

use crate::reflection::Reflection;

/// One target ready to be probed
///
/// Built once per input line after redirect resolution and consumed by
/// exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTask {
    /// Input URL with a trailing slash
    pub original_url: String,
    /// URL reached after following redirects
    pub final_url: String,
    /// `scheme://host[:port]` of `final_url`, without trailing slash
    pub origin: String,
    /// Path of `final_url` ending with `/`, or empty when it did not parse
    pub path: String,
}

impl ProbeTask {
    /// Whether redirect resolution landed somewhere else
    pub fn was_redirected(&self) -> bool {
        self.original_url != self.final_url
    }

    /// The URL that was actually probed, without marker
    pub fn display_url(&self) -> String {
        format!("{}{}", self.origin, self.path)
    }
}

/// A task together with what probing it produced
#[derive(Debug)]
pub struct ProbeOutcome {
    pub task: ProbeTask,
    pub result: Result<Reflection, Error>,
}

impl ProbeOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(&self.result, Ok(reflection) if reflection.is_hit())
    }

    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}
