use tracing::{debug, instrument};

use crate::reflection::ReflectionProber;
use crate::scan::models::{ProbeOutcome, ProbeTask};
use crate::url_crawler::RedirectResolver;
use crate::url_parser::{ensure_trailing_slash, split_origin_and_path};

/// Turns one input line into a probe task
///
/// The line is normalized, its redirects are followed and the final URL is
/// split into origin and path. None of these steps fail; a target that
/// cannot be resolved or parsed is probed as given.
#[instrument(level = "debug", skip(resolver))]
pub async fn prepare_task(resolver: &RedirectResolver, line: &str) -> ProbeTask {
    let original_url = ensure_trailing_slash(line);
    let final_url = resolver.resolve(&original_url).await;
    let (origin, path) = split_origin_and_path(&final_url);

    if path.is_empty() {
        debug!("Could not split {} into origin and path, probing it as given", final_url);
    }

    ProbeTask {
        original_url,
        final_url,
        origin,
        path,
    }
}

/// Runs the reflection probe for one task. Failures are carried in the
/// outcome and reported once by its consumer.
pub async fn probe_task(prober: &ReflectionProber, task: ProbeTask) -> ProbeOutcome {
    let result = prober.probe(&task.origin, &task.path).await;
    if let Err(e) = &result {
        debug!("Probe failed for {}{}: {:#}", task.origin, task.path, e);
    }

    ProbeOutcome { task, result }
}
