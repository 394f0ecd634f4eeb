use tracing::{debug, trace};
use url::Url;

use super::normalize::ensure_trailing_slash;

/// Splits a URL into its origin (`scheme://host[:port]`) and a path that
/// always ends with `/`
///
/// Query string and fragment are dropped so probe markers land after the
/// path instead of inside a parameter. When the input does not parse the
/// whole string is returned as the origin with an empty path.
pub fn split_origin_and_path(input: &str) -> (String, String) {
    let parsed = match Url::parse(input) {
        Ok(url) => url,
        Err(e) => {
            debug!("Could not parse {} for decomposition: {}", input, e);
            return (input.to_string(), String::new());
        }
    };

    let origin = origin_of(&parsed);
    let path = ensure_trailing_slash(parsed.path());
    trace!("Decomposed {} into origin={} path={}", input, origin, path);

    (origin, path)
}

/// `scheme://host[:port]` of an already parsed URL, with no trailing slash
pub fn origin_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or("");
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}
