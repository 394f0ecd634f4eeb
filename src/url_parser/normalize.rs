/// Path separator every normalized URL ends with
pub const PATH_SEPARATOR: char = '/';

/// Ensures the URL carries a trailing path separator
///
/// Markers are appended directly after the path, so a URL such as
/// `http://example.com/app` has to become `http://example.com/app/` before
/// anything is concatenated onto it. Never fails; any string is accepted.
pub fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with(PATH_SEPARATOR) {
        url.to_string()
    } else {
        format!("{}{}", url, PATH_SEPARATOR)
    }
}
