#[cfg(test)]
mod tests {
    use crate::url_parser::{ensure_trailing_slash, split_origin_and_path};

    // Input lines go through the normalizer before decomposition
    #[test]
    fn test_normalized_input_decomposes_to_root() {
        let normalized = ensure_trailing_slash("http://example.com");
        let (origin, path) = split_origin_and_path(&normalized);

        assert_eq!(normalized, "http://example.com/");
        assert_eq!(origin, "http://example.com");
        assert_eq!(path, "/");
    }

    #[test]
    fn test_query_does_not_leak_into_path() {
        let normalized = ensure_trailing_slash("https://example.com/app?next=/admin");
        let (origin, path) = split_origin_and_path(&normalized);

        // The slash appended after the query belongs to the query, so the
        // path picks up its own separator
        assert_eq!(origin, "https://example.com");
        assert_eq!(path, "/app/");
    }

    #[test]
    fn test_default_port_is_dropped() {
        let (origin, _) = split_origin_and_path("https://example.com:443/");
        assert_eq!(origin, "https://example.com");
    }
}
