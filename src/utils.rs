use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static pattern"));

/// Cache key of a URL path: its hex SHA-256.
///
/// Callers pass `Url::path()`, so query string and fragment never reach the key.
pub fn path_key(url_path: &str) -> String {
    format!("{:x}", Sha256::digest(url_path.as_bytes()))
}

/// Cache namespace of a URL: its hostname
pub fn site_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_ascii_lowercase()
}

/// Convert a string to a sanitized filename
pub fn sanitize_filename(name: &str) -> String {
    let name = name.replace("http://", "").replace("https://", "");
    let mut name = UNSAFE_FILENAME_CHARS.replace_all(&name, "_").into_owned();

    // Limit filename length
    if name.len() > 100 {
        name.truncate(100);
    }
    if name.is_empty() || name.chars().all(|c| c == '.') {
        name = "_".to_string();
    }
    name
}

/// Prefix of the temporary screenshot file for a URL: `<host>-<last path segment>-`
pub fn screenshot_prefix(url: &Url) -> String {
    let base_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    format!("{}-", sanitize_filename(&format!("{}-{}", site_of(url), base_name)))
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_ignores_query_string() {
        let a = Url::parse("https://shop.example.com/item/42?color=red").unwrap();
        let b = Url::parse("https://shop.example.com/item/42?color=blue#top").unwrap();
        let c = Url::parse("https://shop.example.com/item/43").unwrap();
        assert_eq!(path_key(a.path()), path_key(b.path()));
        assert_ne!(path_key(a.path()), path_key(c.path()));
    }

    #[test]
    fn test_cache_key_is_sha256_hex_of_path() {
        let url = Url::parse("http://example.com").unwrap();
        // sha256("/")
        assert_eq!(
            path_key(url.path()),
            "8a5edab282632443219e051e4ade2d1d5bbc671c781051bf1437897cbdfea0f1"
        );
    }

    #[test]
    fn test_site_is_hostname() {
        let url = Url::parse("https://Shop.Example.com:8443/a").unwrap();
        assert_eq!(site_of(&url), "shop.example.com");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("https://example.com/a?b=c&d"),
            "example.com_a_b_c_d"
        );
        assert_eq!(sanitize_filename(".."), "_");
        assert_eq!(sanitize_filename(&"x".repeat(300)).len(), 100);
    }

    #[test]
    fn test_screenshot_prefix() {
        let url = Url::parse("http://example.com/products/shoe.html").unwrap();
        assert_eq!(screenshot_prefix(&url), "example.com-shoe.html-");

        let root = Url::parse("http://example.com").unwrap();
        assert_eq!(screenshot_prefix(&root), "example.com--");
    }
}
