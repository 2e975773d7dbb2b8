use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const SHORT_LINK_HOST: &str = "pin.it";

// Matched against the trimmed, lower-cased link.
static ACCEPTED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(https?://)?(www\.)?pinterest\.com/pin/[\w-]+",
        r"(https?://)?(www\.)?pin\.it/[\w-]+",
        r"(https?://)?pinterest\.com/.*",
        r"(https?://)?.*\.pinterest\.com/.*",
        r"(https?://)?(br|ar|fr|de|es|it|ru)\.pinterest\.com/.*",
        r"(https?://)?([\w-]+\.)?pinterest\.(com\.[a-z]{2}|co\.[a-z]{2}|[a-z]{2})/pin/[\w-]+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/pin/(\d+)",
        r"pin\.it/([a-zA-Z0-9]+)",
        r"pinterest\.com/pin/(\d+)",
        r"/pin/([a-zA-Z0-9]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Check if a link looks like something we can pull a pin out of.
pub fn is_accepted_link(url: &str) -> bool {
    let url = url.trim().to_lowercase();
    if url.is_empty() {
        return false;
    }

    if ACCEPTED_PATTERNS.iter().any(|re| re.is_match(&url)) {
        return true;
    }

    url.contains("pinterest") && (url.contains("/pin/") || url.contains("/idea"))
}

/// Pull the pin identifier out of a link. `None` for links without one.
pub fn extract_identifier(url: &str) -> Option<String> {
    ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Trim and add a scheme when the user pasted a bare `pin.it/...` or
/// `pinterest.com/...`.
pub fn normalize_link(url: &str) -> String {
    let url = url.trim();
    let lower = url.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

pub fn is_short_link(url: &str) -> bool {
    Url::parse(&normalize_link(url))
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(SHORT_LINK_HOST)))
        .unwrap_or(false)
}
