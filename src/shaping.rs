//! Per-request header rotation and pacing.
//!
//! `BrowserProfile` sends a freshly drawn desktop-browser header set with every
//! request and spaces page fetches out by a random delay.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL,
    DNT, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::time::Duration;

use crate::config::Config;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

const SEC_GPC: HeaderName = HeaderName::from_static("sec-gpc");

/// Decides the headers and pacing of every outgoing request.
pub trait RequestShaper: Send + Sync {
    /// Headers for one request. Called again for every request.
    fn headers(&self) -> HeaderMap;

    /// How long to wait before fetching a page.
    fn pause(&self) -> Duration;
}

/// Randomised desktop-browser profile.
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    min_delay: Duration,
    max_delay: Duration,
}

impl BrowserProfile {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay: min_delay.min(max_delay),
            max_delay: max_delay.max(min_delay),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

impl Default for BrowserProfile {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}

impl RequestShaper for BrowserProfile {
    fn headers(&self) -> HeaderMap {
        let mut rng = rand::thread_rng();
        let mut headers = HeaderMap::new();

        let agent = USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0]);
        headers.insert(USER_AGENT, HeaderValue::from_static(agent));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        // No brotli: the client only decodes gzip and deflate
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

        // Zero or one decoy header
        if rng.gen_bool(0.5) {
            let decoy = if rng.gen_bool(0.5) { DNT } else { SEC_GPC };
            headers.insert(decoy, HeaderValue::from_static("1"));
        }

        headers
    }

    fn pause(&self) -> Duration {
        if self.min_delay == self.max_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }
}

/// No extra headers and no delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl RequestShaper for Passthrough {
    fn headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    fn pause(&self) -> Duration {
        Duration::ZERO
    }
}
