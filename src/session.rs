use reqwest::header::REFERER;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;

use crate::config::Config;
use crate::error::PinError;
use crate::shaping::RequestShaper;

pub const SITE_ROOT: &str = "https://www.pinterest.com/";

/// HTTP state for a single pipeline call.
///
/// Opened at the start of `get_video_info` / `download_video` and dropped on
/// every exit path, so the connection pool never outlives the call.
pub struct Session {
    client: Client,
    shaper: Arc<dyn RequestShaper>,
}

impl Session {
    pub fn open(config: &Config, shaper: Arc<dyn RequestShaper>) -> Result<Self, PinError> {
        // Caps idle connections only
        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.max_connections)
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .hickory_dns(true)
            .gzip(true)
            .deflate(true);

        if !config.system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(PinError::Client)?;
        Ok(Self { client, shaper })
    }

    /// Follow a short link to its canonical pin URL.
    ///
    /// Never fails: on any network error the input URL is returned unchanged.
    pub async fn expand(&self, url: &str) -> String {
        match self.try_expand(url).await {
            Ok(resolved) => {
                tracing::info!("Expanded {} -> {}", url, resolved);
                resolved
            }
            Err(e) => {
                tracing::warn!("{}", e);
                url.to_string()
            }
        }
    }

    async fn try_expand(&self, url: &str) -> Result<String, PinError> {
        let resp = self
            .client
            .head(url)
            .headers(self.shaper.headers())
            .send()
            .await
            .map_err(|e| PinError::ResolutionDegraded {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(resp.url().to_string())
    }

    /// Fetch a pin page as text, after the shaper's pause.
    pub async fn fetch_page(&self, url: &str) -> Result<String, PinError> {
        let pause = self.shaper.pause();
        if !pause.is_zero() {
            tracing::debug!("Waiting {:?} before fetching {}", pause, url);
            tokio::time::sleep(pause).await;
        }

        let resp = self
            .client
            .get(url)
            .headers(self.shaper.headers())
            .send()
            .await
            .map_err(|e| PinError::page_fetch(url, e))?;

        if resp.status() != StatusCode::OK {
            tracing::warn!("Page fetch failed: {}", resp.status());
            return Err(PinError::page_fetch(
                url,
                format!("HTTP error: {}", resp.status()),
            ));
        }

        resp.text().await.map_err(|e| PinError::page_fetch(url, e))
    }

    /// Start a video GET. The body is left unread for the caller to stream.
    pub async fn get_video(&self, url: &str) -> Result<Response, PinError> {
        let resp = self
            .client
            .get(url)
            .headers(self.shaper.headers())
            .header(REFERER, SITE_ROOT)
            .send()
            .await
            .map_err(|e| PinError::download(url, e))?;

        if resp.status() != StatusCode::OK {
            return Err(PinError::download(
                url,
                format!("HTTP error: {}", resp.status()),
            ));
        }

        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::shaping::{BrowserProfile, Passthrough};
    use crate::test_support::test_config;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;
    use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn session_with(shaper: Arc<dyn RequestShaper>) -> Session {
        let dir = std::env::temp_dir();
        Session::open(&test_config(&dir), shaper).unwrap()
    }

    fn session() -> Session {
        session_with(Arc::new(Passthrough))
    }

    /// Counts calls and tags each request with a marker header.
    struct CountingShaper {
        headers: AtomicUsize,
        pauses: AtomicUsize,
        pause: Duration,
    }

    impl CountingShaper {
        fn new(pause: Duration) -> Self {
            Self {
                headers: AtomicUsize::new(0),
                pauses: AtomicUsize::new(0),
                pause,
            }
        }
    }

    impl RequestShaper for CountingShaper {
        fn headers(&self) -> HeaderMap {
            self.headers.fetch_add(1, Ordering::SeqCst);
            let mut headers = HeaderMap::new();
            headers.insert(USER_AGENT, HeaderValue::from_static("counting-agent"));
            headers
        }

        fn pause(&self) -> Duration {
            self.pauses.fetch_add(1, Ordering::SeqCst);
            self.pause
        }
    }

    #[tokio::test]
    async fn test_fetch_page_ok() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pin/1/");
                then.status(200).body("<html>pin</html>");
            })
            .await;

        let page = session().fetch_page(&server.url("/pin/1/")).await.unwrap();
        assert_eq!(page, "<html>pin</html>");
    }

    #[tokio::test]
    async fn test_fetch_page_non_200() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pin/1/");
                then.status(403).body("blocked");
            })
            .await;

        let err = session().fetch_page(&server.url("/pin/1/")).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Fetch);
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_expand_follows_redirect() {
        let server = MockServer::start_async().await;
        let target = server.url("/pin/123456/");
        server
            .mock_async(|when, then| {
                when.method(HEAD).path("/abc");
                then.status(301).header("Location", &target);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(HEAD).path("/pin/123456/");
                then.status(200);
            })
            .await;

        let resolved = session().expand(&server.url("/abc")).await;
        assert_eq!(resolved, target);
    }

    #[tokio::test]
    async fn test_expand_degrades_to_original() {
        // Nothing listens on a dropped listener's port
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/abc", listener.local_addr().unwrap());
        drop(listener);

        assert_eq!(session().expand(&url).await, url);
    }

    #[tokio::test]
    async fn test_video_request_sends_referer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v/clip.mp4")
                    .header("referer", SITE_ROOT);
                then.status(200).body("video");
            })
            .await;

        let resp = session().get_video(&server.url("/v/clip.mp4")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_browser_profile_headers_are_sent() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/pin/1/")
                    .header_exists("user-agent")
                    .header("accept-language", "en-US,en;q=0.9")
                    .header("sec-fetch-mode", "navigate");
                then.status(200).body("<html>pin</html>");
            })
            .await;
        let short = server
            .mock_async(|when, then| {
                when.method(HEAD).path("/abc").header_exists("user-agent");
                then.status(200);
            })
            .await;

        let session = session_with(Arc::new(BrowserProfile::new(Duration::ZERO, Duration::ZERO)));
        session.fetch_page(&server.url("/pin/1/")).await.unwrap();
        session.expand(&server.url("/abc")).await;

        page.assert_async().await;
        short.assert_async().await;
    }

    #[tokio::test]
    async fn test_shaper_consulted_per_request() {
        let server = MockServer::start_async().await;
        let tagged = server
            .mock_async(|when, then| {
                when.header("user-agent", "counting-agent");
                then.status(200).body("ok");
            })
            .await;

        let shaper = Arc::new(CountingShaper::new(Duration::from_millis(150)));
        let session = session_with(shaper.clone());

        let started = Instant::now();
        session.fetch_page(&server.url("/pin/1/")).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(shaper.pauses.load(Ordering::SeqCst), 1);
        assert_eq!(shaper.headers.load(Ordering::SeqCst), 1);

        session.get_video(&server.url("/v/clip.mp4")).await.unwrap();
        session.expand(&server.url("/abc")).await;

        // Only page fetches are paced
        assert_eq!(shaper.pauses.load(Ordering::SeqCst), 1);
        assert_eq!(shaper.headers.load(Ordering::SeqCst), 3);
        tagged.assert_hits_async(3).await;
    }
}
