use std::path::Path;
use std::sync::Arc;

use crate::cleanup;
use crate::config::Config;
use crate::downloader::StreamDownloader;
use crate::error::PinError;
use crate::extractor::{
    extract_identifier, is_accepted_link, is_short_link, normalize_link, DownloadResult,
    Extractor, PinReference, VideoDescriptor, VideoInfo,
};
use crate::session::Session;
use crate::shaping::{BrowserProfile, Passthrough, RequestShaper};

/// Entry point: classify, expand, fetch, extract and download pins.
///
/// Holds no mutable state, so one instance can serve concurrent calls. Each
/// call opens its own `Session`.
pub struct PinDownloader {
    config: Config,
    shaper: Arc<dyn RequestShaper>,
    extractor: Extractor,
}

impl PinDownloader {
    pub fn new(config: Config) -> Self {
        let shaper: Arc<dyn RequestShaper> = if config.shaping {
            Arc::new(BrowserProfile::from_config(&config))
        } else {
            Arc::new(Passthrough)
        };

        Self {
            config,
            shaper,
            extractor: Extractor::default(),
        }
    }

    pub fn with_shaper(mut self, shaper: impl RequestShaper + 'static) -> Self {
        self.shaper = Arc::new(shaper);
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_accepted_link(url: &str) -> bool {
        is_accepted_link(url)
    }

    /// Metadata for a pin without downloading anything.
    pub async fn get_video_info(&self, url: &str) -> Result<VideoInfo, PinError> {
        let raw_url = classify(url)?;
        let session = self.open_session()?;
        let pin = resolve(&session, raw_url).await?;
        let descriptor = self.describe(&session, &pin).await?;

        Ok(VideoInfo::new(&pin.pin_id, &descriptor))
    }

    /// Run the whole pipeline and store the video in the output directory.
    pub async fn download_video(&self, url: &str) -> Result<DownloadResult, PinError> {
        let raw_url = classify(url)?;
        let session = self.open_session()?;
        let pin = resolve(&session, raw_url).await?;

        tracing::info!("Starting download of pin {}", pin.pin_id);

        let descriptor = self.describe(&session, &pin).await?;
        if !descriptor.has_video() {
            tracing::error!("No video URL found for pin {}", pin.pin_id);
            return Err(PinError::Extraction(pin.pin_id));
        }

        StreamDownloader::new(&session, &self.config)
            .download(&descriptor, &pin.pin_id)
            .await
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        cleanup::remove_file(path)
    }

    /// Sweep the configured output directory.
    pub fn sweep_older_than(&self, max_age_hours: u64) -> usize {
        cleanup::sweep_older_than(self.config.output_dir(), max_age_hours)
    }

    fn open_session(&self) -> Result<Session, PinError> {
        Session::open(&self.config, self.shaper.clone())
    }

    async fn describe(
        &self,
        session: &Session,
        pin: &PinReference,
    ) -> Result<VideoDescriptor, PinError> {
        let page = session.fetch_page(&pin.canonical_url).await?;
        Ok(self.extractor.describe(&page))
    }
}

fn classify(url: &str) -> Result<String, PinError> {
    if !is_accepted_link(url) {
        tracing::warn!("Not a Pinterest link: {}", url);
        return Err(PinError::InvalidLink(url.to_string()));
    }
    Ok(normalize_link(url))
}

async fn resolve(session: &Session, raw_url: String) -> Result<PinReference, PinError> {
    let canonical_url = if is_short_link(&raw_url) {
        session.expand(&raw_url).await
    } else {
        raw_url.clone()
    };

    let Some(pin_id) = extract_identifier(&canonical_url).filter(|id| !id.is_empty()) else {
        tracing::warn!("Could not extract pin id from {}", canonical_url);
        return Err(PinError::InvalidLink(canonical_url));
    };

    Ok(PinReference {
        raw_url,
        canonical_url,
        pin_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::test_support::test_config;
    use httpmock::prelude::*;

    // Local URLs are accepted through the lenient fallback: a pin path plus
    // the `pinterest` token in the query.
    const PIN_PATH: &str = "/pin/4242/";

    fn pin_url(server: &MockServer) -> String {
        format!("{}?src=pinterest", server.url(PIN_PATH))
    }

    fn video_page(video_url: &str) -> String {
        format!(
            r#"<html><head><title>Dancing cat | Pinterest</title>
<script id="__PWS_DATA__" type="application/json">{{"props": {{"initialReduxState": {{"pins": {{"4242": {{
  "title": "Dancing cat",
  "description": "It dances",
  "images": {{"orig": {{"url": "https://i.pinimg.com/originals/cat.jpg"}}}},
  "videos": {{"video_list": {{"V_720P": {{"url": "{}"}}}}}}
}}}}}}}}}}</script></head></html>"#,
            video_url
        )
    }

    const IMAGE_PAGE: &str = r#"<html><head><title>Living room | Pinterest</title>
<meta property="og:image" content="https://i.pinimg.com/originals/room.jpg">
</head></html>"#;

    fn video_bytes() -> Vec<u8> {
        (0..20_000u32).map(|i| (i % 256) as u8).collect()
    }

    async fn serve_video_pin(server: &MockServer, video: &[u8]) {
        let page = video_page(&server.url("/v/720p.mp4"));
        server
            .mock_async(|when, then| {
                when.method(GET).path(PIN_PATH).query_param("src", "pinterest");
                then.status(200).body(page);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v/720p.mp4");
                then.status(200).body(video);
            })
            .await;
    }

    #[tokio::test]
    async fn test_download_video_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        let video = video_bytes();
        serve_video_pin(&server, &video).await;

        let downloader = PinDownloader::new(test_config(dir.path()));
        let result = downloader.download_video(&pin_url(&server)).await.unwrap();

        assert_eq!(result.pin_id, "4242");
        assert_eq!(result.filesize, video.len() as u64);
        assert_eq!(result.descriptor.title, "Dancing cat");
        assert_eq!(result.descriptor.quality.as_deref(), Some("V_720P"));
        assert_eq!(std::fs::read(&result.filepath).unwrap(), video);

        downloader.remove_file(&result.filepath);
        assert!(!result.filepath.exists());
    }

    #[tokio::test]
    async fn test_concurrent_downloads_of_same_pin() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        let video = video_bytes();
        serve_video_pin(&server, &video).await;

        let downloader = PinDownloader::new(test_config(dir.path()));
        let url = pin_url(&server);
        let (a, b) = tokio::join!(downloader.download_video(&url), downloader.download_video(&url));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.filepath, b.filepath);
        assert_eq!(std::fs::read(&a.filepath).unwrap(), video);
        assert_eq!(std::fs::read(&b.filepath).unwrap(), video);

        downloader.remove_file(&a.filepath);
        assert!(!a.filepath.exists());
        assert_eq!(std::fs::read(&b.filepath).unwrap(), video);
    }

    #[tokio::test]
    async fn test_info_reports_video() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PIN_PATH);
                then.status(200)
                    .body(video_page("https://v.pinimg.com/videos/720p.mp4"));
            })
            .await;

        let info = PinDownloader::new(test_config(dir.path()))
            .get_video_info(&pin_url(&server))
            .await
            .unwrap();

        assert!(info.has_video);
        assert_eq!(info.pin_id, "4242");
        assert_eq!(info.description, "It dances");
        assert_eq!(info.thumbnail, "https://i.pinimg.com/originals/cat.jpg");
    }

    #[tokio::test]
    async fn test_image_only_pin() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PIN_PATH);
                then.status(200).body(IMAGE_PAGE);
            })
            .await;
        let url = pin_url(&server);
        let downloader = PinDownloader::new(test_config(dir.path()));

        let info = downloader.get_video_info(&url).await.unwrap();
        assert!(!info.has_video);
        assert_eq!(info.title, "Living room");
        assert_eq!(info.thumbnail, "https://i.pinimg.com/originals/room.jpg");

        let err = downloader.download_video(&url).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Extract);
    }

    #[tokio::test]
    async fn test_page_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PIN_PATH);
                then.status(404).body("not found");
            })
            .await;

        let err = PinDownloader::new(test_config(dir.path()))
            .get_video_info(&pin_url(&server))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Fetch);
    }

    #[tokio::test]
    async fn test_invalid_link_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = PinDownloader::new(test_config(dir.path()));

        let err = downloader
            .download_video("https://www.youtube.com/watch?v=abc")
            .await
            .unwrap_err();
        assert!(matches!(err, PinError::InvalidLink(_)));

        // Accepted shape, but no pin id to work with
        let err = downloader
            .get_video_info("https://www.pinterest.com/ideas/cats/")
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Classify);
    }

    #[test]
    fn test_sweep_uses_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pinterest_1_1.mp4");
        let file = std::fs::File::create(&path).unwrap();
        file.set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(3 * 3600))
            .unwrap();

        let downloader = PinDownloader::new(test_config(dir.path()));
        assert_eq!(downloader.sweep_older_than(2), 1);
    }

    #[test]
    fn test_downloader_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PinDownloader>();
    }
}
