use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_TITLE: &str = "Pinterest Video";

/// A link after classification and short-link expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinReference {
    pub raw_url: String,
    pub canonical_url: String,
    pub pin_id: String,
}

/// What the extractors found on a pin page.
///
/// An empty `video_url` means the pin carries no video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub video_url: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl VideoDescriptor {
    pub fn has_video(&self) -> bool {
        !self.video_url.is_empty()
    }
}

/// Result of `get_video_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub pin_id: String,
    pub has_video: bool,
}

impl VideoInfo {
    pub fn new(pin_id: &str, descriptor: &VideoDescriptor) -> Self {
        Self {
            title: descriptor.title.clone(),
            description: descriptor.description.clone(),
            thumbnail: descriptor.thumbnail.clone(),
            pin_id: pin_id.to_string(),
            has_video: descriptor.has_video(),
        }
    }
}

/// A video stored on disk. The caller owns `filepath` and must clean it up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadResult {
    pub filepath: PathBuf,
    pub filesize: u64,
    pub pin_id: String,
    #[serde(flatten)]
    pub descriptor: VideoDescriptor,
    pub downloaded_at: DateTime<Utc>,
}

/// True for absolute http(s) URLs.
pub fn is_absolute_http(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}
