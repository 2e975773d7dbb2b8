mod simple;

pub use simple::StreamDownloader;

use url::Url;

/// File extension for a video URL. Pinterest serves MP4 almost everywhere.
pub fn video_extension(url: &str) -> &'static str {
    let path = Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());

    if path.ends_with(".webm") {
        "webm"
    } else if path.ends_with(".mov") {
        "mov"
    } else {
        "mp4"
    }
}
