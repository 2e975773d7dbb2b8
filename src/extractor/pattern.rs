use super::types::*;
use super::ExtractStrategy;
use regex::Regex;
use std::sync::LazyLock;

static VIDEO_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""video_list":\s*\{[^}]*"V_720P":\s*\{[^}]*"url":\s*"([^"]+)""#,
        r#""video_list":\s*\{[^}]*"V_HLSV4":\s*\{[^}]*"url":\s*"([^"]+)""#,
        r#""videos":\s*\{[^}]*"video_list":\s*\{[^}]*"V_HLSV3":\s*\{[^}]*"url":\s*"([^"]+)""#,
        r#""story_pin_data_id":[^}]*"video_url":\s*"([^"]+)""#,
        r#"contentUrl":\s*"([^"]*\.(?:mp4|webm|mov)[^"]*)""#,
        r#""video":\s*\{[^}]*"url":\s*"([^"]+\.mp4[^"]*)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title[^>]*>([^<]+)</title>").unwrap());

static DESCRIPTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""description":\s*"([^"]*)""#).unwrap());

static THUMBNAIL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""images":\s*\{[^}]*"orig":\s*\{[^}]*"url":\s*"([^"]+)""#,
        r#"property="og:image"\s+content="([^"]+)""#,
        r#""thumbnail":\s*"([^"]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const TITLE_SUFFIX: &str = " | Pinterest";

/// Regex scan over the raw page, used when no JSON blob yields a video.
pub struct PatternExtractor;

impl ExtractStrategy for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn extract(&self, page: &str) -> Option<VideoDescriptor> {
        let video_url = VIDEO_PATTERNS.iter().find_map(|re| {
            re.captures(page)
                .and_then(|caps| caps.get(1))
                .map(|m| unescape(m.as_str()))
                .filter(|url| is_absolute_http(url))
        })?;

        Some(VideoDescriptor {
            video_url,
            ..page_metadata(page)
        })
    }
}

/// Title, description and thumbnail scraped from the page, without a video.
pub fn page_metadata(page: &str) -> VideoDescriptor {
    let title = TITLE_REGEX
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace(TITLE_SUFFIX, "").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let description = DESCRIPTION_REGEX
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    VideoDescriptor {
        video_url: String::new(),
        title,
        description,
        thumbnail: extract_thumbnail(page),
        quality: None,
    }
}

fn extract_thumbnail(page: &str) -> String {
    THUMBNAIL_PATTERNS
        .iter()
        .find_map(|re| re.captures(page))
        .and_then(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
        .unwrap_or_default()
}

fn unescape(s: &str) -> String {
    s.replace("\\/", "/")
        .replace("\\u002F", "/")
        .replace("\\u002f", "/")
}
