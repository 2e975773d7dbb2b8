//! Video lookup in the JSON blobs Pinterest embeds in its pages.
//!
//! Blobs are parsed as untyped `serde_json::Value` and walked depth-first,
//! bounded by `MAX_DEPTH`, for the keys known to carry video URLs.

use super::types::*;
use super::ExtractStrategy;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

const MAX_DEPTH: usize = 64;

/// Encodings in preference order. Progressive MP4 first, HLS playlists last.
pub const QUALITY_TAGS: &[&str] = &[
    "V_720P",
    "V_EXP7",
    "V_EXP6",
    "V_EXP5",
    "V_EXP4",
    "V_HLSV4",
    "V_HLSV3",
    "V_HLSV3_WEB",
    "V_HLSV3_MOBILE",
];

// Tried before the full walk. Not required for correctness.
const ROOT_PATHS: &[&[&str]] = &[
    &["props", "initialReduxState", "pins"],
    &["props", "pageProps", "pin"],
    &["resourceDataCache"],
    &["pins"],
    &["pin"],
];

static JSON_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)<script[^>]*>\s*window\.__PWS_DATA__\s*=\s*(\{.*?\});\s*</script>",
        r"(?s)<script[^>]*>\s*window\.__INITIAL_STATE__\s*=\s*(\{.*?\});\s*</script>",
        r#"(?s)<script[^>]*id="__PWS_DATA__"[^>]*>\s*(\{.*?\})\s*</script>"#,
        r#"(?s)"__PWS_DATA__":\s*(\{.*?\}),"#,
        r#"(?s)"resourceDataCache":\s*(\{.*?\}),"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub struct StructuredExtractor;

impl ExtractStrategy for StructuredExtractor {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, page: &str) -> Option<VideoDescriptor> {
        for marker in JSON_MARKERS.iter() {
            for caps in marker.captures_iter(page) {
                let Some(blob) = caps.get(1) else { continue };
                let document: Value = match serde_json::from_str(blob.as_str()) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::debug!("Skipping unparsable JSON blob: {}", e);
                        continue;
                    }
                };
                if let Some(found) = find_in_document(&document) {
                    return Some(found);
                }
            }
        }
        None
    }
}

/// Search one parsed document: root shortcuts first, then the whole tree.
pub fn find_in_document(document: &Value) -> Option<VideoDescriptor> {
    ROOT_PATHS
        .iter()
        .filter_map(|path| lookup(document, path))
        .find_map(|node| find_video(node, 0))
        .or_else(|| find_video(document, 0))
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |node, key| node.get(*key))
}

/// Depth-first search for the first node carrying a usable video URL.
pub fn find_video(value: &Value, depth: usize) -> Option<VideoDescriptor> {
    if depth > MAX_DEPTH {
        return None;
    }

    match value {
        Value::Object(map) => video_from_node(map)
            .or_else(|| map.values().find_map(|v| find_video(v, depth + 1))),
        Value::Array(items) => items.iter().find_map(|v| find_video(v, depth + 1)),
        _ => None,
    }
}

fn video_from_node(node: &Map<String, Value>) -> Option<VideoDescriptor> {
    let video_list = node.get("video_list").or_else(|| {
        node.get("videos")
            .and_then(|videos| videos.get("video_list"))
    });

    if let Some(Value::Object(list)) = video_list {
        if let Some((tag, url)) = pick_quality(list) {
            return Some(VideoDescriptor {
                video_url: url,
                title: node_title(node),
                description: str_field(node, "description"),
                thumbnail: node
                    .get("images")
                    .and_then(|images| lookup(images, &["orig", "url"]))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                quality: Some(tag.to_string()),
            });
        }
    }

    if let Some(Value::String(url)) = node.get("video_url") {
        if is_absolute_http(url) {
            return Some(VideoDescriptor {
                video_url: url.clone(),
                title: node_title(node),
                description: str_field(node, "description"),
                thumbnail: str_field(node, "thumbnail"),
                quality: None,
            });
        }
    }

    None
}

/// First quality tag with a non-empty absolute URL.
pub fn pick_quality(list: &Map<String, Value>) -> Option<(&'static str, String)> {
    QUALITY_TAGS.iter().find_map(|tag| {
        list.get(*tag)
            .and_then(|entry| entry.get("url"))
            .and_then(Value::as_str)
            .filter(|url| is_absolute_http(url))
            .map(|url| (*tag, url.to_string()))
    })
}

fn node_title(node: &Map<String, Value>) -> String {
    ["title", "grid_title"]
        .iter()
        .filter_map(|key| node.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

fn str_field(node: &Map<String, Value>, key: &str) -> String {
    node.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
