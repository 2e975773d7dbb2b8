use std::fmt;
use thiserror::Error;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Expand,
    Fetch,
    Extract,
    Download,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classify => write!(f, "classify"),
            Self::Expand => write!(f, "expand"),
            Self::Fetch => write!(f, "fetch"),
            Self::Extract => write!(f, "extract"),
            Self::Download => write!(f, "download"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PinError {
    #[error("Not a Pinterest link: {0}")]
    InvalidLink(String),
    #[error("Could not expand short link {url}: {reason}")]
    ResolutionDegraded { url: String, reason: String },
    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Failed to fetch page {url}: {reason}")]
    PageFetch { url: String, reason: String },
    #[error("No video found for pin {0}")]
    Extraction(String),
    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl PinError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidLink(_) => Stage::Classify,
            Self::ResolutionDegraded { .. } => Stage::Expand,
            Self::Client(_) | Self::PageFetch { .. } => Stage::Fetch,
            Self::Extraction(_) => Stage::Extract,
            Self::Download { .. } | Self::Io(_) => Stage::Download,
        }
    }

    pub(crate) fn page_fetch(url: &str, reason: impl fmt::Display) -> Self {
        Self::PageFetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn download(url: &str, reason: impl fmt::Display) -> Self {
        Self::Download {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
