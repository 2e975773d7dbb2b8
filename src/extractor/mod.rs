pub mod link;
mod pattern;
mod structured;
mod types;

pub use link::{extract_identifier, is_accepted_link, is_short_link, normalize_link};
pub use pattern::{page_metadata, PatternExtractor};
pub use structured::{StructuredExtractor, QUALITY_TAGS};
pub use types::*;

/// One way of finding a video in a pin page.
pub trait ExtractStrategy: Send + Sync {
    /// Name of the strategy (for logging)
    fn name(&self) -> &'static str;

    /// Returns a descriptor with a non-empty absolute `video_url`, or `None`.
    fn extract(&self, page: &str) -> Option<VideoDescriptor>;
}

/// Ordered strategy chain. The first strategy that finds a video wins.
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractStrategy>>,
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn ExtractStrategy>>) -> Self {
        Self { strategies }
    }

    /// Append a strategy, tried after the existing ones.
    pub fn with_strategy(mut self, strategy: impl ExtractStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn extract(&self, page: &str) -> Option<VideoDescriptor> {
        for strategy in &self.strategies {
            match strategy.extract(page) {
                Some(found) if found.has_video() => {
                    tracing::info!(
                        "Video found by {} extractor ({})",
                        strategy.name(),
                        found.quality.as_deref().unwrap_or("unknown quality")
                    );
                    return Some(found);
                }
                _ => tracing::debug!("{} extractor found nothing", strategy.name()),
            }
        }
        None
    }

    /// Like `extract`, but a page without video still yields its metadata.
    pub fn describe(&self, page: &str) -> VideoDescriptor {
        self.extract(page).unwrap_or_else(|| {
            tracing::warn!("No video data found in page");
            page_metadata(page)
        })
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(vec![Box::new(StructuredExtractor), Box::new(PatternExtractor)])
    }
}
