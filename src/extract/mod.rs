//! Content extraction.
//!
//! Turns whatever markup a strategy acquired into a clean article fragment:
//! page chrome and paywall overlays are removed, clamp styling is undone, the
//! main content node is located, references are made absolute and a title is
//! resolved. Every strategy goes through the same pipeline.

mod candidates;
mod links;
mod noise;
mod title;

pub use candidates::{CandidateRule, CandidateSet, Selected, DEFAULT_RULES};
pub use links::{needs_resolution, resolve};
pub use noise::NOISE_PATTERNS;
pub use title::UNTITLED;

use dom_query::Document;
use tracing::debug;
use url::Url;

/// Cleaned article fragment and its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub html: String,
}

/// Stateless extractor over a candidate set.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    candidates: CandidateSet,
}

impl ContentExtractor {
    pub fn new(candidates: CandidateSet) -> Self {
        Self { candidates }
    }

    /// Clean `raw` and return the main content, with references resolved
    /// against `base`.
    pub fn extract(&self, raw: &str, base: &Url) -> ExtractedContent {
        let doc = Document::from(raw);

        noise::strip_structural(&doc);
        noise::strip_noise(&doc.select("body"));
        noise::neutralize_clamps(&doc);

        let (main, selected) = self.candidates.select(&doc);
        debug!("Main content selected via {:?}", selected);

        noise::strip_boilerplate(&main);
        noise::strip_noise(&main);
        links::normalize(&main, base);

        let title = title::resolve_title(&doc, &main);
        let html = main.inner_html().trim().to_string();

        ExtractedContent { title, html }
    }
}
