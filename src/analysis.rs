//! Text analysis for quill.
//!
//! Indexing and query processing both normalize text through an
//! [`Analyzer`]. The engine only depends on the trait: corpus
//! preprocessing pipelines (stemming, stopword removal, language
//! handling) live outside this crate and plug in here.

/// Turns raw text into a normalized token sequence.
///
/// The same analyzer must be used at build time and query time, otherwise
/// query terms will not match indexed terms.
pub trait Analyzer: Send + Sync {
    /// Analyze text into an ordered sequence of terms. Token order defines
    /// the positional indices stored in postings.
    fn analyze(&self, text: &str) -> Vec<String>;

    /// Name of this analyzer.
    fn name(&self) -> &str;
}

/// Default analyzer: lowercase, split on non-alphanumeric characters.
///
/// Deliberately minimal — no stemming or stopword removal — so that
/// positional phrase matching stays predictable.
#[derive(Debug, Clone, Default)]
pub struct StandardAnalyzer;

impl StandardAnalyzer {
    /// Create a new standard analyzer.
    pub fn new() -> Self {
        StandardAnalyzer
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
            .collect()
    }

    fn name(&self) -> &str {
        "standard"
    }
}
