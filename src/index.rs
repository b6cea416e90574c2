//! Inverted index core: postings, doc-id mapping, building, and skip
//! pointers.

pub mod builder;
pub mod docid;
pub mod posting;
pub mod skip;

use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{QuillError, Result};

pub use builder::{DocumentBody, DocumentInput, IndexBuilder};
pub use docid::{DocIdMapper, SourcePrefixMapper};
pub use posting::{Posting, PostingList};

/// Ranking model an index was built for.
///
/// The model decides what the builder stores: Boolean indexes keep
/// term frequency pinned at 1, TF indexes store real frequencies, and
/// TF-IDF indexes additionally carry a per-term IDF table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingModel {
    Boolean,
    Tf,
    TfIdf,
}

impl RankingModel {
    /// Numeric code used in index identifiers and stored metadata.
    pub fn code(&self) -> u8 {
        match self {
            RankingModel::Boolean => 1,
            RankingModel::Tf => 2,
            RankingModel::TfIdf => 3,
        }
    }

    /// Parse a stored numeric code.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(RankingModel::Boolean),
            2 => Ok(RankingModel::Tf),
            3 => Ok(RankingModel::TfIdf),
            other => Err(QuillError::config(format!("unknown ranking model code {other}"))),
        }
    }
}

/// Stored per-document fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: String,
    /// Free-form metadata carried through storage untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Read access to an index, independent of how it is held in memory.
///
/// The in-memory [`InvertedIndex`] and the lazy storage-backed reader
/// both implement this; query processors only see the trait.
pub trait IndexReader: Send + Sync {
    /// Ranking model the index was built with.
    fn model(&self) -> RankingModel;

    /// Postings list for a term. Unknown terms yield `Ok(None)`; they
    /// are not errors, just empty result sets.
    fn postings(&self, term: &str) -> Result<Option<Arc<PostingList>>>;

    /// IDF score for a term, when the model stores one.
    fn idf(&self, term: &str) -> Option<f64>;

    /// Mean IDF over the whole table, used by the thresholding
    /// heuristic. Zero when the model stores no IDF table.
    fn average_idf(&self) -> f64;

    /// All document ids in the index, ascending. This is the universe
    /// used by Boolean NOT.
    fn all_doc_ids(&self) -> Vec<String>;

    /// Number of indexed documents.
    fn doc_count(&self) -> usize;

    /// Stored fields for a document.
    fn document(&self, doc_id: &str) -> Option<DocumentInfo>;

    /// The doc-id mapper the index orders postings by.
    fn mapper(&self) -> Arc<dyn DocIdMapper>;
}

/// Fully materialized in-memory inverted index.
#[derive(Clone)]
pub struct InvertedIndex {
    pub(crate) terms: AHashMap<String, Arc<PostingList>>,
    pub(crate) documents: AHashMap<String, DocumentInfo>,
    pub(crate) idf: Option<AHashMap<String, f64>>,
    pub(crate) model: RankingModel,
    pub(crate) skip_embedded: bool,
    pub(crate) mapper: Arc<dyn DocIdMapper>,
}

impl InvertedIndex {
    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Iterate over `(term, postings)` pairs in arbitrary order.
    pub fn terms(&self) -> impl Iterator<Item = (&String, &Arc<PostingList>)> {
        self.terms.iter()
    }

    /// Iterate over `(doc_id, info)` pairs in arbitrary order.
    pub fn documents(&self) -> impl Iterator<Item = (&String, &DocumentInfo)> {
        self.documents.iter()
    }

    /// The IDF table, if the model stores one.
    pub fn idf_table(&self) -> Option<&AHashMap<String, f64>> {
        self.idf.as_ref()
    }

    /// Whether skip pointers were embedded at build time.
    pub fn has_embedded_skips(&self) -> bool {
        self.skip_embedded
    }
}

impl IndexReader for InvertedIndex {
    fn model(&self) -> RankingModel {
        self.model
    }

    fn postings(&self, term: &str) -> Result<Option<Arc<PostingList>>> {
        Ok(self.terms.get(term).cloned())
    }

    fn idf(&self, term: &str) -> Option<f64> {
        self.idf.as_ref().and_then(|t| t.get(term).copied())
    }

    fn average_idf(&self) -> f64 {
        match &self.idf {
            Some(table) if !table.is_empty() => {
                table.values().sum::<f64>() / table.len() as f64
            }
            _ => 0.0,
        }
    }

    fn all_doc_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents.keys().cloned().collect();
        docid::sort_doc_ids(&mut ids, self.mapper.as_ref());
        ids
    }

    fn doc_count(&self) -> usize {
        self.documents.len()
    }

    fn document(&self, doc_id: &str) -> Option<DocumentInfo> {
        self.documents.get(doc_id).cloned()
    }

    fn mapper(&self) -> Arc<dyn DocIdMapper> {
        Arc::clone(&self.mapper)
    }
}
