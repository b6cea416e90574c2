//! Posting and postings-list types.

use serde::{Deserialize, Serialize};

/// One document's entry in a term's postings list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Document identifier.
    pub doc_id: String,
    /// Number of occurrences of the term in the document.
    pub term_frequency: u32,
    /// Ascending token positions of the term within the document.
    pub positions: Vec<u32>,
    /// Index of the posting this entry can jump to, when skip pointers
    /// are embedded in the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
}

impl Posting {
    /// Create a posting with no skip pointer.
    pub fn new<S: Into<String>>(doc_id: S, term_frequency: u32, positions: Vec<u32>) -> Self {
        Posting {
            doc_id: doc_id.into(),
            term_frequency,
            positions,
            skip: None,
        }
    }
}

/// An ordered postings list for a single term.
///
/// Entries are ascending by the index's doc-id order and deduplicated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    /// Create an empty list.
    pub fn new() -> Self {
        PostingList { postings: Vec::new() }
    }

    /// Number of postings in the list.
    pub fn len(&self) -> usize {
        self.postings.len()
    }

    /// Whether the list has no postings.
    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Iterate over postings in list order.
    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.postings.iter()
    }

    /// Find the posting for a document, if present.
    pub fn get(&self, doc_id: &str) -> Option<&Posting> {
        self.postings.iter().find(|p| p.doc_id == doc_id)
    }

    /// Document ids in list order.
    pub fn doc_ids(&self) -> Vec<String> {
        self.postings.iter().map(|p| p.doc_id.clone()).collect()
    }
}

impl From<Vec<Posting>> for PostingList {
    fn from(postings: Vec<Posting>) -> Self {
        PostingList { postings }
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.postings.iter()
    }
}
