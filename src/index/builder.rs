//! Single-pass inverted index construction.

use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::{Analyzer, StandardAnalyzer};
use crate::error::Result;
use crate::index::docid::{DocIdMapper, SourcePrefixMapper};
use crate::index::posting::{Posting, PostingList};
use crate::index::skip::embed_skip_pointers;
use crate::index::{DocumentInfo, InvertedIndex, RankingModel};

/// Body of a document fed to the builder: either already tokenized by
/// an upstream preprocessing pipeline, or raw text to run through the
/// builder's analyzer.
#[derive(Debug, Clone)]
pub enum DocumentBody {
    Tokens(Vec<String>),
    Raw(String),
}

/// One document in the build stream.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub doc_id: String,
    pub title: String,
    pub body: DocumentBody,
    pub metadata: Option<serde_json::Value>,
}

impl DocumentInput {
    /// Document with a pre-tokenized body.
    pub fn tokens<I, T>(doc_id: &str, title: &str, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        DocumentInput {
            doc_id: doc_id.to_string(),
            title: title.to_string(),
            body: DocumentBody::Tokens(tokens.into_iter().map(Into::into).collect()),
            metadata: None,
        }
    }

    /// Document with raw text to be analyzed.
    pub fn raw(doc_id: &str, title: &str, content: &str) -> Self {
        DocumentInput {
            doc_id: doc_id.to_string(),
            title: title.to_string(),
            body: DocumentBody::Raw(content.to_string()),
            metadata: None,
        }
    }
}

/// Builds an [`InvertedIndex`] from a document stream.
///
/// The stream is consumed once; peak memory during ingestion is one
/// document's token set plus the index built so far. For the TF-IDF
/// model a second pass over the finished term map computes
/// `idf(term) = ln(N / df(term))`.
pub struct IndexBuilder {
    model: RankingModel,
    analyzer: Arc<dyn Analyzer>,
    mapper: Arc<dyn DocIdMapper>,
    embed_skips: bool,
}

impl IndexBuilder {
    /// Create a builder for the given ranking model with the standard
    /// analyzer and the default source-prefix doc-id mapper.
    pub fn new(model: RankingModel) -> Self {
        IndexBuilder {
            model,
            analyzer: Arc::new(StandardAnalyzer::new()),
            mapper: Arc::new(SourcePrefixMapper::default()),
            embed_skips: false,
        }
    }

    /// Use a custom analyzer for raw document bodies.
    pub fn analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Use a custom doc-id mapper.
    pub fn mapper(mut self, mapper: Arc<dyn DocIdMapper>) -> Self {
        self.mapper = mapper;
        self
    }

    /// Embed skip pointers into every postings list after the sort pass.
    pub fn skip_pointers(mut self, enabled: bool) -> Self {
        self.embed_skips = enabled;
        self
    }

    /// Consume the document stream and build the index.
    ///
    /// A doc id appearing more than once in the stream replaces its
    /// earlier postings; the last occurrence wins.
    pub fn build<I>(self, documents: I) -> Result<InvertedIndex>
    where
        I: IntoIterator<Item = DocumentInput>,
    {
        let mut terms: AHashMap<String, Vec<Posting>> = AHashMap::new();
        let mut docs: AHashMap<String, DocumentInfo> = AHashMap::new();

        for document in documents {
            let tokens = match document.body {
                DocumentBody::Tokens(tokens) => tokens,
                DocumentBody::Raw(content) => self.analyzer.analyze(&content),
            };

            let mut positions: AHashMap<&str, Vec<u32>> = AHashMap::new();
            for (offset, token) in tokens.iter().enumerate() {
                positions.entry(token.as_str()).or_default().push(offset as u32);
            }

            for (term, term_positions) in positions {
                let term_frequency = match self.model {
                    RankingModel::Boolean => 1,
                    _ => term_positions.len() as u32,
                };
                terms.entry(term.to_string()).or_default().push(Posting {
                    doc_id: document.doc_id.clone(),
                    term_frequency,
                    positions: term_positions,
                    skip: None,
                });
            }

            docs.insert(
                document.doc_id,
                DocumentInfo {
                    title: document.title,
                    metadata: document.metadata,
                },
            );
        }

        let mut lexicographic_fallback = false;
        let mut finished: AHashMap<String, Arc<PostingList>> =
            AHashMap::with_capacity(terms.len());
        for (term, postings) in terms {
            let mut list = finalize_postings(postings, self.mapper.as_ref(), &mut lexicographic_fallback);
            if self.embed_skips {
                embed_skip_pointers(&mut list);
            }
            finished.insert(term, Arc::new(PostingList::from(list)));
        }
        if lexicographic_fallback {
            log::debug!("doc ids did not all map to numbers; postings sorted lexicographically");
        }

        let idf = match self.model {
            RankingModel::TfIdf => {
                let n = docs.len() as f64;
                let mut table = AHashMap::with_capacity(finished.len());
                for (term, list) in &finished {
                    table.insert(term.clone(), (n / list.len() as f64).ln());
                }
                Some(table)
            }
            _ => None,
        };

        log::info!(
            "built index: {} documents, {} terms, model {:?}",
            docs.len(),
            finished.len(),
            self.model
        );

        Ok(InvertedIndex {
            terms: finished,
            documents: docs,
            idf,
            model: self.model,
            skip_embedded: self.embed_skips,
            mapper: self.mapper,
        })
    }
}

/// Dedupe a term's postings keeping the last occurrence per doc id,
/// then sort by numeric doc id when every id maps, lexicographically
/// otherwise.
fn finalize_postings(
    postings: Vec<Posting>,
    mapper: &dyn DocIdMapper,
    fallback_flag: &mut bool,
) -> Vec<Posting> {
    let mut last: AHashMap<String, Posting> = AHashMap::with_capacity(postings.len());
    for posting in postings {
        last.insert(posting.doc_id.clone(), posting);
    }
    let mut list: Vec<Posting> = last.into_values().collect();

    let keys: Result<Vec<u64>> = list.iter().map(|p| mapper.to_number(&p.doc_id)).collect();
    match keys {
        Ok(keys) => {
            let mut pairs: Vec<(u64, Posting)> = keys.into_iter().zip(list).collect();
            pairs.sort_unstable_by_key(|(n, _)| *n);
            pairs.into_iter().map(|(_, p)| p).collect()
        }
        Err(_) => {
            *fallback_flag = true;
            list.sort_unstable_by(|a, b| a.doc_id.cmp(&b.doc_id));
            list
        }
    }
}
