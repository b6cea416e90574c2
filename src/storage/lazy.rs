//! Lazy index reader: decompress terms on first use.
//!
//! Compressed blobs stay resident; decoded lists go into a bounded
//! FIFO cache. Steady-state memory stays close to the compressed
//! footprint while repeat queries for hot terms pay the decode cost
//! once. The cache is the only mutable state during query serving.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::config::Compression;
use crate::error::Result;
use crate::index::docid::{sort_doc_ids, DocIdMapper};
use crate::index::{DocumentInfo, IndexReader, PostingList, RankingModel};
use crate::storage::{decode_posting_list, StoreParts};

/// Default number of decoded postings lists kept resident.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

struct PostingsCache {
    entries: AHashMap<String, Arc<PostingList>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl PostingsCache {
    fn new(capacity: usize) -> Self {
        PostingsCache {
            entries: AHashMap::with_capacity(capacity.min(1024)),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, term: &str) -> Option<Arc<PostingList>> {
        self.entries.get(term).cloned()
    }

    fn insert(&mut self, term: String, list: Arc<PostingList>) {
        if self.entries.contains_key(&term) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(term.clone());
        self.entries.insert(term, list);
    }
}

/// Storage-backed reader that keeps postings compressed until a term
/// is first queried.
pub struct LazyIndexReader {
    model: RankingModel,
    compression: Compression,
    skip_embedded: bool,
    documents: AHashMap<String, DocumentInfo>,
    idf: Option<AHashMap<String, f64>>,
    blobs: AHashMap<String, Vec<u8>>,
    mapper: Arc<dyn DocIdMapper>,
    cache: Mutex<PostingsCache>,
}

impl LazyIndexReader {
    /// Build a reader over loaded store parts with the default cache
    /// size.
    pub fn new(parts: StoreParts, mapper: Arc<dyn DocIdMapper>) -> Self {
        Self::with_cache_capacity(parts, mapper, DEFAULT_CACHE_CAPACITY)
    }

    /// Build a reader with an explicit cache capacity.
    pub fn with_cache_capacity(
        parts: StoreParts,
        mapper: Arc<dyn DocIdMapper>,
        capacity: usize,
    ) -> Self {
        LazyIndexReader {
            model: parts.model,
            compression: parts.compression,
            skip_embedded: parts.skip_embedded,
            documents: parts.documents,
            idf: parts.idf,
            blobs: parts.blobs,
            mapper,
            cache: Mutex::new(PostingsCache::new(capacity.max(1))),
        }
    }

    /// Number of terms currently decoded and cached.
    pub fn cached_terms(&self) -> usize {
        self.cache.lock().entries.len()
    }

    /// Number of terms held in compressed form.
    pub fn term_count(&self) -> usize {
        self.blobs.len()
    }
}

impl IndexReader for LazyIndexReader {
    fn model(&self) -> RankingModel {
        self.model
    }

    fn postings(&self, term: &str) -> Result<Option<Arc<PostingList>>> {
        if let Some(hit) = self.cache.lock().get(term) {
            return Ok(Some(hit));
        }
        let Some(blob) = self.blobs.get(term) else {
            return Ok(None);
        };
        let reembed = self.skip_embedded && self.compression == Compression::Elias;
        let list = Arc::new(decode_posting_list(
            blob,
            self.compression,
            self.mapper.as_ref(),
            reembed,
        )?);
        self.cache.lock().insert(term.to_string(), Arc::clone(&list));
        Ok(Some(list))
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
        sort_doc_ids(&mut ids, self.mapper.as_ref());
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
