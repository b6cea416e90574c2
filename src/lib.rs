//! # Quill
//!
//! A from-scratch inverted-index search engine for studying how
//! ranking model, compression scheme, and query-processing strategy
//! trade off latency, throughput, and footprint.
//!
//! ## Features
//!
//! - Inverted index construction under Boolean, TF, and TF-IDF models
//! - Adaptive Elias Gamma/Delta postings compression, plus a zlib
//!   baseline for comparison
//! - Skip pointers for accelerated postings intersection
//! - Boolean queries with phrases, and TAAT/DAAT ranked retrieval with
//!   optional thresholding / early-stopping heuristics
//! - JSON document-store and SQLite persistence, eager or lazy loading

// Core modules
pub mod analysis;
pub mod codec;
pub mod config;
mod error;
pub mod index;
pub mod query;
pub mod storage;

// Re-exports for the public API
pub use analysis::{Analyzer, StandardAnalyzer};
pub use config::{Compression, Datastore, IndexSpec, Optimization};
pub use error::{QuillError, Result};
pub use index::{
    DocIdMapper, DocumentInput, IndexBuilder, IndexReader, InvertedIndex, Posting, PostingList,
    RankingModel, SourcePrefixMapper,
};
pub use query::{BooleanQueryEngine, QueryMode, RankedQueryEngine, ScoredDoc};
pub use storage::{
    delete_index, list_indices, load_index, load_index_lazy, save_index, LazyIndexReader,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
