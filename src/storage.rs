//! Persistence backends.
//!
//! Two behaviorally equivalent stores exist: a self-contained JSON
//! document store and a SQLite relational layout. Both hand their
//! contents back as [`StoreParts`], from which either a fully eager
//! [`InvertedIndex`] or a [`LazyIndexReader`] with on-demand
//! decompression is assembled.

pub mod docstore;
pub mod lazy;
pub mod relational;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::codec::postings::{compress_postings, decompress_postings};
use crate::codec::zlib;
use crate::config::{Compression, Datastore, IndexSpec};
use crate::error::{QuillError, Result};
use crate::index::docid::DocIdMapper;
use crate::index::skip::embed_skip_pointers;
use crate::index::{DocumentInfo, InvertedIndex, PostingList, RankingModel};

pub use docstore::DocStore;
pub use lazy::LazyIndexReader;
pub use relational::RelationalStore;

/// Everything a backend read off disk, postings still in their
/// at-rest byte form.
pub struct StoreParts {
    pub model: RankingModel,
    pub compression: Compression,
    pub skip_embedded: bool,
    pub documents: AHashMap<String, DocumentInfo>,
    pub idf: Option<AHashMap<String, f64>>,
    pub blobs: AHashMap<String, Vec<u8>>,
}

/// Encode one postings list into its at-rest byte form.
pub(crate) fn encode_posting_list(
    list: &PostingList,
    compression: Compression,
    mapper: &dyn DocIdMapper,
) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(serde_json::to_vec(list)?),
        Compression::Elias => compress_postings(&list.postings, mapper),
        Compression::Zlib => zlib::compress_posting_list(list),
    }
}

/// Decode one at-rest postings blob.
///
/// The Elias form does not carry skip pointers, so they are re-embedded
/// at the standard spacing when the index was built with them.
pub(crate) fn decode_posting_list(
    bytes: &[u8],
    compression: Compression,
    mapper: &dyn DocIdMapper,
    reembed_skips: bool,
) -> Result<PostingList> {
    match compression {
        Compression::None => Ok(serde_json::from_slice(bytes)?),
        Compression::Elias => {
            let mut postings = decompress_postings(bytes, mapper)?;
            if reembed_skips {
                embed_skip_pointers(&mut postings);
            }
            Ok(PostingList::from(postings))
        }
        Compression::Zlib => zlib::decompress_posting_list(bytes),
    }
}

/// Assemble a fully decoded in-memory index from loaded parts.
pub(crate) fn assemble_index(
    parts: StoreParts,
    mapper: Arc<dyn DocIdMapper>,
) -> Result<InvertedIndex> {
    let reembed = parts.skip_embedded && parts.compression == Compression::Elias;
    let mut terms = AHashMap::with_capacity(parts.blobs.len());
    for (term, blob) in parts.blobs {
        let list = decode_posting_list(&blob, parts.compression, mapper.as_ref(), reembed)?;
        terms.insert(term, Arc::new(list));
    }
    Ok(InvertedIndex {
        terms,
        documents: parts.documents,
        idf: parts.idf,
        model: parts.model,
        skip_embedded: parts.skip_embedded,
        mapper,
    })
}

/// Persist an index under its spec's identifier in `dir`, returning
/// the path written.
pub fn save_index(index: &InvertedIndex, spec: &IndexSpec, dir: &Path) -> Result<PathBuf> {
    spec.validate()?;
    match spec.datastore {
        Datastore::DocumentStore => DocStore::new(dir).save(index, spec),
        Datastore::Relational => RelationalStore::new(dir).save(index, spec),
    }
}

/// Load an index eagerly, decompressing every postings list up front.
pub fn load_index(
    spec: &IndexSpec,
    dir: &Path,
    mapper: Arc<dyn DocIdMapper>,
) -> Result<InvertedIndex> {
    let parts = load_parts(spec, dir)?;
    assemble_index(parts, mapper)
}

/// Load an index lazily: compressed blobs stay resident and terms are
/// decompressed on first use into a bounded cache.
pub fn load_index_lazy(
    spec: &IndexSpec,
    dir: &Path,
    mapper: Arc<dyn DocIdMapper>,
) -> Result<LazyIndexReader> {
    let parts = load_parts(spec, dir)?;
    Ok(LazyIndexReader::new(parts, mapper))
}

fn load_parts(spec: &IndexSpec, dir: &Path) -> Result<StoreParts> {
    match spec.datastore {
        Datastore::DocumentStore => DocStore::new(dir).load_parts(spec),
        Datastore::Relational => RelationalStore::new(dir).load_parts(spec),
    }
}

/// Delete a persisted index. Missing files are reported as not found.
pub fn delete_index(spec: &IndexSpec, dir: &Path) -> Result<()> {
    match spec.datastore {
        Datastore::DocumentStore => DocStore::new(dir).delete(spec),
        Datastore::Relational => RelationalStore::new(dir).delete(spec),
    }
}

lazy_static! {
    // <engine>_i<model>d<datastore>c<compression>o<optimization>
    static ref IDENTIFIER_RE: Regex =
        Regex::new(r"^[a-z0-9_]+_i[1-3]d[1-2]c[1-3]o(0|sp|th|es)$").unwrap();
}

/// Identifiers of all indexes persisted in `dir`, in name order.
///
/// Only file stems matching the identifier grammar are reported, so
/// unrelated files sharing the directory are ignored.
pub fn list_indices(dir: &Path) -> Result<Vec<String>> {
    let mut identifiers = Vec::new();
    let entries = std::fs::read_dir(dir)
        .map_err(|e| io_error_with_path(e, dir))?;
    for entry in entries {
        let path = entry?.path();
        let is_index = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("db")
        );
        if is_index {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if IDENTIFIER_RE.is_match(stem) {
                    identifiers.push(stem.to_string());
                }
            }
        }
    }
    identifiers.sort_unstable();
    Ok(identifiers)
}

/// Attach the attempted path to filesystem errors; a missing file
/// becomes a not-found error rather than a bare I/O failure.
pub(crate) fn io_error_with_path(err: std::io::Error, path: &Path) -> QuillError {
    if err.kind() == std::io::ErrorKind::NotFound {
        QuillError::not_found(format!("{}", path.display()))
    } else {
        QuillError::Storage(format!("{}: {err}", path.display()))
    }
}
