//! Self-contained JSON document store.
//!
//! One record per index identifier holds the metadata, document
//! table, optional IDF table, and every postings list. Compressed
//! postings are base64-encoded so the record stays valid JSON.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::{Compression, IndexSpec};
use crate::error::{QuillError, Result};
use crate::index::{DocumentInfo, IndexReader, InvertedIndex, PostingList, RankingModel};
use crate::storage::{encode_posting_list, io_error_with_path, StoreParts};

/// A term's stored postings: the raw list when uncompressed, base64
/// text otherwise.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredPostings {
    Raw(PostingList),
    Encoded(String),
}

#[derive(Serialize, Deserialize)]
struct IndexRecord {
    identifier: String,
    model: u8,
    compression: u8,
    skip_pointers: bool,
    doc_count: usize,
    documents: HashMap<String, DocumentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idf: Option<HashMap<String, f64>>,
    postings: HashMap<String, StoredPostings>,
}

/// JSON-record backend rooted at a directory.
pub struct DocStore {
    dir: PathBuf,
}

impl DocStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        DocStore { dir: dir.as_ref().to_path_buf() }
    }

    fn path(&self, spec: &IndexSpec) -> PathBuf {
        self.dir.join(format!("{}.json", spec.identifier()))
    }

    /// Write the index as one record, creating the directory if
    /// needed.
    pub fn save(&self, index: &InvertedIndex, spec: &IndexSpec) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error_with_path(e, &self.dir))?;

        let mapper = index.mapper();
        let mut postings = HashMap::with_capacity(index.term_count());
        for (term, list) in index.terms() {
            let stored = match spec.compression {
                Compression::None => StoredPostings::Raw(list.as_ref().clone()),
                _ => {
                    let bytes =
                        encode_posting_list(list.as_ref(), spec.compression, mapper.as_ref())?;
                    StoredPostings::Encoded(BASE64.encode(bytes))
                }
            };
            postings.insert(term.clone(), stored);
        }

        let record = IndexRecord {
            identifier: spec.identifier(),
            model: index.model().code(),
            compression: spec.compression.code(),
            skip_pointers: index.has_embedded_skips(),
            doc_count: index.doc_count(),
            documents: index
                .documents()
                .map(|(id, info)| (id.clone(), info.clone()))
                .collect(),
            idf: index
                .idf_table()
                .map(|t| t.iter().map(|(k, v)| (k.clone(), *v)).collect()),
            postings,
        };

        let path = self.path(spec);
        let file = fs::File::create(&path).map_err(|e| io_error_with_path(e, &path))?;
        serde_json::to_writer(BufWriter::new(file), &record)?;
        log::info!("saved index {} to {}", record.identifier, path.display());
        Ok(path)
    }

    /// Read a record back into store parts, postings kept in their
    /// at-rest byte form.
    pub fn load_parts(&self, spec: &IndexSpec) -> Result<StoreParts> {
        let path = self.path(spec);
        let file = fs::File::open(&path).map_err(|e| io_error_with_path(e, &path))?;
        let record: IndexRecord = serde_json::from_reader(BufReader::new(file))?;

        if record.identifier != spec.identifier() {
            return Err(QuillError::storage(format!(
                "identifier mismatch in {}: found '{}'",
                path.display(),
                record.identifier
            )));
        }

        let compression = Compression::from_code(record.compression)?;
        let mut blobs = ahash::AHashMap::with_capacity(record.postings.len());
        for (term, stored) in record.postings {
            let bytes = match stored {
                StoredPostings::Raw(list) => serde_json::to_vec(&list)?,
                StoredPostings::Encoded(text) => BASE64
                    .decode(text.as_bytes())
                    .map_err(|e| QuillError::codec(format!("invalid base64 postings: {e}")))?,
            };
            blobs.insert(term, bytes);
        }

        Ok(StoreParts {
            model: RankingModel::from_code(record.model)?,
            compression,
            skip_embedded: record.skip_pointers,
            documents: record.documents.into_iter().collect(),
            idf: record.idf.map(|t| t.into_iter().collect()),
            blobs,
        })
    }

    /// Remove the record file.
    pub fn delete(&self, spec: &IndexSpec) -> Result<()> {
        let path = self.path(spec);
        fs::remove_file(&path).map_err(|e| io_error_with_path(e, &path))
    }
}
