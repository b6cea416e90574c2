//! SQLite relational backend, one table per entity.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::{Compression, IndexSpec};
use crate::error::{QuillError, Result};
use crate::index::{DocumentInfo, IndexReader, InvertedIndex, RankingModel};
use crate::storage::{encode_posting_list, io_error_with_path, StoreParts};

const SCHEMA: &str = "
CREATE TABLE meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
CREATE TABLE documents (
    doc_id   TEXT PRIMARY KEY,
    title    TEXT NOT NULL,
    metadata TEXT
);
CREATE TABLE idf (
    term      TEXT PRIMARY KEY,
    idf_score REAL NOT NULL
);
CREATE TABLE postings (
    term          TEXT PRIMARY KEY,
    postings_data BLOB NOT NULL,
    compression   INTEGER NOT NULL
);
CREATE INDEX idx_postings_term ON postings(term);
";

/// SQLite backend rooted at a directory, one database file per index.
pub struct RelationalStore {
    dir: PathBuf,
}

impl RelationalStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        RelationalStore { dir: dir.as_ref().to_path_buf() }
    }

    fn path(&self, spec: &IndexSpec) -> PathBuf {
        self.dir.join(format!("{}.db", spec.identifier()))
    }

    /// Write the index into a fresh database file. An existing file
    /// for the same identifier is replaced.
    pub fn save(&self, index: &InvertedIndex, spec: &IndexSpec) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error_with_path(e, &self.dir))?;
        let path = self.path(spec);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| io_error_with_path(e, &path))?;
        }

        let mut conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        for (key, value) in [
            ("identifier", spec.identifier()),
            ("model", index.model().code().to_string()),
            ("compression", spec.compression.code().to_string()),
            ("skip_pointers", index.has_embedded_skips().to_string()),
            ("doc_count", index.doc_count().to_string()),
        ] {
            tx.execute("INSERT INTO meta (key, value) VALUES (?1, ?2)", params![key, value])?;
        }

        for (doc_id, info) in index.documents() {
            let metadata = match &info.metadata {
                Some(value) => Some(serde_json::to_string(value)?),
                None => None,
            };
            tx.execute(
                "INSERT INTO documents (doc_id, title, metadata) VALUES (?1, ?2, ?3)",
                params![doc_id, info.title, metadata],
            )?;
        }

        if let Some(table) = index.idf_table() {
            for (term, score) in table {
                tx.execute(
                    "INSERT INTO idf (term, idf_score) VALUES (?1, ?2)",
                    params![term, score],
                )?;
            }
        }

        let mapper = index.mapper();
        for (term, list) in index.terms() {
            let blob = encode_posting_list(list.as_ref(), spec.compression, mapper.as_ref())?;
            tx.execute(
                "INSERT INTO postings (term, postings_data, compression) VALUES (?1, ?2, ?3)",
                params![term, blob, spec.compression.code()],
            )?;
        }
        tx.commit()?;

        log::info!("saved index {} to {}", spec.identifier(), path.display());
        Ok(path)
    }

    /// Read all tables back into store parts.
    pub fn load_parts(&self, spec: &IndexSpec) -> Result<StoreParts> {
        let path = self.path(spec);
        if !path.exists() {
            return Err(QuillError::not_found(format!("{}", path.display())));
        }
        let conn = Connection::open(&path)?;

        let identifier = read_meta(&conn, "identifier")?;
        if identifier != spec.identifier() {
            return Err(QuillError::storage(format!(
                "identifier mismatch in {}: found '{identifier}'",
                path.display()
            )));
        }
        let model = RankingModel::from_code(parse_meta(&read_meta(&conn, "model")?)?)?;
        let compression = Compression::from_code(parse_meta(&read_meta(&conn, "compression")?)?)?;
        let skip_embedded = read_meta(&conn, "skip_pointers")? == "true";

        let mut documents = ahash::AHashMap::new();
        let mut stmt = conn.prepare("SELECT doc_id, title, metadata FROM documents")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        for row in rows {
            let (doc_id, title, metadata) = row?;
            let metadata = match metadata {
                Some(text) => Some(serde_json::from_str(&text)?),
                None => None,
            };
            documents.insert(doc_id, DocumentInfo { title, metadata });
        }

        let idf = match model {
            RankingModel::TfIdf => {
                let mut table = ahash::AHashMap::new();
                let mut stmt = conn.prepare("SELECT term, idf_score FROM idf")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                })?;
                for row in rows {
                    let (term, score) = row?;
                    table.insert(term, score);
                }
                Some(table)
            }
            _ => None,
        };

        let mut blobs = ahash::AHashMap::new();
        let mut stmt = conn.prepare("SELECT term, postings_data FROM postings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;
        for row in rows {
            let (term, blob) = row?;
            blobs.insert(term, blob);
        }

        Ok(StoreParts {
            model,
            compression,
            skip_embedded,
            documents,
            idf,
            blobs,
        })
    }

    /// Remove the database file.
    pub fn delete(&self, spec: &IndexSpec) -> Result<()> {
        let path = self.path(spec);
        fs::remove_file(&path).map_err(|e| io_error_with_path(e, &path))
    }
}

fn read_meta(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    })
    .optional()?
    .ok_or_else(|| QuillError::storage(format!("missing meta key '{key}'")))
}

fn parse_meta(value: &str) -> Result<u8> {
    value
        .parse()
        .map_err(|_| QuillError::storage(format!("malformed meta value '{value}'")))
}
