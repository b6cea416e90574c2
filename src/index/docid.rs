//! Document-id to numeric-id mapping.
//!
//! Gap encoding needs a total order over document ids, so every doc id
//! string must map to a unique non-negative integer and back. The mapping
//! is an injectable seam: corpora with different naming schemes implement
//! [`DocIdMapper`] instead of patching the codec.

use std::sync::Arc;

use crate::error::{QuillError, Result};

/// Deterministic, invertible mapping between doc-id strings and numbers.
///
/// Implementations must guarantee `from_number(to_number(id)) == id` for
/// every id they accept, and that distinct ids map to distinct numbers.
pub trait DocIdMapper: Send + Sync {
    /// Map a doc-id string to its numeric form.
    fn to_number(&self, doc_id: &str) -> Result<u64>;

    /// Map a numeric id back to its string form.
    fn from_number(&self, number: u64) -> Result<String>;
}

/// Maps ids of the form `<source>_<number>` by partitioning the integer
/// space into per-source ranges of width `RANGE_WIDTH`.
///
/// With sources `["news", "wiki"]`: `news_7 -> 7`, `wiki_7 -> 100007`.
/// The last source's range is unbounded above. Each earlier source owns
/// `[i * RANGE_WIDTH, (i + 1) * RANGE_WIDTH)`; a local number at or past
/// the range width would collide with the next source, so it is rejected
/// rather than silently remapped.
#[derive(Debug, Clone)]
pub struct SourcePrefixMapper {
    sources: Vec<String>,
}

impl SourcePrefixMapper {
    /// Width of each source's numeric range.
    pub const RANGE_WIDTH: u64 = 100_000;

    /// Create a mapper over an ordered list of source prefixes.
    pub fn new<S: Into<String>>(sources: Vec<S>) -> Result<Self> {
        if sources.is_empty() {
            return Err(QuillError::config("doc-id mapper needs at least one source"));
        }
        Ok(SourcePrefixMapper {
            sources: sources.into_iter().map(Into::into).collect(),
        })
    }

    fn split(doc_id: &str) -> Result<(&str, u64)> {
        let (source, number) = doc_id.rsplit_once('_').ok_or_else(|| {
            QuillError::invariant(format!(
                "doc id '{doc_id}' does not match the <source>_<number> format"
            ))
        })?;
        let number: u64 = number.parse().map_err(|_| {
            QuillError::invariant(format!("doc id '{doc_id}' has a non-numeric suffix"))
        })?;
        Ok((source, number))
    }
}

impl Default for SourcePrefixMapper {
    fn default() -> Self {
        SourcePrefixMapper {
            sources: vec!["news".to_string(), "wiki".to_string()],
        }
    }
}

impl DocIdMapper for SourcePrefixMapper {
    fn to_number(&self, doc_id: &str) -> Result<u64> {
        let (source, number) = Self::split(doc_id)?;
        let index = self
            .sources
            .iter()
            .position(|s| s == source)
            .ok_or_else(|| {
                QuillError::invariant(format!("doc id '{doc_id}' has unknown source '{source}'"))
            })?;
        let last = index == self.sources.len() - 1;
        if !last && number >= Self::RANGE_WIDTH {
            return Err(QuillError::invariant(format!(
                "doc id '{doc_id}' overflows the numeric range reserved for '{source}'"
            )));
        }
        Ok(index as u64 * Self::RANGE_WIDTH + number)
    }

    fn from_number(&self, number: u64) -> Result<String> {
        let index = ((number / Self::RANGE_WIDTH) as usize).min(self.sources.len() - 1);
        let local = number - index as u64 * Self::RANGE_WIDTH;
        Ok(format!("{}_{}", self.sources[index], local))
    }
}

/// Shared default mapper for the `news`/`wiki` corpus layout.
pub fn default_mapper() -> Arc<dyn DocIdMapper> {
    Arc::new(SourcePrefixMapper::default())
}

/// Sort doc ids in the mapper's numeric order, falling back to
/// lexicographic order when any id fails to map. All result ordering
/// in the engine goes through this so Boolean results, the NOT
/// universe, and ranked tie-breaks agree.
pub fn sort_doc_ids(ids: &mut Vec<String>, mapper: &dyn DocIdMapper) {
    let keys: Result<Vec<u64>> = ids.iter().map(|id| mapper.to_number(id)).collect();
    match keys {
        Ok(keys) => {
            let mut pairs: Vec<(u64, String)> = keys.into_iter().zip(ids.drain(..)).collect();
            pairs.sort_unstable_by_key(|(n, _)| *n);
            ids.extend(pairs.into_iter().map(|(_, id)| id));
        }
        Err(_) => ids.sort_unstable(),
    }
}
