//! Skip pointers for accelerated postings-list intersection.
//!
//! Two equivalent representations exist: pointers embedded in the
//! `skip` field of each posting at build time, and a runtime
//! [`SkipOverlay`] computed on load without touching the postings.
//! Both boil down to a jump map `position -> target position` consumed
//! by [`intersect_with_skips`].

use ahash::AHashMap;

use crate::error::Result;
use crate::index::docid::DocIdMapper;
use crate::index::posting::{Posting, PostingList};

/// Jump table: list position -> target position further ahead.
pub type SkipMap = AHashMap<usize, usize>;

/// Spacing between skip pointers for a list of the given length.
pub fn skip_spacing(list_len: usize) -> usize {
    std::cmp::max(2, (list_len as f64).sqrt() as usize)
}

/// Attach skip pointers in place at the standard spacing.
///
/// Pointers land at positions `0, s, 2s, ...`; a pointer whose target
/// would fall past the end of the list is omitted. All other postings
/// have their `skip` cleared, so re-embedding after a list changes is
/// safe.
pub fn embed_skip_pointers(postings: &mut [Posting]) {
    let len = postings.len();
    for posting in postings.iter_mut() {
        posting.skip = None;
    }
    if len < 3 {
        return;
    }
    let spacing = skip_spacing(len);
    let mut i = 0;
    while i < len {
        if i + spacing < len {
            postings[i].skip = Some(i + spacing);
        }
        i += spacing;
    }
}

/// Jump map read off embedded `skip` fields.
pub fn embedded_skip_map(list: &PostingList) -> SkipMap {
    let mut map = SkipMap::new();
    for (i, posting) in list.iter().enumerate() {
        if let Some(target) = posting.skip {
            map.insert(i, target);
        }
    }
    map
}

/// One runtime skip pointer: the doc id and position it covers, and
/// the position it jumps to (`None` at the last pointer).
#[derive(Debug, Clone, PartialEq)]
pub struct SkipPointer {
    pub doc_id: String,
    pub position: usize,
    pub target: Option<usize>,
}

/// Runtime skip-pointer table for one postings list, computed on load
/// so indexes on disk never need rebuilding when spacing changes.
#[derive(Debug, Clone, Default)]
pub struct SkipOverlay {
    pub pointers: Vec<SkipPointer>,
}

impl SkipOverlay {
    /// Compute an overlay at the standard spacing, or a caller-chosen
    /// one.
    pub fn build(list: &PostingList, interval: Option<usize>) -> Self {
        let len = list.len();
        if len == 0 {
            return SkipOverlay::default();
        }
        let spacing = interval.unwrap_or_else(|| skip_spacing(len));
        let mut pointers = Vec::new();
        let mut i = 0;
        while i < len {
            let target = if i + spacing < len { Some(i + spacing) } else { None };
            pointers.push(SkipPointer {
                doc_id: list.postings[i].doc_id.clone(),
                position: i,
                target,
            });
            i += spacing;
        }
        SkipOverlay { pointers }
    }

    /// Jump map for the intersection loop.
    pub fn jump_map(&self) -> SkipMap {
        self.pointers
            .iter()
            .filter_map(|p| p.target.map(|t| (p.position, t)))
            .collect()
    }
}

fn numeric_keys(list: &PostingList, mapper: &dyn DocIdMapper) -> Result<Vec<u64>> {
    list.iter().map(|p| mapper.to_number(&p.doc_id)).collect()
}

/// Intersect two sorted, deduplicated postings lists, jumping through
/// the supplied skip maps where profitable.
///
/// At a mismatch the lagging cursor advances by one, unless it sits on
/// a skip pointer whose target doc id is still strictly below the
/// other cursor's doc id, in which case it jumps straight to the
/// target.
pub fn intersect_with_skips(
    a: &PostingList,
    b: &PostingList,
    skips_a: &SkipMap,
    skips_b: &SkipMap,
    mapper: &dyn DocIdMapper,
) -> Result<Vec<String>> {
    if a.is_empty() || b.is_empty() {
        return Ok(Vec::new());
    }
    let keys_a = numeric_keys(a, mapper)?;
    let keys_b = numeric_keys(b, mapper)?;

    let mut result = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < keys_a.len() && j < keys_b.len() {
        if keys_a[i] == keys_b[j] {
            result.push(a.postings[i].doc_id.clone());
            i += 1;
            j += 1;
        } else if keys_a[i] < keys_b[j] {
            match skips_a.get(&i) {
                Some(&t) if t < keys_a.len() && keys_a[t] < keys_b[j] => i = t,
                _ => i += 1,
            }
        } else {
            match skips_b.get(&j) {
                Some(&t) if t < keys_b.len() && keys_b[t] < keys_a[i] => j = t,
                _ => j += 1,
            }
        }
    }
    Ok(result)
}

/// Union of two sorted, deduplicated postings lists.
///
/// A plain merge: union has to visit every element, so skip pointers
/// buy nothing here.
pub fn merge_union(
    a: &PostingList,
    b: &PostingList,
    mapper: &dyn DocIdMapper,
) -> Result<Vec<String>> {
    let keys_a = numeric_keys(a, mapper)?;
    let keys_b = numeric_keys(b, mapper)?;

    let mut result = Vec::with_capacity(keys_a.len() + keys_b.len());
    let mut i = 0;
    let mut j = 0;
    while i < keys_a.len() && j < keys_b.len() {
        if keys_a[i] == keys_b[j] {
            result.push(a.postings[i].doc_id.clone());
            i += 1;
            j += 1;
        } else if keys_a[i] < keys_b[j] {
            result.push(a.postings[i].doc_id.clone());
            i += 1;
        } else {
            result.push(b.postings[j].doc_id.clone());
            j += 1;
        }
    }
    result.extend(a.postings[i..].iter().map(|p| p.doc_id.clone()));
    result.extend(b.postings[j..].iter().map(|p| p.doc_id.clone()));
    Ok(result)
}
