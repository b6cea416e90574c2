//! Adaptive Elias gap encoding of full postings lists.
//!
//! Layout per list: `Gamma(count)`, then per posting a flag bit selecting
//! the gap code (0 = Gamma for gaps <= 15, 1 = Delta), the doc-id gap,
//! `Gamma(tf)`, `Gamma(position_count)`, and the position gaps under the
//! same flag-bit scheme. Doc-id and position running sums start at -1 so
//! that a first value of zero still yields a gap of at least one.

use crate::codec::elias::{BitReader, BitWriter};
use crate::error::{QuillError, Result};
use crate::index::docid::DocIdMapper;
use crate::index::posting::Posting;

const GAMMA_THRESHOLD: u64 = 15;

// Smallest possible encoded posting: flag bit + Gamma(1) for the doc gap,
// Gamma(1) for tf, Gamma(1) for the position count, and one position gap
// (flag bit + Gamma(1)).
const MIN_POSTING_BITS: usize = 6;

// Smallest possible encoded position gap: flag bit + Gamma(1).
const MIN_POSITION_BITS: usize = 2;

fn write_adaptive_gap(writer: &mut BitWriter, gap: u64) -> Result<()> {
    if gap <= GAMMA_THRESHOLD {
        writer.push_bit(false);
        writer.write_gamma(gap)
    } else {
        writer.push_bit(true);
        writer.write_delta(gap)
    }
}

fn read_adaptive_gap(reader: &mut BitReader) -> Result<u64> {
    if reader.read_bit()? {
        reader.read_delta()
    } else {
        reader.read_gamma()
    }
}

/// Compress a postings list into a packed byte buffer.
///
/// The input is deduplicated by doc id (last occurrence wins) and sorted
/// by numeric doc id before encoding, so stale duplicates from repeated
/// indexing passes cannot corrupt the gap stream. A non-positive gap
/// after that step means the mapper produced colliding numbers and is
/// reported as an invariant violation.
///
/// Skip pointers are not part of the encoded form; they are rebuilt from
/// the decoded list when needed.
pub fn compress_postings(
    postings: &[Posting],
    mapper: &dyn DocIdMapper,
) -> Result<Vec<u8>> {
    if postings.is_empty() {
        return Ok(Vec::new());
    }

    // Dedupe keeping the last occurrence, then sort by numeric id.
    let mut seen: ahash::AHashMap<&str, &Posting> = ahash::AHashMap::new();
    for posting in postings {
        seen.insert(posting.doc_id.as_str(), posting);
    }
    if seen.len() != postings.len() {
        log::debug!(
            "removed {} duplicate postings before compression",
            postings.len() - seen.len()
        );
    }
    let mut sorted: Vec<(u64, &Posting)> = Vec::with_capacity(seen.len());
    for posting in seen.into_values() {
        sorted.push((mapper.to_number(&posting.doc_id)?, posting));
    }
    sorted.sort_unstable_by_key(|(n, _)| *n);

    let mut writer = BitWriter::new();
    writer.write_gamma(sorted.len() as u64)?;

    // Start at -1 so a doc id mapping to 0 still produces gap 1.
    let mut prev_doc: i64 = -1;
    for (doc_num, posting) in sorted {
        let gap = doc_num as i64 - prev_doc;
        if gap < 1 {
            return Err(QuillError::invariant(format!(
                "doc ids must map to strictly increasing numbers: {prev_doc} -> {doc_num} at '{}'",
                posting.doc_id
            )));
        }
        write_adaptive_gap(&mut writer, gap as u64)?;
        prev_doc = doc_num as i64;

        writer.write_gamma(posting.term_frequency as u64)?;

        let mut positions = posting.positions.clone();
        positions.sort_unstable();
        positions.dedup();
        if positions.is_empty() {
            return Err(QuillError::invariant(format!(
                "posting for '{}' has no positions",
                posting.doc_id
            )));
        }
        writer.write_gamma(positions.len() as u64)?;

        let mut prev_pos: i64 = -1;
        for pos in positions {
            let pos_gap = pos as i64 - prev_pos;
            write_adaptive_gap(&mut writer, pos_gap as u64)?;
            prev_pos = pos as i64;
        }
    }

    Ok(writer.into_bytes())
}

/// Decompress a packed byte buffer back into a postings list.
///
/// The result is sorted ascending by numeric doc id with no skip
/// pointers attached. An empty buffer decodes to an empty list.
pub fn decompress_postings(
    bytes: &[u8],
    mapper: &dyn DocIdMapper,
) -> Result<Vec<Posting>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = BitReader::from_bytes(bytes);
    let count = reader.read_gamma()? as usize;
    // A corrupt header can claim any count; the remaining bits put a hard
    // ceiling on how many postings the stream could actually hold.
    if count > reader.remaining() / MIN_POSTING_BITS {
        return Err(QuillError::codec(format!(
            "postings count {count} exceeds what {} remaining bits can encode",
            reader.remaining()
        )));
    }
    let mut postings = Vec::with_capacity(count);

    let mut prev_doc: i64 = -1;
    for _ in 0..count {
        let gap = read_adaptive_gap(&mut reader)?;
        let doc_num = (prev_doc + gap as i64) as u64;
        prev_doc = doc_num as i64;

        let tf = reader.read_gamma()? as u32;
        let position_count = reader.read_gamma()? as usize;
        if position_count > reader.remaining() / MIN_POSITION_BITS {
            return Err(QuillError::codec(format!(
                "position count {position_count} exceeds what {} remaining bits can encode",
                reader.remaining()
            )));
        }

        let mut positions = Vec::with_capacity(position_count);
        let mut prev_pos: i64 = -1;
        for _ in 0..position_count {
            let pos_gap = read_adaptive_gap(&mut reader)?;
            let pos = prev_pos + pos_gap as i64;
            positions.push(pos as u32);
            prev_pos = pos;
        }

        postings.push(Posting {
            doc_id: mapper.from_number(doc_num)?,
            term_frequency: tf,
            positions,
            skip: None,
        });
    }

    Ok(postings)
}
