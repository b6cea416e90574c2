//! Deflate baseline for postings compression.
//!
//! Compresses the JSON form of a postings list with zlib. Exists as
//! the library counterpart to the custom Elias codec so the two can
//! be compared on size and speed.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{QuillError, Result};
use crate::index::posting::PostingList;

/// Compress raw bytes with zlib at the default level.
pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress zlib bytes.
pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| QuillError::codec(format!("zlib decompression failed: {e}")))?;
    Ok(out)
}

/// Serialize a postings list to JSON and compress it.
pub fn compress_posting_list(list: &PostingList) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(list)?;
    compress_bytes(&json)
}

/// Decompress and deserialize a postings list.
pub fn decompress_posting_list(data: &[u8]) -> Result<PostingList> {
    let json = decompress_bytes(data)?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::posting::Posting;

    #[test]
    fn test_round_trip() {
        let list = PostingList::from(vec![
            Posting::new("news_1", 3, vec![10, 25, 89]),
            Posting::new("wiki_5", 1, vec![7]),
        ]);
        let bytes = compress_posting_list(&list).unwrap();
        assert_eq!(decompress_posting_list(&bytes).unwrap(), list);
    }

    #[test]
    fn test_repetitive_payload_shrinks() {
        let list = PostingList::from(
            (0..200)
                .map(|i| Posting::new(format!("news_{i}"), 1, vec![0]))
                .collect::<Vec<_>>(),
        );
        let json = serde_json::to_vec(&list).unwrap();
        let bytes = compress_posting_list(&list).unwrap();
        assert!(bytes.len() < json.len());
    }

    #[test]
    fn test_corrupt_input_fails() {
        assert!(decompress_bytes(b"not zlib data").is_err());
    }
}
