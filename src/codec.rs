//! Compression codecs for postings lists.
//!
//! Two families are provided:
//!
//! - [`elias`]: self-delimiting Elias Gamma/Delta bit codes, combined by
//!   [`postings`] into an adaptive gap encoding of a full postings list.
//! - [`zlib`]: an off-the-shelf deflate baseline that compresses the JSON
//!   form of a postings list, used to measure what the custom codec buys.

pub mod elias;
pub mod postings;
pub mod zlib;

pub use elias::{BitReader, BitWriter};
pub use postings::{compress_postings, decompress_postings};
