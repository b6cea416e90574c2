//! Elias Gamma and Delta encoding primitives.
//!
//! Both codes are self-delimiting representations of positive integers:
//!
//! - Gamma(n): `L-1` zero bits followed by the `L`-bit binary form of `n`,
//!   where `L = floor(log2(n)) + 1`. Optimal for small values.
//! - Delta(n): `Gamma(L)` followed by the low `L-1` bits of `n` (the
//!   leading one bit is implicit). Cheaper than Gamma once values grow.
//!
//! Zero cannot be encoded by either code; callers that need to represent
//! zero add an offset (the postings codec starts its running sums at -1
//! for exactly this reason).

use bit_vec::BitVec;

use crate::error::{QuillError, Result};

/// Append-only bit buffer for encoding.
#[derive(Debug, Default)]
pub struct BitWriter {
    bits: BitVec,
}

impl BitWriter {
    /// Create an empty bit writer.
    pub fn new() -> Self {
        BitWriter { bits: BitVec::new() }
    }

    /// Append a single bit.
    pub fn push_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Number of bits written so far.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Whether no bits have been written.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Append the Elias Gamma code of `n`.
    ///
    /// Fails with a codec error if `n == 0`, which Gamma cannot represent.
    pub fn write_gamma(&mut self, n: u64) -> Result<()> {
        if n == 0 {
            return Err(QuillError::codec("Elias Gamma requires n >= 1, got 0"));
        }
        let length = 64 - n.leading_zeros() as usize;
        for _ in 0..length - 1 {
            self.bits.push(false);
        }
        for i in (0..length).rev() {
            self.bits.push((n >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Append the Elias Delta code of `n`.
    ///
    /// Fails with a codec error if `n == 0`.
    pub fn write_delta(&mut self, n: u64) -> Result<()> {
        if n == 0 {
            return Err(QuillError::codec("Elias Delta requires n >= 1, got 0"));
        }
        let length = 64 - n.leading_zeros() as usize;
        self.write_gamma(length as u64)?;
        // Low length-1 bits; the leading one is implied by the length.
        for i in (0..length - 1).rev() {
            self.bits.push((n >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Finish encoding: pad to a byte boundary with zero bits and return
    /// the packed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        // BitVec::to_bytes zero-pads the final partial byte.
        self.bits.to_bytes()
    }
}

/// Positional bit cursor for decoding.
#[derive(Debug)]
pub struct BitReader {
    bits: BitVec,
    pos: usize,
}

impl BitReader {
    /// Create a reader over packed bytes produced by [`BitWriter`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        BitReader {
            bits: BitVec::from_bytes(bytes),
            pos: 0,
        }
    }

    /// Current cursor position in bits.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether the cursor has consumed all bits (padding included).
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.bits.len()
    }

    /// Number of bits left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.bits.len().saturating_sub(self.pos)
    }

    /// Read one bit, failing if the buffer is exhausted.
    pub fn read_bit(&mut self) -> Result<bool> {
        let bit = self
            .bits
            .get(self.pos)
            .ok_or_else(|| QuillError::codec("unexpected end of bit stream"))?;
        self.pos += 1;
        Ok(bit)
    }

    fn read_bits(&mut self, count: usize) -> Result<u64> {
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    /// Decode one Elias Gamma code at the cursor.
    pub fn read_gamma(&mut self) -> Result<u64> {
        let mut zeros = 0usize;
        while !self.read_bit()? {
            zeros += 1;
            if zeros > 64 {
                return Err(QuillError::codec("Elias Gamma length prefix too long"));
            }
        }
        // The one bit just consumed is the leading bit of the value.
        let rest = self.read_bits(zeros)?;
        Ok((1u64 << zeros) | rest)
    }

    /// Decode one Elias Delta code at the cursor.
    pub fn read_delta(&mut self) -> Result<u64> {
        let length = self.read_gamma()?;
        if length == 1 {
            return Ok(1);
        }
        if length > 64 {
            return Err(QuillError::codec("Elias Delta length field too large"));
        }
        let rest = self.read_bits(length as usize - 1)?;
        Ok((1u64 << (length - 1)) | rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gamma_bits(n: u64) -> String {
        let mut writer = BitWriter::new();
        writer.write_gamma(n).unwrap();
        (0..writer.len())
            .map(|i| if writer.bits.get(i).unwrap() { '1' } else { '0' })
            .collect()
    }

    fn delta_bits(n: u64) -> String {
        let mut writer = BitWriter::new();
        writer.write_delta(n).unwrap();
        (0..writer.len())
            .map(|i| if writer.bits.get(i).unwrap() { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn test_gamma_known_encodings() {
        assert_eq!(gamma_bits(1), "1");
        assert_eq!(gamma_bits(2), "010");
        assert_eq!(gamma_bits(5), "00101");
        assert_eq!(gamma_bits(13), "0001101");
    }

    #[test]
    fn test_delta_known_encodings() {
        assert_eq!(delta_bits(1), "1");
        assert_eq!(delta_bits(2), "0100");
        assert_eq!(delta_bits(13), "00100101");
        assert_eq!(delta_bits(100), "001011100100");
    }

    #[test]
    fn test_gamma_round_trip() {
        let mut writer = BitWriter::new();
        let values: Vec<u64> = (1..=2048).chain([10_000, 123_456, u32::MAX as u64]).collect();
        for &n in &values {
            writer.write_gamma(n).unwrap();
        }
        let mut reader = BitReader::from_bytes(&writer.into_bytes());
        for &n in &values {
            assert_eq!(reader.read_gamma().unwrap(), n);
        }
    }

    #[test]
    fn test_delta_round_trip() {
        let mut writer = BitWriter::new();
        let values: Vec<u64> = (1..=2048).chain([10_000, 123_456, u32::MAX as u64]).collect();
        for &n in &values {
            writer.write_delta(n).unwrap();
        }
        let mut reader = BitReader::from_bytes(&writer.into_bytes());
        for &n in &values {
            assert_eq!(reader.read_delta().unwrap(), n);
        }
    }

    #[test]
    fn test_zero_is_rejected() {
        let mut writer = BitWriter::new();
        assert!(writer.write_gamma(0).is_err());
        assert!(writer.write_delta(0).is_err());
    }

    #[test]
    fn test_truncated_input_fails() {
        // Gamma(13) = 0001101 needs 7 bits; hand it only the zero prefix.
        let mut reader = BitReader::from_bytes(&[]);
        assert!(reader.read_gamma().is_err());

        let mut writer = BitWriter::new();
        writer.write_gamma(1 << 20).unwrap();
        let bytes = writer.into_bytes();
        // Chop the tail off; the length prefix promises more bits than exist.
        let mut reader = BitReader::from_bytes(&bytes[..1]);
        assert!(reader.read_gamma().is_err());
    }

    #[test]
    fn test_mixed_codes_share_a_stream() {
        let mut writer = BitWriter::new();
        writer.write_gamma(3).unwrap();
        writer.write_delta(200).unwrap();
        writer.write_gamma(15).unwrap();
        let mut reader = BitReader::from_bytes(&writer.into_bytes());
        assert_eq!(reader.read_gamma().unwrap(), 3);
        assert_eq!(reader.read_delta().unwrap(), 200);
        assert_eq!(reader.read_gamma().unwrap(), 15);
    }
}
