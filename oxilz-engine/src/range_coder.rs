//! Range coder for LZMA.
//!
//! The range coder is an entropy coding method similar to arithmetic coding.
//! LZMA uses a specific variant with:
//! - 32-bit range tracking
//! - Normalization when range drops below 2^24
//! - 11-bit probability model (2048 = 100%)

use oxilz_core::error::{OxiLzError, Result};
use std::io::{self, Read, Write};

/// Number of bits in probability model.
pub const PROB_BITS: u32 = 11;

/// Initial probability (50%).
pub const PROB_INIT: u16 = 1 << (PROB_BITS - 1);

/// Probability scale.
pub const PROB_MAX: u16 = 1 << PROB_BITS;

/// Number of bits to shift for probability update.
pub const MOVE_BITS: u32 = 5;

/// Number of bytes the decoder primes itself with.
pub const INIT_BYTES: usize = 5;

const TOP_VALUE: u32 = 1 << 24;

/// Range decoder.
///
/// Normalization happens before each decision, so [`finish_ok`](Self::finish_ok)
/// performs the last pending normalization before checking the final code.
#[derive(Debug)]
pub struct RangeDecoder<R: Read> {
    reader: R,
    range: u32,
    code: u32,
    bytes_read: u64,
}

impl<R: Read> RangeDecoder<R> {
    /// Create a decoder and read the 5 priming bytes.
    ///
    /// An I/O `UnexpectedEof` means the compressed input is too short.
    pub fn new(reader: R) -> Result<Self> {
        let mut rc = Self {
            reader,
            range: 0xFFFF_FFFF,
            code: 0,
            bytes_read: 0,
        };

        if rc.read_byte()? != 0x00 {
            return Err(OxiLzError::data_error(0, "invalid range coder start byte"));
        }
        for _ in 1..INIT_BYTES {
            rc.code = (rc.code << 8) | rc.read_byte()? as u32;
        }
        if rc.code == rc.range {
            return Err(OxiLzError::data_error(0, "invalid range coder initial code"));
        }

        Ok(rc)
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        self.bytes_read += 1;
        Ok(buf[0])
    }

    fn normalize(&mut self) -> io::Result<()> {
        if self.range < TOP_VALUE {
            self.range <<= 8;
            self.code = (self.code << 8) | self.read_byte()? as u32;
        }
        Ok(())
    }

    /// Decode a single bit with the given probability.
    pub fn decode_bit(&mut self, prob: &mut u16) -> Result<u32> {
        self.normalize()?;

        let bound = (self.range >> PROB_BITS) * (*prob as u32);

        if self.code < bound {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
            Ok(0)
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob -= *prob >> MOVE_BITS;
            Ok(1)
        }
    }

    /// Decode `count` bits with fixed 50% probability, most significant first.
    pub fn decode_direct_bits(&mut self, count: u32) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..count {
            self.normalize()?;
            self.range >>= 1;
            let bit = if self.code >= self.range {
                self.code -= self.range;
                1
            } else {
                0
            };
            result = (result << 1) | bit;
        }
        Ok(result)
    }

    /// Decode a bit tree, most significant bit first.
    pub fn decode_bit_tree(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut m = 1usize;
        for _ in 0..num_bits {
            let bit = self.decode_bit(&mut probs[m])?;
            m = (m << 1) | bit as usize;
        }
        Ok((m as u32) - (1 << num_bits))
    }

    /// Decode a bit tree, least significant bit first.
    pub fn decode_bit_tree_reverse(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut m = 1usize;
        let mut result = 0u32;
        for i in 0..num_bits {
            let bit = self.decode_bit(&mut probs[m])?;
            m = (m << 1) | bit as usize;
            result |= bit << i;
        }
        Ok(result)
    }

    /// Complete the last normalization and report whether the stream ended
    /// cleanly (final code of zero).
    pub fn finish_ok(&mut self) -> Result<bool> {
        self.normalize()?;
        Ok(self.code == 0)
    }

    /// Compressed bytes consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

/// Range encoder.
///
/// Finished bytes accumulate in an internal buffer; callers move them to
/// their sink with [`drain_to`](Self::drain_to).
#[derive(Debug)]
pub struct RangeEncoder {
    pending: Vec<u8>,
    range: u32,
    low: u64,
    cache: u8,
    cache_size: u64,
}

impl RangeEncoder {
    /// Create a new range encoder.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            range: 0xFFFF_FFFF,
            low: 0,
            cache: 0,
            cache_size: 1,
        }
    }

    /// Emit the top byte of `low`, propagating a carry through the cached
    /// run of 0xFF bytes.
    fn shift_low(&mut self) {
        if self.low < 0xFF00_0000 || self.low > 0xFFFF_FFFF {
            let carry = (self.low >> 32) as u8;
            let mut byte = self.cache;
            loop {
                self.pending.push(byte.wrapping_add(carry));
                byte = 0xFF;
                self.cache_size -= 1;
                if self.cache_size == 0 {
                    break;
                }
            }
            self.cache = (self.low >> 24) as u8;
        }
        self.cache_size += 1;
        self.low = (self.low << 8) & 0xFFFF_FFFF;
    }

    fn normalize(&mut self) {
        if self.range < TOP_VALUE {
            self.range <<= 8;
            self.shift_low();
        }
    }

    /// Encode a single bit with the given probability.
    pub fn encode_bit(&mut self, prob: &mut u16, bit: u32) {
        let bound = (self.range >> PROB_BITS) * (*prob as u32);

        if bit == 0 {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
        } else {
            self.low += bound as u64;
            self.range -= bound;
            *prob -= *prob >> MOVE_BITS;
        }

        self.normalize();
    }

    /// Encode the low `count` bits of `value` with fixed 50% probability.
    pub fn encode_direct_bits(&mut self, value: u32, count: u32) {
        for i in (0..count).rev() {
            self.range >>= 1;
            if (value >> i) & 1 != 0 {
                self.low += self.range as u64;
            }
            self.normalize();
        }
    }

    /// Encode a bit tree, most significant bit first.
    pub fn encode_bit_tree(&mut self, probs: &mut [u16], num_bits: u32, value: u32) {
        let mut m = 1usize;
        for i in (0..num_bits).rev() {
            let bit = (value >> i) & 1;
            self.encode_bit(&mut probs[m], bit);
            m = (m << 1) | bit as usize;
        }
    }

    /// Encode a bit tree, least significant bit first.
    pub fn encode_bit_tree_reverse(&mut self, probs: &mut [u16], num_bits: u32, value: u32) {
        let mut m = 1usize;
        for i in 0..num_bits {
            let bit = (value >> i) & 1;
            self.encode_bit(&mut probs[m], bit);
            m = (m << 1) | bit as usize;
        }
    }

    /// Push out every remaining byte of `low`.
    pub fn flush(&mut self) {
        for _ in 0..5 {
            self.shift_low();
        }
    }

    /// Number of finished bytes not yet drained.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Write finished bytes to `output`, returning how many were written.
    pub fn drain_to<W: Write>(&mut self, output: &mut W) -> io::Result<u64> {
        output.write_all(&self.pending)?;
        let written = self.pending.len() as u64;
        self.pending.clear();
        Ok(written)
    }
}

impl Default for RangeEncoder {
    fn default() -> Self {
        Self::new()
    }
}
