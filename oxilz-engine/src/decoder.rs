//! LZMA decoder.
//!
//! The decoder is configured from a 5-byte property block and then decodes
//! one raw stream per [`code`](StreamCoder::code) call. With a known output
//! size the stream may end either cleanly or with an end marker; without one
//! the end marker is required.

use crate::model::{END_MARKER_DISTANCE, LzmaModel, State};
use crate::properties::PropertyBlock;
use crate::range_coder::RangeDecoder;
use oxilz_core::error::{OxiLzError, Result};
use oxilz_core::traits::{CodingStats, ProgressSink, SetDecoderProperties, StreamCoder};
use std::io::{self, BufReader, Read, Write};
use tracing::{debug, trace};

/// Output bytes between progress reports.
pub const PROGRESS_INTERVAL: u64 = 1 << 16;

/// Smallest history window the decoder keeps.
pub const MIN_WINDOW_SIZE: u64 = 1 << 12;

/// Circular history buffer that forwards decoded bytes to the output.
struct OutWindow<'a, W: Write> {
    output: &'a mut W,
    buf: Vec<u8>,
    size: usize,
    pos: usize,
    flushed: usize,
    total: u64,
}

impl<'a, W: Write> OutWindow<'a, W> {
    fn new(output: &'a mut W, size: usize) -> Self {
        Self {
            output,
            buf: Vec::new(),
            size,
            pos: 0,
            flushed: 0,
            total: 0,
        }
    }

    fn put(&mut self, byte: u8) -> io::Result<()> {
        if self.buf.len() < self.size {
            self.buf.push(byte);
        } else {
            self.buf[self.pos] = byte;
        }
        self.pos += 1;
        self.total += 1;

        if self.pos == self.size {
            self.flush()?;
            self.pos = 0;
            self.flushed = 0;
        }
        Ok(())
    }

    /// Byte `dist + 1` positions back. Callers check `dist < total`.
    fn get(&self, dist: u32) -> u8 {
        let dist = dist as usize;
        if dist < self.pos {
            self.buf[self.pos - dist - 1]
        } else {
            self.buf[self.size + self.pos - dist - 1]
        }
    }

    fn copy_match(&mut self, dist: u32, len: usize) -> io::Result<()> {
        for _ in 0..len {
            let byte = self.get(dist);
            self.put(byte)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.write_all(&self.buf[self.flushed..self.pos])?;
        self.flushed = self.pos;
        Ok(())
    }
}

/// Per-call decoding state.
struct Session<'a, W: Write> {
    model: LzmaModel,
    window: OutWindow<'a, W>,
    window_size: u64,
    state: State,
    reps: [u32; 4],
}

impl<W: Write> Session<'_, W> {
    fn check_distance(&self, dist: u32) -> Result<()> {
        let total = self.window.total;
        if dist as u64 >= total || dist as u64 >= self.window_size {
            return Err(OxiLzError::data_error(
                total,
                format!("match distance {} out of range", dist as u64 + 1),
            ));
        }
        Ok(())
    }

    /// Decode after the declared size was reached: only an end marker may
    /// follow.
    fn end_marker_follows<R: Read>(&mut self, rc: &mut RangeDecoder<R>) -> Result<bool> {
        let pos_state = self.model.pos_state(self.window.total);
        let s = self.state.value();
        if rc.decode_bit(&mut self.model.is_match[s][pos_state])? == 0 {
            return Ok(false);
        }
        if rc.decode_bit(&mut self.model.is_rep[s])? == 1 {
            return Ok(false);
        }
        let len = self.model.match_len.decode(rc, pos_state)?;
        let dist = self.model.distance.decode(rc, len)?;
        Ok(dist == END_MARKER_DISTANCE && rc.finish_ok()?)
    }

    fn run<R: Read>(
        &mut self,
        rc: &mut RangeDecoder<R>,
        out_size: Option<u64>,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> Result<()> {
        let mut next_report = PROGRESS_INTERVAL;

        loop {
            let total = self.window.total;

            if total >= next_report {
                next_report = total + PROGRESS_INTERVAL;
                trace!(processed = total, "decoding progress");
                if let Some(sink) = progress.as_deref_mut() {
                    sink.set_progress(Some(rc.bytes_read()), Some(total));
                }
            }

            if out_size == Some(total) {
                if rc.finish_ok()? || self.end_marker_follows(rc)? {
                    break;
                }
                return Err(OxiLzError::data_error(
                    total,
                    "stream continues past the declared size",
                ));
            }

            let pos_state = self.model.pos_state(total);
            let s = self.state.value();

            if rc.decode_bit(&mut self.model.is_match[s][pos_state])? == 0 {
                let prev = if total > 0 { self.window.get(0) } else { 0 };
                let byte = if self.state.is_literal() {
                    self.model.literal.decode(rc, total, prev)?
                } else {
                    let match_byte = self.window.get(self.reps[0]);
                    self.model
                        .literal
                        .decode_matched(rc, total, prev, match_byte)?
                };
                self.window.put(byte)?;
                self.state.update_literal();
                continue;
            }

            let len = if rc.decode_bit(&mut self.model.is_rep[s])? == 0 {
                let len = self.model.match_len.decode(rc, pos_state)?;
                let dist = self.model.distance.decode(rc, len)?;

                if dist == END_MARKER_DISTANCE {
                    if !rc.finish_ok()? {
                        return Err(OxiLzError::data_error(total, "corrupt end marker"));
                    }
                    if let Some(expected) = out_size {
                        return Err(OxiLzError::data_error(
                            total,
                            format!("end marker after {total} of {expected} bytes"),
                        ));
                    }
                    break;
                }

                self.check_distance(dist)?;
                self.reps.copy_within(0..3, 1);
                self.reps[0] = dist;
                self.state.update_match();
                len
            } else {
                if rc.decode_bit(&mut self.model.is_rep0[s])? == 0 {
                    if rc.decode_bit(&mut self.model.is_rep0_long[s][pos_state])? == 0 {
                        self.check_distance(self.reps[0])?;
                        self.state.update_short_rep();
                        let byte = self.window.get(self.reps[0]);
                        self.window.put(byte)?;
                        continue;
                    }
                } else {
                    let index = if rc.decode_bit(&mut self.model.is_rep1[s])? == 0 {
                        1
                    } else if rc.decode_bit(&mut self.model.is_rep2[s])? == 0 {
                        2
                    } else {
                        3
                    };
                    let dist = self.reps[index];
                    self.reps.copy_within(0..index, 1);
                    self.reps[0] = dist;
                }
                let len = self.model.rep_len.decode(rc, pos_state)?;
                self.check_distance(self.reps[0])?;
                self.state.update_long_rep();
                len
            };

            if let Some(expected) = out_size {
                if total + len as u64 > expected {
                    return Err(OxiLzError::data_error(
                        total,
                        format!("match of {len} bytes runs past the declared size {expected}"),
                    ));
                }
            }
            self.window.copy_match(self.reps[0], len)?;
        }

        self.window.flush()?;
        if let Some(sink) = progress.as_deref_mut() {
            sink.set_progress(Some(rc.bytes_read()), Some(self.window.total));
        }
        Ok(())
    }
}

/// Turn an early end of the compressed input into a data error.
fn truncated_to_data_error(err: OxiLzError, offset: u64) -> OxiLzError {
    match err {
        OxiLzError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            OxiLzError::data_error(offset, "compressed input ended early")
        }
        other => other,
    }
}

/// LZMA decoder.
#[derive(Debug, Clone, Default)]
pub struct LzmaDecoder {
    block: Option<PropertyBlock>,
}

impl LzmaDecoder {
    /// Create an unconfigured decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The property block currently in effect.
    pub fn properties(&self) -> Option<PropertyBlock> {
        self.block
    }
}

impl SetDecoderProperties for LzmaDecoder {
    fn set_decoder_properties(&mut self, props: &[u8]) -> Result<()> {
        let block = PropertyBlock::from_bytes(props)?;
        debug!(?block, "decoder configured");
        self.block = Some(block);
        Ok(())
    }
}

impl StreamCoder for LzmaDecoder {
    fn code<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
        in_size: Option<u64>,
        out_size: Option<u64>,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> Result<CodingStats> {
        let block = self
            .block
            .ok_or_else(|| OxiLzError::invalid_usage("decoder properties were not set"))?;

        if out_size == Some(0) {
            if let Some(sink) = progress.as_deref_mut() {
                sink.set_progress(Some(0), Some(0));
            }
            return Ok(CodingStats::default());
        }

        let mut window_size = (block.dict_size as u64).max(MIN_WINDOW_SIZE);
        if let Some(expected) = out_size {
            window_size = window_size.min(expected.max(MIN_WINDOW_SIZE));
        }
        debug!(?out_size, window_size, "decoding started");

        let reader = BufReader::new(Read::take(&mut *input, in_size.unwrap_or(u64::MAX)));
        let mut rc = RangeDecoder::new(reader).map_err(|e| truncated_to_data_error(e, 0))?;

        let mut session = Session {
            model: LzmaModel::new(block.props),
            window: OutWindow::new(output, window_size as usize),
            window_size,
            state: State::new(),
            reps: [0; 4],
        };

        let result = session.run(&mut rc, out_size, progress);
        let total = session.window.total;
        result.map_err(|e| truncated_to_data_error(e, total))?;

        debug!(bytes_in = rc.bytes_read(), bytes_out = total, "decoding finished");
        Ok(CodingStats {
            bytes_in: rc.bytes_read(),
            bytes_out: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::LzmaEncoder;
    use crate::properties::LzmaProperties;
    use oxilz_core::props::{PropertyId, PropertySet};
    use oxilz_core::traits::{SetCoderProperties, WriteCoderProperties};
    use std::io::Cursor;

    fn compress(data: &[u8], props: &PropertySet) -> (Vec<u8>, Vec<u8>) {
        let mut encoder = LzmaEncoder::new();
        encoder.set_coder_properties(props).unwrap();
        let mut block = Vec::new();
        encoder.write_coder_properties(&mut block).unwrap();
        let mut out = Vec::new();
        encoder
            .code(&mut Cursor::new(data), &mut out, None, None, None)
            .unwrap();
        (block, out)
    }

    fn decompress(block: &[u8], stream: &[u8], out_size: Option<u64>) -> Result<Vec<u8>> {
        let mut decoder = LzmaDecoder::new();
        decoder.set_decoder_properties(block)?;
        let mut out = Vec::new();
        decoder.code(&mut Cursor::new(stream), &mut out, None, out_size, None)?;
        Ok(out)
    }

    #[test]
    fn test_roundtrip_known_size() {
        let data = b"Hello, World! Hello, World! Hello, World!".repeat(20);
        let (block, stream) = compress(&data, &PropertySet::new());
        let out = decompress(&block, &stream, Some(data.len() as u64)).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_roundtrip_end_marker() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i / 7 % 256) as u8).collect();
        let props = PropertySet::new().with(PropertyId::EndMarker, true).unwrap();
        let (block, stream) = compress(&data, &props);

        assert_eq!(decompress(&block, &stream, None).unwrap(), data);
        assert_eq!(
            decompress(&block, &stream, Some(data.len() as u64)).unwrap(),
            data
        );
    }

    #[test]
    fn test_small_window_wraps() {
        let mut data = Vec::new();
        for i in 0..40_000u32 {
            data.push((i.wrapping_mul(2654435761) >> 24) as u8);
            if i % 3 == 0 {
                data.extend_from_slice(b"wrap");
            }
        }
        let props = PropertySet::new()
            .with(PropertyId::DictionarySize, 1u32 << 12)
            .unwrap();
        let (block, stream) = compress(&data, &props);
        assert_eq!(
            decompress(&block, &stream, Some(data.len() as u64)).unwrap(),
            data
        );
    }

    #[test]
    fn test_zero_size_reads_nothing() {
        let block = [0x5D, 0, 0, 1, 0];
        assert!(decompress(&block, &[], Some(0)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_properties() {
        let mut decoder = LzmaDecoder::new();
        let err = decoder
            .code(&mut Cursor::new(Vec::new()), &mut Vec::<u8>::new(), None, Some(1), None)
            .unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn test_truncated_stream_is_data_error() {
        let data = b"some text that is long enough to need several bytes".repeat(10);
        let (block, stream) = compress(&data, &PropertySet::new());
        let err = decompress(&block, &stream[..stream.len() / 2], Some(data.len() as u64))
            .unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn test_wrong_size_is_data_error() {
        let data = b"abcabcabcabcabcabc".to_vec();
        let (block, stream) = compress(&data, &PropertySet::new());
        assert!(
            decompress(&block, &stream, Some(data.len() as u64 + 100))
                .unwrap_err()
                .is_data_error()
        );
    }

    #[test]
    fn test_properties_replace_previous_state() {
        let mut decoder = LzmaDecoder::new();
        decoder.set_decoder_properties(&[0x00, 0, 0x10, 0, 0]).unwrap();
        decoder.set_decoder_properties(&[0x5D, 0, 0, 1, 0]).unwrap();

        let mut fresh = LzmaDecoder::new();
        fresh.set_decoder_properties(&[0x5D, 0, 0, 1, 0]).unwrap();
        assert_eq!(decoder.properties(), fresh.properties());
        assert_eq!(
            decoder.properties().map(|b| b.props),
            Some(LzmaProperties::default())
        );
    }

    #[test]
    fn test_invalid_property_byte() {
        let mut decoder = LzmaDecoder::new();
        assert!(
            decoder
                .set_decoder_properties(&[225, 0, 0, 1, 0])
                .unwrap_err()
                .is_invalid_parameter()
        );
    }
}
