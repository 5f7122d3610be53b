//! Container compress/decompress protocols.

use crate::config::CodecConfig;
use crate::header::{ContainerHeader, HEADER_SIZE, HeaderRead, read_header};
use oxilz_core::error::Result;
use oxilz_core::traits::{
    CodingStats, PROPERTIES_SIZE, ProgressSink, SetCoderProperties, SetDecoderProperties,
    StreamCoder, WriteCoderProperties,
};
use oxilz_engine::{LzmaDecoder, LzmaEncoder};
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::debug;

/// Outcome of a decompression call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// The payload decoded to the declared number of bytes.
    Complete {
        /// Bytes written to the output.
        uncompressed_size: u64,
    },
    /// The input ended inside the 13-byte header; nothing was written.
    TruncatedHeader {
        /// Header bytes that were present.
        available: usize,
    },
}

impl DecompressStatus {
    /// Whether the payload was decoded.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Bytes between the current position and the end of a stream. The position
/// is restored.
fn remaining_len<S: Seek>(stream: &mut S) -> io::Result<u64> {
    let pos = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(pos))?;
    Ok(end.saturating_sub(pos))
}

/// LZMA container codec.
///
/// Streams are taken by value: pass `&mut stream` to keep using it after the
/// call, or the stream itself to have it dropped when the call returns.
#[derive(Debug, Clone, Default)]
pub struct LzmaCodec {
    config: CodecConfig,
}

impl LzmaCodec {
    /// Create a codec with the given configuration.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// The configuration used for compression.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn configured_encoder(&self) -> Result<LzmaEncoder> {
        let mut encoder = LzmaEncoder::new();
        encoder.set_coder_properties(&self.config.to_property_set()?)?;
        Ok(encoder)
    }

    /// Compress a seekable input from its current position to its end.
    ///
    /// The remaining length is measured up front and stored in the header.
    pub fn compress<R, W>(
        &self,
        mut input: R,
        output: W,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<CodingStats>
    where
        R: Read + Seek,
        W: Write,
    {
        let encoder = self.configured_encoder()?;
        let size = remaining_len(&mut input)?;
        self.run_compress(encoder, input, size, output, progress)
    }

    /// Compress exactly `size` bytes from a non-seekable input.
    ///
    /// Bytes past `size` are left unread. An input shorter than `size`
    /// fails with an `UnexpectedEof` I/O error.
    pub fn compress_sized<R, W>(
        &self,
        input: R,
        size: u64,
        output: W,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<CodingStats>
    where
        R: Read,
        W: Write,
    {
        let encoder = self.configured_encoder()?;
        self.run_compress(encoder, input, size, output, progress)
    }

    fn run_compress<R, W>(
        &self,
        mut encoder: LzmaEncoder,
        mut input: R,
        size: u64,
        mut output: W,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<CodingStats>
    where
        R: Read,
        W: Write,
    {
        debug!(config = ?self.config, "encoder configured");

        let mut properties = Vec::with_capacity(PROPERTIES_SIZE);
        encoder.write_coder_properties(&mut properties)?;
        let mut header = ContainerHeader {
            properties: [0u8; PROPERTIES_SIZE],
            uncompressed_size: size,
        };
        header.properties.copy_from_slice(&properties);
        header.write_to(&mut output)?;
        debug!(uncompressed_size = size, "header written");

        let stats = encoder.code(&mut input, &mut output, Some(size), None, progress)?;
        if stats.bytes_in != size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("input ended after {} of {size} bytes", stats.bytes_in),
            )
            .into());
        }

        output.flush()?;
        debug!(
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out + HEADER_SIZE as u64,
            "compression finished"
        );

        Ok(CodingStats {
            bytes_in: stats.bytes_in,
            bytes_out: stats.bytes_out + HEADER_SIZE as u64,
        })
    }

    /// Decompress a container from a seekable input.
    ///
    /// A header cut short is reported as
    /// [`DecompressStatus::TruncatedHeader`]. Malformed payloads fail with a
    /// data error; output written before the failure is not rolled back.
    pub fn decompress<R, W>(
        &self,
        mut input: R,
        mut output: W,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<DecompressStatus>
    where
        R: Read + Seek,
        W: Write,
    {
        let header = match read_header(&mut input)? {
            HeaderRead::Complete(header) => header,
            HeaderRead::Truncated { available } => {
                debug!(available, "container header truncated");
                return Ok(DecompressStatus::TruncatedHeader { available });
            }
        };
        debug!(uncompressed_size = header.uncompressed_size, "header read");

        let mut decoder = LzmaDecoder::new();
        decoder.set_decoder_properties(&header.properties)?;

        let compressed = remaining_len(&mut input)?;
        let stats = decoder.code(
            &mut input,
            &mut output,
            Some(compressed),
            Some(header.uncompressed_size),
            progress,
        )?;

        output.flush()?;
        debug!(
            bytes_in = stats.bytes_in,
            bytes_out = stats.bytes_out,
            "decompression finished"
        );

        Ok(DecompressStatus::Complete {
            uncompressed_size: stats.bytes_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxilz_core::error::OxiLzError;
    use oxilz_core::traits::ProgressRecorder;
    use std::io::Cursor;

    fn roundtrip(codec: &LzmaCodec, data: &[u8]) -> Vec<u8> {
        let mut packed = Vec::new();
        codec.compress(Cursor::new(data), &mut packed, None).unwrap();

        let mut unpacked = Vec::new();
        let status = codec
            .decompress(Cursor::new(&packed), &mut unpacked, None)
            .unwrap();
        assert_eq!(
            status,
            DecompressStatus::Complete {
                uncompressed_size: data.len() as u64
            }
        );
        unpacked
    }

    #[test]
    fn test_roundtrip_default() {
        let codec = LzmaCodec::default();
        let data = b"Hello, World! Hello, World! Hello again.".repeat(30);
        assert_eq!(roundtrip(&codec, &data), data);
        assert_eq!(roundtrip(&codec, b""), b"");
        assert_eq!(roundtrip(&codec, b"x"), b"x");
    }

    #[test]
    fn test_compress_from_current_position() {
        let codec = LzmaCodec::default();
        let mut input = Cursor::new(b"skip:payload".to_vec());
        input.set_position(5);

        let mut packed = Vec::new();
        let stats = codec.compress(&mut input, &mut packed, None).unwrap();
        assert_eq!(stats.bytes_in, 7);
        assert_eq!(stats.bytes_out, packed.len() as u64);
        assert_eq!(&packed[5..13], &7u64.to_le_bytes());
    }

    #[test]
    fn test_compress_sized() {
        let codec = LzmaCodec::default();
        let data = b"abcdefghij".repeat(10);

        let mut packed = Vec::new();
        codec
            .compress_sized(&data[..], 50, &mut packed, None)
            .unwrap();
        let mut unpacked = Vec::new();
        codec
            .decompress(Cursor::new(&packed), &mut unpacked, None)
            .unwrap();
        assert_eq!(unpacked, &data[..50]);

        let err = codec
            .compress_sized(&data[..], 500, Vec::<u8>::new(), None)
            .unwrap_err();
        assert!(matches!(err, OxiLzError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_invalid_config_touches_no_stream() {
        let codec = LzmaCodec::new(CodecConfig {
            pos_state_bits: 5,
            ..CodecConfig::default()
        });
        let mut packed = Vec::new();
        let err = codec
            .compress(Cursor::new(b"data".to_vec()), &mut packed, None)
            .unwrap_err();
        assert!(err.is_invalid_parameter());
        assert!(packed.is_empty());
    }

    #[test]
    fn test_truncated_header() {
        let codec = LzmaCodec::default();
        let mut out = Vec::new();
        let status = codec
            .decompress(Cursor::new(vec![0x5D, 0, 0]), &mut out, None)
            .unwrap();
        assert_eq!(status, DecompressStatus::TruncatedHeader { available: 3 });
        assert!(!status.is_complete());
        assert!(out.is_empty());
    }

    #[test]
    fn test_progress_counts() {
        let codec = LzmaCodec::default();
        let data: Vec<u8> = (0..300_000u32).map(|i| (i % 1000 / 3) as u8).collect();

        let mut recorder = ProgressRecorder::default();
        let mut packed = Vec::new();
        codec
            .compress(Cursor::new(&data), &mut packed, Some(&mut recorder))
            .unwrap();
        assert!(recorder.calls >= 2);
        assert_eq!(recorder.in_processed, Some(data.len() as u64));

        let mut recorder = ProgressRecorder::default();
        let mut unpacked = Vec::new();
        codec
            .decompress(Cursor::new(&packed), &mut unpacked, Some(&mut recorder))
            .unwrap();
        assert!(recorder.calls >= 2);
        assert_eq!(recorder.out_processed, Some(data.len() as u64));
    }
}
