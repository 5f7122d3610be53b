//! Coder contract.
//!
//! These traits are the whole surface a container needs from an engine. They
//! are independent capabilities: an encoder typically implements
//! [`StreamCoder`], [`SetCoderProperties`] and [`WriteCoderProperties`], a
//! decoder implements [`StreamCoder`] and [`SetDecoderProperties`].

use crate::error::Result;
use crate::props::PropertySet;
use std::io::{Read, Write};

/// Size of the canonical serialized property block.
pub const PROPERTIES_SIZE: usize = 5;

/// Receiver of coding progress.
///
/// Either count may be `None` when the engine cannot tell. Implementations run
/// on the coding thread and must return quickly.
pub trait ProgressSink {
    /// Report bytes consumed from the input and produced on the output.
    fn set_progress(&mut self, in_processed: Option<u64>, out_processed: Option<u64>);
}

impl<F> ProgressSink for F
where
    F: FnMut(Option<u64>, Option<u64>),
{
    fn set_progress(&mut self, in_processed: Option<u64>, out_processed: Option<u64>) {
        self(in_processed, out_processed)
    }
}

/// A sink that remembers the most recent report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressRecorder {
    /// Last reported input count.
    pub in_processed: Option<u64>,
    /// Last reported output count.
    pub out_processed: Option<u64>,
    /// Number of reports received.
    pub calls: u64,
}

impl ProgressSink for ProgressRecorder {
    fn set_progress(&mut self, in_processed: Option<u64>, out_processed: Option<u64>) {
        self.in_processed = in_processed;
        self.out_processed = out_processed;
        self.calls += 1;
    }
}

/// Byte counts of a finished coding call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodingStats {
    /// Bytes consumed from the input.
    pub bytes_in: u64,
    /// Bytes written to the output.
    pub bytes_out: u64,
}

/// Stream-to-stream coding.
pub trait StreamCoder {
    /// Code `input` into `output`.
    ///
    /// `in_size` and `out_size` are hints (`None` = unknown). A decoder uses
    /// `out_size` as the exact number of bytes to produce; without it the
    /// stream must carry an end marker.
    ///
    /// # Errors
    ///
    /// `DataError` when the input is not a valid stream for this coder, `Io`
    /// when one of the streams fails.
    fn code<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
        in_size: Option<u64>,
        out_size: Option<u64>,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Result<CodingStats>;
}

/// Encode-side property receiver.
pub trait SetCoderProperties {
    /// Apply every assignment in `props`, or none of them.
    fn set_coder_properties(&mut self, props: &PropertySet) -> Result<()>;
}

/// Serialization of the current encoder configuration.
pub trait WriteCoderProperties {
    /// Write the [`PROPERTIES_SIZE`]-byte property block to `output`.
    fn write_coder_properties<W: Write>(&self, output: &mut W) -> Result<()>;
}

/// Decode-side property receiver.
pub trait SetDecoderProperties {
    /// Rebuild the decoder configuration from a raw property block.
    ///
    /// The result depends only on `props`, never on earlier decoder state.
    fn set_decoder_properties(&mut self, props: &[u8]) -> Result<()>;
}
