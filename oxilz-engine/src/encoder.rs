//! LZMA encoder.
//!
//! Parsing is greedy over a hash-chain match finder. In
//! [`Algorithm::Normal`] mode a match is deferred by one byte when the next
//! position offers a clearly longer one.

use crate::match_finder::{Match, MatchFinder};
use crate::model::{END_MARKER_DISTANCE, LzmaModel, MATCH_LEN_MIN, State};
use crate::properties::PropertyBlock;
use crate::range_coder::RangeEncoder;
use crate::settings::{Algorithm, EncoderSettings};
use oxilz_core::error::Result;
use oxilz_core::props::PropertySet;
use oxilz_core::traits::{
    CodingStats, ProgressSink, SetCoderProperties, StreamCoder, WriteCoderProperties,
};
use std::io::{Read, Write};
use tracing::{debug, trace, warn};

/// Input bytes between progress reports.
pub const PROGRESS_INTERVAL: u64 = 1 << 16;

/// Finished output bytes buffered before they are written out.
const DRAIN_THRESHOLD: usize = 1 << 16;

/// Length-2 matches at or beyond this distance cost more than two literals.
const SHORT_MATCH_MAX_DIST: u32 = 0x80;

/// One coding decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Literal,
    ShortRep,
    Rep { index: usize, len: usize },
    Match { dist: u32, len: usize },
}

impl Op {
    fn len(self) -> usize {
        match self {
            Op::Literal | Op::ShortRep => 1,
            Op::Rep { len, .. } | Op::Match { len, .. } => len,
        }
    }
}

/// Per-call coding state.
struct Session {
    rc: RangeEncoder,
    model: LzmaModel,
    state: State,
    reps: [u32; 4],
    pos: u64,
}

impl Session {
    fn new(settings: &EncoderSettings) -> Self {
        Self {
            rc: RangeEncoder::new(),
            model: LzmaModel::new(settings.props),
            state: State::new(),
            reps: [0; 4],
            pos: 0,
        }
    }

    fn encode<R: Read>(&mut self, mf: &MatchFinder<R>, op: Op) {
        let pos_state = self.model.pos_state(self.pos);
        let s = self.state.value();

        match op {
            Op::Literal => {
                self.rc.encode_bit(&mut self.model.is_match[s][pos_state], 0);
                let byte = mf.byte(self.pos);
                let prev = if self.pos > 0 { mf.byte(self.pos - 1) } else { 0 };
                if self.state.is_literal() {
                    self.model.literal.encode(&mut self.rc, self.pos, prev, byte);
                } else {
                    let match_byte = mf.byte(self.pos - self.reps[0] as u64 - 1);
                    self.model
                        .literal
                        .encode_matched(&mut self.rc, self.pos, prev, byte, match_byte);
                }
                self.state.update_literal();
            }
            Op::ShortRep => {
                self.rc.encode_bit(&mut self.model.is_match[s][pos_state], 1);
                self.rc.encode_bit(&mut self.model.is_rep[s], 1);
                self.rc.encode_bit(&mut self.model.is_rep0[s], 0);
                self.rc
                    .encode_bit(&mut self.model.is_rep0_long[s][pos_state], 0);
                self.state.update_short_rep();
            }
            Op::Rep { index, len } => {
                self.rc.encode_bit(&mut self.model.is_match[s][pos_state], 1);
                self.rc.encode_bit(&mut self.model.is_rep[s], 1);
                if index == 0 {
                    self.rc.encode_bit(&mut self.model.is_rep0[s], 0);
                    self.rc
                        .encode_bit(&mut self.model.is_rep0_long[s][pos_state], 1);
                } else {
                    self.rc.encode_bit(&mut self.model.is_rep0[s], 1);
                    if index == 1 {
                        self.rc.encode_bit(&mut self.model.is_rep1[s], 0);
                    } else {
                        self.rc.encode_bit(&mut self.model.is_rep1[s], 1);
                        self.rc
                            .encode_bit(&mut self.model.is_rep2[s], (index == 3) as u32);
                    }
                    let dist = self.reps[index];
                    self.reps.copy_within(0..index, 1);
                    self.reps[0] = dist;
                }
                self.model.rep_len.encode(&mut self.rc, len, pos_state);
                self.state.update_long_rep();
            }
            Op::Match { dist, len } => {
                self.rc.encode_bit(&mut self.model.is_match[s][pos_state], 1);
                self.rc.encode_bit(&mut self.model.is_rep[s], 0);
                self.model.match_len.encode(&mut self.rc, len, pos_state);
                self.model.distance.encode(&mut self.rc, dist, len);
                self.reps.copy_within(0..3, 1);
                self.reps[0] = dist;
                self.state.update_match();
            }
        }

        self.pos += op.len() as u64;
    }

    fn encode_end_marker(&mut self) {
        let pos_state = self.model.pos_state(self.pos);
        let s = self.state.value();
        self.rc.encode_bit(&mut self.model.is_match[s][pos_state], 1);
        self.rc.encode_bit(&mut self.model.is_rep[s], 0);
        self.model
            .match_len
            .encode(&mut self.rc, MATCH_LEN_MIN, pos_state);
        self.model
            .distance
            .encode(&mut self.rc, END_MARKER_DISTANCE, MATCH_LEN_MIN);
    }

    /// Best main match at `at`, dropping short matches that are too far away.
    fn main_match<R: Read>(mf: &MatchFinder<R>, at: u64) -> Option<Match> {
        mf.find(at)
            .filter(|m| m.len > MATCH_LEN_MIN || m.dist < SHORT_MATCH_MAX_DIST)
    }

    fn choose<R: Read>(&self, mf: &mut MatchFinder<R>, algorithm: Algorithm, nice_len: usize) -> Op {
        let at = self.pos;
        mf.insert_upto(at);

        let mut best_rep: Option<(usize, usize)> = None;
        for (index, &dist) in self.reps.iter().enumerate() {
            let len = mf.rep_len(at, dist);
            if len >= MATCH_LEN_MIN && best_rep.is_none_or(|(_, l)| len > l) {
                best_rep = Some((index, len));
            }
        }

        let op = match (best_rep, Self::main_match(mf, at)) {
            (Some((index, len)), Some(m)) if len >= m.len || (index == 0 && len >= 3) => {
                Op::Rep { index, len }
            }
            (_, Some(m)) => Op::Match {
                dist: m.dist,
                len: m.len,
            },
            (Some((index, len)), None) => Op::Rep { index, len },
            (None, None) => {
                if mf.rep_len(at, self.reps[0]) == 1 {
                    Op::ShortRep
                } else {
                    Op::Literal
                }
            }
        };

        let Op::Match { len, .. } = op else {
            return op;
        };
        if algorithm == Algorithm::Normal && len < nice_len && mf.available(at) > len + 1 {
            mf.insert_upto(at + 1);
            if Self::main_match(mf, at + 1).is_some_and(|next| next.len > len + 1) {
                return Op::Literal;
            }
        }

        op
    }
}

/// LZMA encoder.
///
/// Settings persist across [`code`](StreamCoder::code) calls; all coding
/// state is rebuilt for each call.
#[derive(Debug, Clone, Default)]
pub struct LzmaEncoder {
    settings: EncoderSettings,
}

impl LzmaEncoder {
    /// Create an encoder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder with the given settings.
    pub fn with_settings(settings: EncoderSettings) -> Self {
        Self { settings }
    }

    /// Current settings.
    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// The property block describing the current settings.
    pub fn property_block(&self) -> PropertyBlock {
        PropertyBlock {
            props: self.settings.props,
            dict_size: self.settings.dict_size,
        }
    }
}

impl SetCoderProperties for LzmaEncoder {
    fn set_coder_properties(&mut self, props: &PropertySet) -> Result<()> {
        self.settings.apply(props)?;
        if self.settings.num_threads > 1 {
            warn!(
                num_threads = self.settings.num_threads,
                "multi-threaded match finding is not available, encoding on one thread"
            );
        }
        debug!(settings = ?self.settings, "encoder configured");
        Ok(())
    }
}

impl WriteCoderProperties for LzmaEncoder {
    fn write_coder_properties<W: Write>(&self, output: &mut W) -> Result<()> {
        output.write_all(&self.property_block().to_bytes())?;
        Ok(())
    }
}

impl StreamCoder for LzmaEncoder {
    fn code<R: Read, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
        in_size: Option<u64>,
        _out_size: Option<u64>,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> Result<CodingStats> {
        let settings = &self.settings;
        let nice_len = settings.num_fast_bytes as usize;
        let limited = Read::take(&mut *input, in_size.unwrap_or(u64::MAX));
        let mut mf = MatchFinder::new(limited, settings);
        let mut session = Session::new(settings);
        let mut written = 0u64;
        let mut next_report = PROGRESS_INTERVAL;

        debug!(?in_size, dict_size = settings.dict_size, "encoding started");

        loop {
            mf.fill(session.pos)?;
            if mf.available(session.pos) == 0 {
                break;
            }

            let op = session.choose(&mut mf, settings.algorithm, nice_len);
            session.encode(&mf, op);

            if session.rc.pending_len() >= DRAIN_THRESHOLD {
                written += session.rc.drain_to(output)?;
            }

            if session.pos >= next_report {
                next_report = session.pos + PROGRESS_INTERVAL;
                let out = written + session.rc.pending_len() as u64;
                trace!(processed = session.pos, out, "encoding progress");
                if let Some(sink) = progress.as_deref_mut() {
                    sink.set_progress(Some(session.pos), Some(out));
                }
            }
        }

        if settings.end_marker {
            session.encode_end_marker();
        }
        if session.pos > 0 || settings.end_marker {
            session.rc.flush();
        }
        written += session.rc.drain_to(output)?;

        if let Some(sink) = progress.as_deref_mut() {
            sink.set_progress(Some(session.pos), Some(written));
        }
        debug!(
            bytes_in = session.pos,
            bytes_out = written,
            read = mf.total_read(),
            "encoding finished"
        );

        Ok(CodingStats {
            bytes_in: session.pos,
            bytes_out: written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxilz_core::props::PropertyId;
    use std::io::Cursor;

    fn encode(encoder: &mut LzmaEncoder, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encoder
            .code(&mut Cursor::new(data), &mut out, None, None, None)
            .unwrap();
        out
    }

    #[test]
    fn test_empty_input_writes_nothing() {
        let mut encoder = LzmaEncoder::new();
        assert!(encode(&mut encoder, b"").is_empty());
    }

    #[test]
    fn test_empty_input_with_marker() {
        let mut encoder = LzmaEncoder::new();
        let props = PropertySet::new().with(PropertyId::EndMarker, true).unwrap();
        encoder.set_coder_properties(&props).unwrap();
        let out = encode(&mut encoder, b"");
        assert!(!out.is_empty());
        assert_eq!(out[0], 0);
    }

    #[test]
    fn test_write_properties() {
        let mut encoder = LzmaEncoder::new();
        let props = PropertySet::new()
            .with(PropertyId::DictionarySize, 1u32 << 16)
            .unwrap();
        encoder.set_coder_properties(&props).unwrap();

        let mut block = Vec::new();
        encoder.write_coder_properties(&mut block).unwrap();
        assert_eq!(block, vec![0x5D, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_repetitive_input_shrinks() {
        let data = b"ABCDABCDABCDABCD".repeat(1000);
        let mut encoder = LzmaEncoder::new();
        let out = encode(&mut encoder, &data);
        assert!(out.len() < data.len() / 20);
    }

    #[test]
    fn test_in_size_limits_input() {
        let data = vec![7u8; 1000];
        let mut encoder = LzmaEncoder::new();
        let mut out = Vec::new();
        let stats = encoder
            .code(&mut Cursor::new(&data), &mut out, Some(10), None, None)
            .unwrap();
        assert_eq!(stats.bytes_in, 10);
        assert_eq!(stats.bytes_out, out.len() as u64);
    }

    #[test]
    fn test_progress_reports() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 97) as u8).collect();
        let mut encoder = LzmaEncoder::new();
        let mut seen = Vec::new();
        let mut sink = |i: Option<u64>, o: Option<u64>| seen.push((i, o));
        let mut out = Vec::new();
        encoder
            .code(&mut Cursor::new(&data), &mut out, None, None, Some(&mut sink))
            .unwrap();

        assert!(seen.len() >= 3);
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(seen.last().copied(), Some((Some(200_000), Some(out.len() as u64))));
    }

    #[test]
    fn test_fast_and_normal_both_encode() {
        let data = b"the quick brown fox jumps over the lazy dog, the quick brown cat".repeat(50);
        for algorithm in [0u32, 1] {
            let mut encoder = LzmaEncoder::new();
            let props = PropertySet::new()
                .with(PropertyId::Algorithm, algorithm)
                .unwrap();
            encoder.set_coder_properties(&props).unwrap();
            let out = encode(&mut encoder, &data);
            assert!(out.len() < data.len() / 4);
        }
    }
}
