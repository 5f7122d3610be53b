//! LZMA probability models.
//!
//! LZMA uses context-dependent probability models for:
//! - Literal encoding (context = previous byte + position)
//! - Match length encoding
//! - Distance encoding
//! - State machine transitions

use crate::properties::LzmaProperties;
use crate::range_coder::{PROB_INIT, RangeDecoder, RangeEncoder};
use oxilz_core::error::Result;
use std::io::Read;

/// Maximum number of position states.
pub const POS_STATES_MAX: usize = 1 << 4;

/// Number of states in the LZMA state machine.
pub const NUM_STATES: usize = 12;

/// Number of bits for low length coding.
pub const LEN_LOW_BITS: u32 = 3;
/// Number of bits for mid length coding.
pub const LEN_MID_BITS: u32 = 3;
/// Number of bits for high length coding.
pub const LEN_HIGH_BITS: u32 = 8;

const LEN_LOW_SYMBOLS: usize = 1 << LEN_LOW_BITS;
const LEN_MID_SYMBOLS: usize = 1 << LEN_MID_BITS;
const LEN_HIGH_SYMBOLS: usize = 1 << LEN_HIGH_BITS;

/// Minimum match length.
pub const MATCH_LEN_MIN: usize = 2;

/// Maximum match length.
pub const MATCH_LEN_MAX: usize =
    MATCH_LEN_MIN + LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS + LEN_HIGH_SYMBOLS - 1;

/// Number of length states used to select a distance slot model.
pub const LEN_TO_DIST_STATES: usize = 4;

/// Number of bits of a distance slot.
pub const DIST_SLOT_BITS: u32 = 6;

/// Number of alignment bits for distance encoding.
pub const DIST_ALIGN_BITS: u32 = 4;

/// First slot whose low bits are coded with the alignment model.
pub const END_POS_MODEL_INDEX: u32 = 14;

/// Number of distances coded entirely with the special model.
pub const FULL_DISTANCES: usize = 1 << (END_POS_MODEL_INDEX >> 1);

/// Distance value reserved for the end-of-stream marker.
pub const END_MARKER_DISTANCE: u32 = 0xFFFF_FFFF;

/// LZMA state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(u8);

impl State {
    /// Initial state.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Get state value.
    pub fn value(self) -> usize {
        self.0 as usize
    }

    /// Whether the previous symbol was a literal.
    pub fn is_literal(self) -> bool {
        self.0 < 7
    }

    /// Update state after literal.
    pub fn update_literal(&mut self) {
        self.0 = match self.0 {
            0..=3 => 0,
            4..=9 => self.0 - 3,
            _ => self.0 - 6,
        };
    }

    /// Update state after match.
    pub fn update_match(&mut self) {
        self.0 = if self.0 < 7 { 7 } else { 10 };
    }

    /// Update state after short rep.
    pub fn update_short_rep(&mut self) {
        self.0 = if self.0 < 7 { 9 } else { 11 };
    }

    /// Update state after long rep.
    pub fn update_long_rep(&mut self) {
        self.0 = if self.0 < 7 { 8 } else { 11 };
    }
}

/// Length model, shared by the match and rep-match paths.
#[derive(Debug, Clone)]
pub struct LengthModel {
    choice: u16,
    choice2: u16,
    low: Vec<[u16; LEN_LOW_SYMBOLS]>,
    mid: Vec<[u16; LEN_MID_SYMBOLS]>,
    high: [u16; LEN_HIGH_SYMBOLS],
}

impl LengthModel {
    /// Create a new length model.
    pub fn new(num_pos_states: usize) -> Self {
        Self {
            choice: PROB_INIT,
            choice2: PROB_INIT,
            low: vec![[PROB_INIT; LEN_LOW_SYMBOLS]; num_pos_states],
            mid: vec![[PROB_INIT; LEN_MID_SYMBOLS]; num_pos_states],
            high: [PROB_INIT; LEN_HIGH_SYMBOLS],
        }
    }

    /// Encode a match length (`MATCH_LEN_MIN..=MATCH_LEN_MAX`).
    pub fn encode(&mut self, rc: &mut RangeEncoder, len: usize, pos_state: usize) {
        let len = (len - MATCH_LEN_MIN) as u32;

        if len < LEN_LOW_SYMBOLS as u32 {
            rc.encode_bit(&mut self.choice, 0);
            rc.encode_bit_tree(&mut self.low[pos_state], LEN_LOW_BITS, len);
        } else if len < (LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS) as u32 {
            rc.encode_bit(&mut self.choice, 1);
            rc.encode_bit(&mut self.choice2, 0);
            rc.encode_bit_tree(
                &mut self.mid[pos_state],
                LEN_MID_BITS,
                len - LEN_LOW_SYMBOLS as u32,
            );
        } else {
            rc.encode_bit(&mut self.choice, 1);
            rc.encode_bit(&mut self.choice2, 1);
            rc.encode_bit_tree(
                &mut self.high,
                LEN_HIGH_BITS,
                len - (LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS) as u32,
            );
        }
    }

    /// Decode a match length.
    pub fn decode<R: Read>(&mut self, rc: &mut RangeDecoder<R>, pos_state: usize) -> Result<usize> {
        let len = if rc.decode_bit(&mut self.choice)? == 0 {
            rc.decode_bit_tree(&mut self.low[pos_state], LEN_LOW_BITS)? as usize
        } else if rc.decode_bit(&mut self.choice2)? == 0 {
            LEN_LOW_SYMBOLS + rc.decode_bit_tree(&mut self.mid[pos_state], LEN_MID_BITS)? as usize
        } else {
            LEN_LOW_SYMBOLS
                + LEN_MID_SYMBOLS
                + rc.decode_bit_tree(&mut self.high, LEN_HIGH_BITS)? as usize
        };
        Ok(len + MATCH_LEN_MIN)
    }
}

/// Literal model.
#[derive(Debug, Clone)]
pub struct LiteralModel {
    probs: Vec<[u16; 0x300]>,
    lc: u32,
    lp_mask: u64,
}

impl LiteralModel {
    /// Create a new literal model.
    pub fn new(props: LzmaProperties) -> Self {
        Self {
            probs: vec![[PROB_INIT; 0x300]; props.num_lit_states()],
            lc: props.lc,
            lp_mask: (1u64 << props.lp) - 1,
        }
    }

    /// Index of the probability table for a literal at `pos` after `prev_byte`.
    fn table(&self, pos: u64, prev_byte: u8) -> usize {
        let lit_pos = (pos & self.lp_mask) as usize;
        (lit_pos << self.lc) + ((prev_byte as usize) >> (8 - self.lc))
    }

    /// Encode a literal without match context.
    pub fn encode(&mut self, rc: &mut RangeEncoder, pos: u64, prev_byte: u8, byte: u8) {
        let table = self.table(pos, prev_byte);
        let probs = &mut self.probs[table];
        let mut context = 1usize;
        for i in (0..8).rev() {
            let bit = ((byte >> i) & 1) as u32;
            rc.encode_bit(&mut probs[context], bit);
            context = (context << 1) | bit as usize;
        }
    }

    /// Encode a literal using the byte at rep0 as extra context.
    pub fn encode_matched(
        &mut self,
        rc: &mut RangeEncoder,
        pos: u64,
        prev_byte: u8,
        byte: u8,
        match_byte: u8,
    ) {
        let table = self.table(pos, prev_byte);
        let probs = &mut self.probs[table];
        let mut offs = 0x100usize;
        let mut symbol = byte as usize | 0x100;
        let mut match_byte = match_byte as usize;
        while symbol < 0x10000 {
            match_byte <<= 1;
            let index = offs + (match_byte & offs) + (symbol >> 8);
            rc.encode_bit(&mut probs[index], ((symbol >> 7) & 1) as u32);
            symbol <<= 1;
            offs &= !(match_byte ^ symbol);
        }
    }

    /// Decode a literal without match context.
    pub fn decode<R: Read>(
        &mut self,
        rc: &mut RangeDecoder<R>,
        pos: u64,
        prev_byte: u8,
    ) -> Result<u8> {
        let table = self.table(pos, prev_byte);
        let probs = &mut self.probs[table];
        let mut symbol = 1usize;
        while symbol < 0x100 {
            symbol = (symbol << 1) | rc.decode_bit(&mut probs[symbol])? as usize;
        }
        Ok((symbol - 0x100) as u8)
    }

    /// Decode a literal using the byte at rep0 as extra context.
    pub fn decode_matched<R: Read>(
        &mut self,
        rc: &mut RangeDecoder<R>,
        pos: u64,
        prev_byte: u8,
        match_byte: u8,
    ) -> Result<u8> {
        let table = self.table(pos, prev_byte);
        let probs = &mut self.probs[table];
        let mut offs = 0x100usize;
        let mut symbol = 1usize;
        let mut match_byte = match_byte as usize;
        while symbol < 0x100 {
            match_byte <<= 1;
            let match_bit = match_byte & offs;
            let bit = rc.decode_bit(&mut probs[offs + match_bit + symbol])?;
            symbol = (symbol << 1) | bit as usize;
            if bit == 0 {
                offs &= !match_bit;
            } else {
                offs &= match_bit;
            }
        }
        Ok((symbol - 0x100) as u8)
    }
}

/// Distance model.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    slot: [[u16; 1 << DIST_SLOT_BITS]; LEN_TO_DIST_STATES],
    special: [u16; FULL_DISTANCES - END_POS_MODEL_INDEX as usize],
    align: [u16; 1 << DIST_ALIGN_BITS],
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot of a zero-based distance.
pub fn dist_slot(dist: u32) -> u32 {
    if dist < 4 {
        return dist;
    }
    let bits = 32 - dist.leading_zeros();
    ((bits - 1) << 1) | ((dist >> (bits - 2)) & 1)
}

fn len_state(len: usize) -> usize {
    (len - MATCH_LEN_MIN).min(LEN_TO_DIST_STATES - 1)
}

impl DistanceModel {
    /// Create a new distance model.
    pub fn new() -> Self {
        Self {
            slot: [[PROB_INIT; 1 << DIST_SLOT_BITS]; LEN_TO_DIST_STATES],
            special: [PROB_INIT; FULL_DISTANCES - END_POS_MODEL_INDEX as usize],
            align: [PROB_INIT; 1 << DIST_ALIGN_BITS],
        }
    }

    /// Encode a zero-based distance for a match of length `len`.
    pub fn encode(&mut self, rc: &mut RangeEncoder, dist: u32, len: usize) {
        let slot = dist_slot(dist);
        rc.encode_bit_tree(&mut self.slot[len_state(len)], DIST_SLOT_BITS, slot);

        if slot < 4 {
            return;
        }

        let num_direct_bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << num_direct_bits;
        let reduced = dist - base;

        if slot < END_POS_MODEL_INDEX {
            // probabilities for this slot start at base - slot - 1, indexed from 1
            let offset = base as usize - slot as usize;
            let mut m = 1usize;
            for i in 0..num_direct_bits {
                let bit = (reduced >> i) & 1;
                rc.encode_bit(&mut self.special[offset + m - 1], bit);
                m = (m << 1) | bit as usize;
            }
        } else {
            rc.encode_direct_bits(reduced >> DIST_ALIGN_BITS, num_direct_bits - DIST_ALIGN_BITS);
            rc.encode_bit_tree_reverse(
                &mut self.align,
                DIST_ALIGN_BITS,
                reduced & ((1 << DIST_ALIGN_BITS) - 1),
            );
        }
    }

    /// Decode a zero-based distance for a match of length `len`.
    pub fn decode<R: Read>(&mut self, rc: &mut RangeDecoder<R>, len: usize) -> Result<u32> {
        let slot = rc.decode_bit_tree(&mut self.slot[len_state(len)], DIST_SLOT_BITS)?;

        if slot < 4 {
            return Ok(slot);
        }

        let num_direct_bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << num_direct_bits;

        if slot < END_POS_MODEL_INDEX {
            let offset = base as usize - slot as usize;
            let mut m = 1usize;
            let mut reduced = 0u32;
            for i in 0..num_direct_bits {
                let bit = rc.decode_bit(&mut self.special[offset + m - 1])?;
                m = (m << 1) | bit as usize;
                reduced |= bit << i;
            }
            Ok(base + reduced)
        } else {
            let high = rc.decode_direct_bits(num_direct_bits - DIST_ALIGN_BITS)?;
            let low = rc.decode_bit_tree_reverse(&mut self.align, DIST_ALIGN_BITS)?;
            Ok(base
                .wrapping_add(high << DIST_ALIGN_BITS)
                .wrapping_add(low))
        }
    }
}

/// Complete set of LZMA probability tables.
#[derive(Debug, Clone)]
pub struct LzmaModel {
    /// Literal/position bit configuration.
    pub props: LzmaProperties,
    /// Is-match probabilities.
    pub is_match: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// Is-rep probabilities.
    pub is_rep: [u16; NUM_STATES],
    /// Is-rep0 probabilities.
    pub is_rep0: [u16; NUM_STATES],
    /// Is-rep1 probabilities.
    pub is_rep1: [u16; NUM_STATES],
    /// Is-rep2 probabilities.
    pub is_rep2: [u16; NUM_STATES],
    /// Is-rep0-long probabilities.
    pub is_rep0_long: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// Match length model.
    pub match_len: LengthModel,
    /// Rep match length model.
    pub rep_len: LengthModel,
    /// Literal model.
    pub literal: LiteralModel,
    /// Distance model.
    pub distance: DistanceModel,
}

impl LzmaModel {
    /// Create a model with every probability at 50%.
    pub fn new(props: LzmaProperties) -> Self {
        let num_pos_states = props.num_pos_states();

        Self {
            props,
            is_match: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            is_rep: [PROB_INIT; NUM_STATES],
            is_rep0: [PROB_INIT; NUM_STATES],
            is_rep1: [PROB_INIT; NUM_STATES],
            is_rep2: [PROB_INIT; NUM_STATES],
            is_rep0_long: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            match_len: LengthModel::new(num_pos_states),
            rep_len: LengthModel::new(num_pos_states),
            literal: LiteralModel::new(props),
            distance: DistanceModel::new(),
        }
    }

    /// Position state for an absolute position.
    pub fn pos_state(&self, pos: u64) -> usize {
        (pos as usize) & (self.props.num_pos_states() - 1)
    }
}
