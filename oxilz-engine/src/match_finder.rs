//! Streaming hash-chain match finder.
//!
//! The finder pulls input from a reader in blocks and keeps a sliding window
//! of at most `dict_size` bytes of history plus a lookahead of
//! [`LOOKAHEAD`] bytes. Positions are absolute offsets from the start of the
//! stream, so chain entries stay valid across window compaction.

use crate::model::{MATCH_LEN_MAX, MATCH_LEN_MIN};
use crate::settings::{EncoderSettings, MatchFinderKind};
use std::io::{self, Read};

/// Number of hash buckets.
pub const HASH_SIZE: usize = 1 << 16;

/// Bytes requested from the reader per refill.
pub const READ_BLOCK: usize = 1 << 16;

/// Bytes kept ahead of the coding position whenever input remains.
pub const LOOKAHEAD: usize = MATCH_LEN_MAX + 8;

const NIL: u64 = u64::MAX;

/// A match against earlier data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Match length in bytes.
    pub len: usize,
    /// Zero-based distance: the source starts `dist + 1` bytes back.
    pub dist: u32,
}

/// Hash-chain match finder over a reader.
#[derive(Debug)]
pub struct MatchFinder<R: Read> {
    reader: R,
    kind: MatchFinderKind,
    dict_size: u64,
    nice_len: usize,
    depth: u32,
    buf: Vec<u8>,
    base: u64,
    end_of_input: bool,
    total_read: u64,
    head: Vec<u64>,
    chain: Vec<u64>,
    cyclic_size: u64,
    inserted: u64,
}

/// FNV-1a over the first `n` bytes.
fn fnv(data: &[u8], n: usize) -> usize {
    let mut h = 2166136261u32;
    for &b in &data[..n] {
        h ^= b as u32;
        h = h.wrapping_mul(16777619);
    }
    (h as usize) & (HASH_SIZE - 1)
}

impl<R: Read> MatchFinder<R> {
    /// Create a finder configured from encoder settings.
    pub fn new(reader: R, settings: &EncoderSettings) -> Self {
        let dict_size = settings.dict_size as u64;
        Self {
            reader,
            kind: settings.match_finder,
            dict_size,
            nice_len: settings.num_fast_bytes as usize,
            depth: settings.cycles(),
            buf: Vec::new(),
            base: 0,
            end_of_input: false,
            total_read: 0,
            head: vec![NIL; HASH_SIZE],
            chain: Vec::new(),
            cyclic_size: dict_size + 1,
            inserted: 0,
        }
    }

    fn hash(&self, data: &[u8]) -> usize {
        match self.kind.hash_bytes() {
            2 => (data[0] as usize) | ((data[1] as usize) << 8),
            n => fnv(data, n),
        }
    }

    /// Make sure [`LOOKAHEAD`] bytes past `at` are buffered, unless the
    /// input ends first. History older than the dictionary may be dropped.
    pub fn fill(&mut self, at: u64) -> io::Result<()> {
        self.compact(at);

        while !self.end_of_input && self.available(at) < LOOKAHEAD {
            let old = self.buf.len();
            self.buf.resize(old + READ_BLOCK, 0);
            let n = loop {
                match self.reader.read(&mut self.buf[old..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.buf.truncate(old);
                        return Err(e);
                    }
                }
            };
            self.buf.truncate(old + n);
            self.total_read += n as u64;
            if n == 0 {
                self.end_of_input = true;
            }
        }
        Ok(())
    }

    fn compact(&mut self, at: u64) {
        let keep_from = at.saturating_sub(self.dict_size);
        let threshold = self.dict_size.max(READ_BLOCK as u64);
        if keep_from > self.base && keep_from - self.base >= threshold {
            self.buf.drain(..(keep_from - self.base) as usize);
            self.base = keep_from;
        }
    }

    /// Buffered bytes from `at` to the end of the data read so far.
    pub fn available(&self, at: u64) -> usize {
        (self.base + self.buf.len() as u64).saturating_sub(at) as usize
    }

    /// Byte at absolute position `pos`. The position must still be buffered.
    pub fn byte(&self, pos: u64) -> u8 {
        self.buf[(pos - self.base) as usize]
    }

    /// Total bytes pulled from the reader.
    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    /// Add every position below `end` to the hash chains.
    pub fn insert_upto(&mut self, end: u64) {
        let end = end.min(self.base + self.buf.len() as u64);
        let hash_bytes = self.kind.hash_bytes();

        while self.inserted < end {
            let at = self.inserted;
            let offset = (at - self.base) as usize;
            let prev = if self.buf.len() - offset >= hash_bytes {
                let h = self.hash(&self.buf[offset..]);
                std::mem::replace(&mut self.head[h], at)
            } else {
                NIL
            };

            let slot = (at % self.cyclic_size) as usize;
            if slot == self.chain.len() {
                self.chain.push(prev);
            } else {
                self.chain[slot] = prev;
            }
            self.inserted += 1;
        }
    }

    /// Longest match for the data at `at` among inserted positions.
    ///
    /// The search stops at the configured depth or once a match reaches the
    /// fast-bytes length.
    pub fn find(&self, at: u64) -> Option<Match> {
        let avail = self.available(at);
        if avail < self.kind.hash_bytes().max(MATCH_LEN_MIN) {
            return None;
        }

        let max_len = avail.min(MATCH_LEN_MAX);
        let lowest = at.saturating_sub(self.dict_size).max(self.base);
        let cur = &self.buf[(at - self.base) as usize..];

        let mut cand = self.head[self.hash(cur)];
        let mut newer = at;
        let mut best: Option<Match> = None;

        for _ in 0..self.depth {
            if cand == NIL || cand >= newer || cand < lowest {
                break;
            }

            let src = &self.buf[(cand - self.base) as usize..];
            let len = cur
                .iter()
                .zip(src)
                .take(max_len)
                .take_while(|(a, b)| a == b)
                .count();

            if len >= MATCH_LEN_MIN && best.is_none_or(|b| len > b.len) {
                best = Some(Match {
                    len,
                    dist: (at - cand - 1) as u32,
                });
                if len >= self.nice_len || len == max_len {
                    break;
                }
            }

            newer = cand;
            cand = self.chain[(cand % self.cyclic_size) as usize];
        }

        best
    }

    /// Length of the match at `at` against the data `dist + 1` bytes back.
    pub fn rep_len(&self, at: u64, dist: u32) -> usize {
        let back = dist as u64 + 1;
        if back > at || at - back < self.base {
            return 0;
        }

        let max_len = self.available(at).min(MATCH_LEN_MAX);
        let cur = &self.buf[(at - self.base) as usize..];
        let src = &self.buf[(at - back - self.base) as usize..];
        cur.iter()
            .zip(src)
            .take(max_len)
            .take_while(|(a, b)| a == b)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn finder(data: &[u8], kind: MatchFinderKind) -> MatchFinder<Cursor<Vec<u8>>> {
        let settings = EncoderSettings {
            dict_size: 1 << 12,
            match_finder: kind,
            ..EncoderSettings::default()
        };
        MatchFinder::new(Cursor::new(data.to_vec()), &settings)
    }

    #[test]
    fn test_fnv_is_masked() {
        assert!(fnv(b"abcd", 3) < HASH_SIZE);
        assert_eq!(fnv(b"abcd", 4), fnv(b"abcdzz", 4));
    }

    #[test]
    fn test_finds_repeat() {
        let data = b"abcdefgh_abcdefgh";
        let mut mf = finder(data, MatchFinderKind::Bt4);
        mf.fill(0).unwrap();
        mf.insert_upto(9);

        let m = mf.find(9).unwrap();
        assert_eq!(m, Match { len: 8, dist: 8 });
        assert_eq!(mf.rep_len(9, 8), 8);
        assert_eq!(mf.rep_len(9, 100), 0);
    }

    #[test]
    fn test_no_match_in_fresh_data() {
        let mut mf = finder(b"0123456789", MatchFinderKind::Bt2);
        mf.fill(0).unwrap();
        mf.insert_upto(5);
        assert_eq!(mf.find(5), None);
    }

    #[test]
    fn test_overlapping_run() {
        let data = vec![b'z'; 100];
        let mut mf = finder(&data, MatchFinderKind::Hc4);
        mf.fill(0).unwrap();
        mf.insert_upto(1);
        let m = mf.find(1).unwrap();
        assert_eq!(m.dist, 0);
        assert_eq!(m.len, 99);
    }

    #[test]
    fn test_window_compaction_keeps_history() {
        let data: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        let mut mf = finder(&data, MatchFinderKind::Bt3);
        let mut at = 0u64;
        while at < 250_000 {
            mf.fill(at).unwrap();
            mf.insert_upto(at);
            at += 1;
        }
        assert!(mf.base > 0);
        assert_eq!(mf.byte(at - 1), ((at - 1) % 251) as u8);
        let m = mf.find(at).unwrap();
        assert_eq!(m.dist, 250);
        assert!(mf.total_read() >= at + LOOKAHEAD as u64);
    }
}
