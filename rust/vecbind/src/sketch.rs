//! Bit-sketches of integer sets for locality-sensitive hashing.
//!
//! Every member is scrambled with [`mix`] and sets one bit of a fixed-width
//! buffer of 64-bit words. Equal inputs produce equal sketches, and sets
//! sharing members share bits, so Hamming distance between sketches tracks
//! set overlap.

use crate::dispatch::HashableArray;

pub const BITS_PER_WORD: usize = 64;

/// 64-bit integer mixer. Bijective, and maps 0 to 0.
#[inline]
pub fn mix(mut v: u64) -> u64 {
    v ^= v.rotate_right(25) ^ v.rotate_right(50);
    v = v.wrapping_mul(0xA24B_AED4_963E_E407);
    v ^= v.rotate_right(24) ^ v.rotate_right(49);
    v = v.wrapping_mul(0x9FB2_1C65_1E98_DF25);
    v ^ (v >> 28)
}

/// A reusable sketch buffer of `ceil(bits / 64)` words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSketch {
    words: Vec<u64>,
}

impl BitSketch {
    pub fn new(bits: usize) -> Self {
        Self {
            words: vec![0; bits.div_ceil(BITS_PER_WORD)],
        }
    }

    /// Number of 64-bit words.
    pub fn words(&self) -> usize {
        self.words.len()
    }

    /// Usable bits, i.e. the requested bits rounded up to whole words.
    pub fn bits(&self) -> usize {
        self.words.len() * BITS_PER_WORD
    }

    /// The most recent sketch.
    pub fn as_words(&self) -> &[u64] {
        &self.words
    }

    /// Overwrite the buffer with the sketch of `array`.
    pub fn hash(&mut self, array: &HashableArray<'_>) -> &[u64] {
        self.words.fill(0);
        match array {
            HashableArray::U16(v) => self.scatter(v.iter().map(u64::from)),
            HashableArray::U32(v) => self.scatter(v.iter().map(u64::from)),
            HashableArray::U64(v) => self.scatter(v.iter()),
        }
        &self.words
    }

    /// Overwrite the buffer with the sketch of `values`.
    pub fn hash_values(&mut self, values: &[u64]) -> &[u64] {
        self.words.fill(0);
        self.scatter(values.iter().copied());
        &self.words
    }

    fn scatter(&mut self, values: impl Iterator<Item = u64>) {
        let words = self.words.len() as u64;
        if words == 0 {
            return;
        }
        for value in values {
            let h = mix(value);
            self.words[(h % words) as usize] |= 1 << (h % BITS_PER_WORD as u64);
        }
    }
}
