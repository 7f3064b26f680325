//! Bit sequences
//!
//! - [`BitSet`]: self-describing. `{VARINT word_count}{i64 word}*`, big-endian
//!   words, bit `i` stored in word `i / 64` at position `i % 64`.
//! - [`FixedBitSet`]: length fixed by context, not written on the wire.
//!   `ceil(N / 8)` raw bytes, bit `i` stored in byte `i / 8` at position `i % 8`.

use std::ops::{BitAnd, BitOr, BitXor, Not};

use mcwire_core::{CodecError, Result, ValidationError};

use crate::buffer::Buffer;
use crate::serializable::Serializable;

/// Length-prefixed bit set made of 64-bit words
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitSet {
    data: Vec<u64>,
}

impl BitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw words, least significant word first
    pub fn from_words(data: Vec<u64>) -> Self {
        Self { data }
    }

    /// Build from an integer value
    ///
    /// `words` defaults to the minimum needed to hold `value`.
    pub fn from_int(value: u128, words: Option<usize>) -> Self {
        let needed = (128 - value.leading_zeros() as usize).div_ceil(64);
        let words = words.unwrap_or(needed);
        let data = (0..words)
            .map(|i| if i < 2 { (value >> (i * 64)) as u64 } else { 0 })
            .collect();
        Self { data }
    }

    pub fn words(&self) -> &[u64] {
        &self.data
    }

    /// Number of bits (word count * 64)
    pub fn len(&self) -> usize {
        self.data.len() * 64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bits past the end read as unset
    pub fn get(&self, index: usize) -> bool {
        self.data
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    /// Setting a bit past the end grows the set
    pub fn set(&mut self, index: usize, value: bool) {
        let word = index / 64;
        if word >= self.data.len() {
            if !value {
                return;
            }
            self.data.resize(word + 1, 0);
        }
        if value {
            self.data[word] |= 1 << (index % 64);
        } else {
            self.data[word] &= !(1 << (index % 64));
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(u64, u64) -> u64) -> Self {
        let words = self.data.len().max(other.data.len());
        let data = (0..words)
            .map(|i| {
                let a = self.data.get(i).copied().unwrap_or(0);
                let b = other.data.get(i).copied().unwrap_or(0);
                f(a, b)
            })
            .collect();
        Self { data }
    }
}

impl Serializable for BitSet {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        self.validate()?;
        buf.write_varint(self.data.len() as i32);
        for word in &self.data {
            buf.write_u64(*word);
        }
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        let offset = buf.position();
        let count = buf.read_varint()?;
        if count < 0 {
            return Err(CodecError::MalformedInput(format!(
                "Negative bitset word count {} at offset {}",
                count, offset
            )));
        }

        // Check before allocating so a hostile count cannot reserve memory
        let needed = count as usize * 8;
        if buf.remaining() < needed {
            return Err(CodecError::InsufficientData {
                offset: buf.position(),
                requested: needed,
                available: buf.remaining(),
            });
        }

        let data = (0..count)
            .map(|_| buf.read_u64())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { data })
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.data.len() > i32::MAX as usize {
            return Err(ValidationError::TooLong {
                field: "bitset words",
                length: self.data.len(),
                max: i32::MAX as usize,
            });
        }
        Ok(())
    }
}

impl BitAnd for &BitSet {
    type Output = BitSet;

    fn bitand(self, rhs: Self) -> BitSet {
        self.zip_with(rhs, |a, b| a & b)
    }
}

impl BitOr for &BitSet {
    type Output = BitSet;

    fn bitor(self, rhs: Self) -> BitSet {
        self.zip_with(rhs, |a, b| a | b)
    }
}

impl BitXor for &BitSet {
    type Output = BitSet;

    fn bitxor(self, rhs: Self) -> BitSet {
        self.zip_with(rhs, |a, b| a ^ b)
    }
}

impl Not for &BitSet {
    type Output = BitSet;

    fn not(self) -> BitSet {
        BitSet {
            data: self.data.iter().map(|word| !word).collect(),
        }
    }
}

/// Bit set of exactly `N` bits packed into `ceil(N / 8)` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBitSet<const N: usize> {
    data: Vec<u8>,
}

impl<const N: usize> Default for FixedBitSet<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FixedBitSet<N> {
    /// Number of bytes on the wire
    pub const BYTE_LEN: usize = N.div_ceil(8);

    /// All bits unset
    pub fn new() -> Self {
        Self {
            data: vec![0; Self::BYTE_LEN],
        }
    }

    /// Wrap raw bytes, checking their length
    pub fn from_bytes(data: Vec<u8>) -> std::result::Result<Self, ValidationError> {
        let bits = Self { data };
        bits.validate()?;
        Ok(bits)
    }

    /// Big-endian two's complement of `value`, truncated to the set's width
    pub fn from_int(value: i128) -> Self {
        let be = value.to_be_bytes();
        let mut data = vec![if value < 0 { 0xFF } else { 0 }; Self::BYTE_LEN];
        let take = Self::BYTE_LEN.min(be.len());
        let dst = Self::BYTE_LEN - take;
        data[dst..].copy_from_slice(&be[be.len() - take..]);
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of bits
    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub fn get(&self, index: usize) -> bool {
        self.data
            .get(index / 8)
            .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
    }

    /// Indices outside `0..N` are ignored
    pub fn set(&mut self, index: usize, value: bool) {
        if index >= N {
            return;
        }
        if value {
            self.data[index / 8] |= 1 << (index % 8);
        } else {
            self.data[index / 8] &= !(1 << (index % 8));
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(u8, u8) -> u8) -> Self {
        Self {
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        }
    }
}

impl<const N: usize> Serializable for FixedBitSet<N> {
    fn serialize_to(&self, buf: &mut Buffer) -> Result<()> {
        self.validate()?;
        buf.write(&self.data);
        Ok(())
    }

    fn deserialize(buf: &mut Buffer) -> Result<Self> {
        let data = buf.read(Self::BYTE_LEN)?.to_vec();
        Ok(Self { data })
    }

    fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.data.len() != Self::BYTE_LEN {
            return Err(ValidationError::Invalid {
                field: "fixed bitset",
                reason: format!(
                    "holds {} bytes, expected {} for {} bits",
                    self.data.len(),
                    Self::BYTE_LEN,
                    N
                ),
            });
        }
        Ok(())
    }
}

impl<const N: usize> BitAnd for &FixedBitSet<N> {
    type Output = FixedBitSet<N>;

    fn bitand(self, rhs: Self) -> FixedBitSet<N> {
        self.zip_with(rhs, |a, b| a & b)
    }
}

impl<const N: usize> BitOr for &FixedBitSet<N> {
    type Output = FixedBitSet<N>;

    fn bitor(self, rhs: Self) -> FixedBitSet<N> {
        self.zip_with(rhs, |a, b| a | b)
    }
}

impl<const N: usize> BitXor for &FixedBitSet<N> {
    type Output = FixedBitSet<N>;

    fn bitxor(self, rhs: Self) -> FixedBitSet<N> {
        self.zip_with(rhs, |a, b| a ^ b)
    }
}

impl<const N: usize> Not for &FixedBitSet<N> {
    type Output = FixedBitSet<N>;

    fn not(self) -> FixedBitSet<N> {
        FixedBitSet {
            data: self.data.iter().map(|byte| !byte).collect(),
        }
    }
}
