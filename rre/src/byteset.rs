use std::fmt::{Debug, Display, Formatter};

/// A set of byte values, stored as a 256 bit mask.
#[derive(Hash, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteRangeSet {
    bits: [u64; 4],
}

impl ByteRangeSet {
    pub const fn empty() -> Self {
        Self { bits: [0; 4] }
    }

    pub const fn full() -> Self {
        Self {
            bits: [u64::MAX; 4],
        }
    }

    pub fn single(byte: u8) -> Self {
        *Self::empty().add_one(byte)
    }

    pub fn range(lo: u8, hi: u8) -> Self {
        *Self::empty().add(lo, hi)
    }

    /// Adds every byte in `lo..=hi`. An inverted range adds nothing.
    pub fn add(&mut self, lo: u8, hi: u8) -> &mut Self {
        for byte in lo..=hi {
            self.add_one(byte);
        }
        self
    }

    pub fn add_one(&mut self, byte: u8) -> &mut Self {
        self.bits[usize::from(byte >> 6)] |= 1 << (byte & 63);
        self
    }

    /// Removes every byte in `lo..=hi`.
    pub fn remove(&mut self, lo: u8, hi: u8) -> &mut Self {
        for byte in lo..=hi {
            self.bits[usize::from(byte >> 6)] &= !(1 << (byte & 63));
        }
        self
    }

    pub fn contains(&self, byte: u8) -> bool {
        self.bits[usize::from(byte >> 6)] & (1 << (byte & 63)) != 0
    }

    pub fn union(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a | b)
    }

    /// Bytes in `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & !b)
    }

    pub fn intersection(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & b)
    }

    pub fn complement(&self) -> Self {
        Self::full().difference(self)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&word| word == 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(|&byte| self.contains(byte))
    }

    /// Maximal runs of consecutive members, in ascending order.
    pub fn ranges(&self) -> Vec<(u8, u8)> {
        let mut ranges: Vec<(u8, u8)> = Vec::new();
        for byte in self.iter() {
            match ranges.last_mut() {
                Some((_, hi)) if hi.checked_add(1) == Some(byte) => *hi = byte,
                _ => ranges.push((byte, byte)),
            }
        }
        ranges
    }

    fn zip_with(&self, other: &Self, f: impl Fn(u64, u64) -> u64) -> Self {
        let mut bits = [0; 4];
        for (i, word) in bits.iter_mut().enumerate() {
            *word = f(self.bits[i], other.bits[i]);
        }
        Self { bits }
    }
}

impl FromIterator<u8> for ByteRangeSet {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut set = Self::empty();
        for byte in iter {
            set.add_one(byte);
        }
        set
    }
}

impl Display for ByteRangeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if *self == Self::full() {
            return write!(f, "[any]");
        }
        write!(f, "[")?;
        for (lo, hi) in self.ranges() {
            if lo == hi {
                write!(f, "{}", lo.escape_ascii())?;
            } else {
                write!(f, "{}-{}", lo.escape_ascii(), hi.escape_ascii())?;
            }
        }
        write!(f, "]")
    }
}

impl Debug for ByteRangeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
