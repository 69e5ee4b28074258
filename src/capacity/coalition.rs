//! Bitmask coalitions over an ordered criteria list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A subset of criteria, encoded as a bitmask over criterion indices.
///
/// Bit `i` is set when the criterion at position `i` of the owning
/// capacity's criteria list belongs to the coalition. The numeric order of
/// the masks places every `A \ {i}` before `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coalition(u32);

impl Coalition {
    pub const EMPTY: Self = Self(0);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The grand coalition of `n` criteria.
    pub fn full(n: usize) -> Self {
        Self(((1u64 << n) - 1) as u32)
    }

    pub fn singleton(index: usize) -> Self {
        Self(1 << index)
    }

    /// Every coalition over `n` criteria, in mask order.
    pub fn all(n: usize) -> impl Iterator<Item = Coalition> {
        (0..(1u32 << n)).map(Coalition)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }

    pub fn with(self, index: usize) -> Self {
        Self(self.0 | (1 << index))
    }

    pub fn without(self, index: usize) -> Self {
        Self(self.0 & !(1 << index))
    }

    pub fn union(self, other: Coalition) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_subset_of(self, other: Coalition) -> bool {
        self.0 & !other.0 == 0
    }

    /// Indices of the members, ascending.
    pub fn members(self) -> impl Iterator<Item = usize> {
        let bits = self.0;
        (0..u32::BITS as usize).filter(move |i| bits & (1 << i) != 0)
    }

    /// Every subset of this coalition, including the empty set and itself.
    pub fn subsets(self) -> Subsets {
        Subsets {
            mask: self.0,
            next: Some(self.0),
        }
    }
}

impl fmt::Display for Coalition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (pos, index) in self.members().enumerate() {
            if pos > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "}}")
    }
}

/// Submask iterator, descending from the mask itself down to the empty set.
pub struct Subsets {
    mask: u32,
    next: Option<u32>,
}

impl Iterator for Subsets {
    type Item = Coalition;

    fn next(&mut self) -> Option<Coalition> {
        let current = self.next?;
        self.next = if current == 0 {
            None
        } else {
            Some((current - 1) & self.mask)
        };
        Some(Coalition(current))
    }
}
