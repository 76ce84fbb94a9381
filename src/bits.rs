//! Register readings and the transitions between two of them.

use core::ops::Index;

use serde::{Deserialize, Serialize};

use crate::config::MAX_BITS;

/// Logical bit position within the (possibly chained) register.
///
/// Not a GPIO number: index 0 is the first parallel input of the chain,
/// `bit_count - 1` the last.
pub type PinIndex = usize;

/// One full register reading, index 0 = first parallel input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitSequence {
    bits: heapless::Vec<bool, MAX_BITS>,
}

impl BitSequence {
    /// `None` if `bits` is longer than [`MAX_BITS`].
    pub fn from_slice(bits: &[bool]) -> Option<Self> {
        heapless::Vec::from_slice(bits).ok().map(|bits| Self { bits })
    }

    /// Low `len` bits of `value`, bit 0 landing at index 0.
    pub fn from_bits(value: u64, len: usize) -> Self {
        let len = len.min(MAX_BITS);
        let bits = (0..len).map(|i| (value >> i) & 1 == 1).collect();
        Self { bits }
    }

    pub(crate) fn from_vec(bits: heapless::Vec<bool, MAX_BITS>) -> Self {
        Self { bits }
    }

    /// Pack into an integer, index 0 = least-significant bit.
    pub fn to_bits(&self) -> u64 {
        self.bits
            .iter()
            .enumerate()
            .fold(0, |acc, (i, &high)| acc | (u64::from(high) << i))
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn get(&self, pin: PinIndex) -> Option<bool> {
        self.bits.get(pin).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    /// Indices currently high, ascending.
    pub fn high_pins(&self) -> impl Iterator<Item = PinIndex> + '_ {
        self.iter().enumerate().filter(|&(_, b)| b).map(|(i, _)| i)
    }
}

impl Index<PinIndex> for BitSequence {
    type Output = bool;

    fn index(&self, pin: PinIndex) -> &bool {
        &self.bits[pin]
    }
}

/// Pins that changed between two readings, split by new level.
///
/// Both lists are ascending and disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionSet {
    went_high: heapless::Vec<PinIndex, MAX_BITS>,
    went_low: heapless::Vec<PinIndex, MAX_BITS>,
}

impl TransitionSet {
    pub fn went_high(&self) -> &[PinIndex] {
        &self.went_high
    }

    pub fn went_low(&self) -> &[PinIndex] {
        &self.went_low
    }

    pub fn is_empty(&self) -> bool {
        self.went_high.is_empty() && self.went_low.is_empty()
    }

    /// Total number of changed pins.
    pub fn len(&self) -> usize {
        self.went_high.len() + self.went_low.len()
    }
}

/// Compare `current` against `previous`, ascending by pin.
///
/// A pin lands in `went_high` if it differs and is now high, in
/// `went_low` if it differs and is now low.  Readings from one driver
/// always share a length; extra trailing bits on either side are ignored.
pub fn diff(current: &BitSequence, previous: &BitSequence) -> TransitionSet {
    debug_assert_eq!(current.len(), previous.len(), "diffing readings of different widths");

    let mut set = TransitionSet::default();
    for (pin, (now, before)) in current.iter().zip(previous.iter()).enumerate() {
        if now == before {
            continue;
        }
        let pushed = if now {
            set.went_high.push(pin)
        } else {
            set.went_low.push(pin)
        };
        // Readings hold at most MAX_BITS pins, so neither list can overflow.
        debug_assert!(pushed.is_ok(), "transition list over MAX_BITS");
    }
    set
}
