//! Sample-and-hold gate

use ufmt::derive::uDebug;

/// What the hold gate did with one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HoldTransition {
    /// Gate went high; the sample became the reference
    Acquired(u16),
    /// Gate still high; reference unchanged
    Holding,
    /// Gate went low while holding
    Released,
    /// Gate low and nothing held
    Idle,
}

/// Frozen reference sample.
///
/// The reference is written in exactly one place, on the first sample that
/// sees the hold gate asserted, and is only readable while holding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HoldState {
    holding: bool,
    reference: u16,
}

impl HoldState {
    pub const fn new() -> Self {
        Self {
            holding: false,
            reference: 0,
        }
    }

    pub fn update(&mut self, hold_gate: bool, sample: u16) -> HoldTransition {
        match (hold_gate, self.holding) {
            (true, false) => {
                self.reference = sample;
                self.holding = true;
                HoldTransition::Acquired(sample)
            }
            (true, true) => HoldTransition::Holding,
            (false, true) => {
                self.holding = false;
                HoldTransition::Released
            }
            (false, false) => HoldTransition::Idle,
        }
    }

    #[inline]
    pub fn is_holding(&self) -> bool {
        self.holding
    }

    #[inline]
    pub fn reference(&self) -> Option<u16> {
        if self.holding {
            Some(self.reference)
        } else {
            None
        }
    }
}
