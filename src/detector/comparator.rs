//! Threshold comparator

use ufmt::derive::uDebug;

use crate::config::Polarity;

/// Line state recovered from one sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Keying {
    /// Within `threshold` of the reference
    Mark,
    /// Above reference + threshold
    Space,
}

/// Classify `current` against the held `reference`.
///
/// The sum is widened so a reference near full scale cannot wrap.
#[inline]
pub fn classify(current: u16, reference: u16, threshold: u16) -> Keying {
    if u32::from(current) > u32::from(reference) + u32::from(threshold) {
        Keying::Space
    } else {
        Keying::Mark
    }
}

impl Polarity {
    /// Result line level for `keying`.
    #[inline]
    pub const fn level(self, keying: Keying) -> bool {
        match (self, keying) {
            (Polarity::ExceedsHigh, Keying::Space) | (Polarity::ExceedsLow, Keying::Mark) => true,
            (Polarity::ExceedsHigh, Keying::Mark) | (Polarity::ExceedsLow, Keying::Space) => false,
        }
    }
}
