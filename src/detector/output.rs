//! Result line driver

use crate::config::{DetectorConfig, ReleasePolicy};
use crate::detector::comparator::Keying;

/// Tracks the level last committed to the result line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResultDriver {
    level: bool,
}

impl ResultDriver {
    pub const fn new(idle_level: bool) -> Self {
        Self { level: idle_level }
    }

    /// Level to write for this sample, or `None` to leave the line alone.
    ///
    /// `keying` is `Some` only while the detector is active (holding and, if
    /// gated, enabled).
    pub fn next_level(&self, config: &DetectorConfig, keying: Option<Keying>) -> Option<bool> {
        match keying {
            Some(keying) => Some(config.polarity.level(keying)),
            None => match config.release {
                ReleasePolicy::DriveIdle => Some(config.idle_level),
                ReleasePolicy::Retain => None,
            },
        }
    }

    pub fn commit(&mut self, level: bool) {
        self.level = level;
    }

    #[inline]
    pub fn level(&self) -> bool {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Polarity;

    #[test]
    fn inactive_drives_idle_or_retains() {
        let driver = ResultDriver::new(false);
        let gated = DetectorConfig::ENABLE_GATED;
        assert_eq!(driver.next_level(&gated, None), Some(false));

        let fail_safe = DetectorConfig::FAIL_SAFE_MARK;
        assert_eq!(driver.next_level(&fail_safe, None), Some(true));

        let legacy = gated.with_release(ReleasePolicy::Retain);
        assert_eq!(driver.next_level(&legacy, None), None);
    }

    #[test]
    fn active_follows_polarity() {
        let driver = ResultDriver::new(false);
        let cfg = DetectorConfig::ENABLE_GATED;
        assert_eq!(driver.next_level(&cfg, Some(Keying::Space)), Some(true));
        let inverted = cfg.with_polarity(Polarity::ExceedsLow);
        assert_eq!(driver.next_level(&inverted, Some(Keying::Space)), Some(false));
    }
}
