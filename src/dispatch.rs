//! Interrupt dispatch glue
//!
//! [`Dispatcher`] owns everything the two interrupt handlers share. The
//! firmware keeps one inside an interrupt-free mutex; the bench drives one
//! directly.

use ufmt::derive::uDebug;

use crate::config::DetectorConfig;
use crate::detector::{Cycle, Detector};
use crate::error::Result;
use crate::lines::{LinePort, OutputLine};
use crate::telemetry::{ByteLink, DiagnosticEvent, Telemetry, TelemetryStats};

/// Timing and telemetry hazards. The firmware never acts on these; they exist
/// so the console and the bench can see them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HazardCounters {
    pub telemetry: TelemetryStats,
    /// Sample handler runs that overran the sampler period: another
    /// conversion completed before the handler returned. That conversion is
    /// still serviced on the next vector; it is only lost if a third one
    /// lands first, so this over-counts real drops.
    pub late_samples: u16,
}

pub struct Dispatcher<L, T, const DEPTH: usize> {
    lines: L,
    link: T,
    detector: Detector,
    telemetry: Telemetry<DEPTH>,
    strobe: bool,
    heartbeat: bool,
    late_samples: u16,
}

impl<L, T, const DEPTH: usize> Dispatcher<L, T, DEPTH>
where
    L: LinePort,
    T: ByteLink,
{
    pub fn new(config: DetectorConfig, lines: L, link: T) -> Self {
        Self {
            lines,
            link,
            detector: Detector::new(config),
            telemetry: Telemetry::new(config.busy_policy),
            strobe: false,
            heartbeat: false,
            late_samples: 0,
        }
    }

    /// Bring the outputs to a known state and announce the start.
    ///
    /// Call once, before the sampler interrupt is enabled.
    pub fn start(&mut self) -> Result<(), L::Error> {
        self.detector.drive_idle(&mut self.lines)?;
        self.lines.write(OutputLine::Heartbeat, false)?;
        self.lines.write(OutputLine::DebugStrobe, false)?;
        if self.detector.config().telemetry {
            self.telemetry
                .emit(&mut self.link, DiagnosticEvent::start())
                .ok();
        }
        Ok(())
    }

    /// Sampler-complete handler.
    pub fn on_sample_ready(&mut self, sample: u16) -> Result<Cycle, L::Error> {
        let cycle = self.detector.on_sample(sample, &mut self.lines)?;
        if let Some(event) = cycle.event {
            // link faults are counted in the telemetry stats
            self.telemetry.emit(&mut self.link, event).ok();
        }
        self.strobe = !self.strobe;
        self.lines.write(OutputLine::DebugStrobe, self.strobe)?;
        Ok(cycle)
    }

    /// Transmit-byte-ready handler.
    pub fn on_transmit_byte_ready(&mut self) -> Result<(), T::Error> {
        self.telemetry.on_transmit_byte_ready(&mut self.link)
    }

    /// One pass of the outer loop: toggle the heartbeat.
    pub fn on_idle(&mut self) -> Result<(), L::Error> {
        self.heartbeat = !self.heartbeat;
        self.lines.write(OutputLine::Heartbeat, self.heartbeat)
    }

    /// The sample handler missed its deadline.
    pub fn note_late_sample(&mut self) {
        self.late_samples = self.late_samples.saturating_add(1);
    }

    pub fn hazards(&self) -> HazardCounters {
        HazardCounters {
            telemetry: self.telemetry.stats(),
            late_samples: self.late_samples,
        }
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn telemetry(&self) -> &Telemetry<DEPTH> {
        &self.telemetry
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn link(&self) -> &T {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut T {
        &mut self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeLines, FakeLink};

    type TestDispatcher = Dispatcher<FakeLines, FakeLink, 4>;

    #[test]
    fn start_idles_outputs_and_sends_start_word() {
        let mut lines = FakeLines::new();
        lines.set_initial(OutputLine::Result, true);
        let mut dispatcher = TestDispatcher::new(DetectorConfig::ENABLE_GATED, lines, FakeLink::new());
        dispatcher.start().unwrap();

        assert!(!dispatcher.lines().level(OutputLine::Result));
        assert_eq!(dispatcher.link().bytes(), &[0xFF]);
        assert!(dispatcher.telemetry().is_busy());
    }

    #[test]
    fn start_is_silent_without_telemetry() {
        let cfg = DetectorConfig::ENABLE_GATED.with_telemetry(false);
        let mut dispatcher = TestDispatcher::new(cfg, FakeLines::new(), FakeLink::new());
        dispatcher.start().unwrap();
        assert!(dispatcher.link().bytes().is_empty());
    }

    #[test]
    fn debug_strobe_toggles_every_sample() {
        let mut dispatcher = TestDispatcher::new(DetectorConfig::ENABLE_GATED, FakeLines::new(), FakeLink::new());
        dispatcher.on_sample_ready(1).unwrap();
        assert!(dispatcher.lines().level(OutputLine::DebugStrobe));
        dispatcher.on_sample_ready(1).unwrap();
        assert!(!dispatcher.lines().level(OutputLine::DebugStrobe));
    }

    #[test]
    fn heartbeat_toggles_every_idle_pass() {
        let mut dispatcher = TestDispatcher::new(DetectorConfig::ENABLE_GATED, FakeLines::new(), FakeLink::new());
        for expected in [true, false, true] {
            dispatcher.on_idle().unwrap();
            assert_eq!(dispatcher.lines().level(OutputLine::Heartbeat), expected);
        }
    }

    #[test]
    fn hold_event_reaches_the_link() {
        let mut dispatcher = TestDispatcher::new(DetectorConfig::ENABLE_GATED, FakeLines::new(), FakeLink::new());
        dispatcher.lines_mut().set_hold(true);
        dispatcher.on_sample_ready(300).unwrap();
        assert_eq!(dispatcher.link().bytes(), &[0x2C]);
        for _ in 0..4 {
            dispatcher.link_mut().finish_byte();
            dispatcher.on_transmit_byte_ready().unwrap();
        }
        assert_eq!(dispatcher.link().words().as_slice(), &[0x0100_012C]);
        assert_eq!(dispatcher.hazards().telemetry.words_sent, 1);
    }

    #[test]
    fn late_samples_are_counted_without_touching_the_detector() {
        let mut dispatcher = TestDispatcher::new(DetectorConfig::ENABLE_GATED, FakeLines::new(), FakeLink::new());
        dispatcher.note_late_sample();
        dispatcher.note_late_sample();
        assert_eq!(dispatcher.hazards().late_samples, 2);
        assert!(!dispatcher.detector().hold_state().is_holding());
    }
}
