//! Sample-and-hold threshold detector
//!
//! One call to [`Detector::on_sample`] per finished conversion. It runs to
//! completion without blocking and must fit inside one sampler period.

pub mod comparator;
pub mod hold;
pub mod output;

pub use comparator::{classify, Keying};
pub use hold::{HoldState, HoldTransition};
pub use output::ResultDriver;

use crate::config::{DetectorConfig, Gating};
use crate::error::Result;
use crate::lines::{InputLine, LinePort, OutputLine};
use crate::telemetry::DiagnosticEvent;

/// Everything one sample did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cycle {
    pub transition: HoldTransition,
    /// Classification against the reference; `None` while not holding
    pub keying: Option<Keying>,
    /// Level written to the result line, if any
    pub level: Option<bool>,
    pub event: Option<DiagnosticEvent>,
}

pub struct Detector {
    config: DetectorConfig,
    hold: HoldState,
    driver: ResultDriver,
    last_keying: Option<Keying>,
}

impl Detector {
    pub const fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            hold: HoldState::new(),
            driver: ResultDriver::new(config.idle_level),
            last_keying: None,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn hold_state(&self) -> &HoldState {
        &self.hold
    }

    /// Level last committed to the result line. Reading it changes nothing.
    pub fn result_level(&self) -> bool {
        self.driver.level()
    }

    /// Put the result line at its idle level before the sampler starts.
    pub fn drive_idle<L: LinePort>(&mut self, lines: &mut L) -> Result<(), L::Error> {
        lines.write(OutputLine::Result, self.config.idle_level)?;
        self.driver.commit(self.config.idle_level);
        Ok(())
    }

    pub fn on_sample<L: LinePort>(&mut self, sample: u16, lines: &mut L) -> Result<Cycle, L::Error> {
        let hold_gate = lines.read(InputLine::HoldGate)?;
        // holding after this sample iff the gate is high; read every input
        // before the hold state moves
        let active = match (hold_gate, self.config.gating) {
            (false, _) => false,
            (true, Gating::Ungated) => true,
            (true, Gating::EnableGated) => lines.read(InputLine::EnableGate)?,
        };
        let transition = self.hold.update(hold_gate, sample);

        let keying = self
            .hold
            .reference()
            .map(|reference| classify(sample, reference, self.config.threshold));

        let level = self
            .driver
            .next_level(&self.config, keying.filter(|_| active));
        if let Some(level) = level {
            lines.write(OutputLine::Result, level)?;
            self.driver.commit(level);
        }

        let event = self.event_for(transition, keying, sample);
        self.last_keying = keying;

        Ok(Cycle {
            transition,
            keying,
            level,
            event,
        })
    }

    fn event_for(
        &self,
        transition: HoldTransition,
        keying: Option<Keying>,
        sample: u16,
    ) -> Option<DiagnosticEvent> {
        if !self.config.telemetry {
            return None;
        }
        match transition {
            HoldTransition::Acquired(reference) => Some(DiagnosticEvent::hold(reference)),
            HoldTransition::Released => Some(DiagnosticEvent::sample()),
            HoldTransition::Holding
                if self.config.slope_events
                    && keying == Some(Keying::Space)
                    && self.last_keying != Some(Keying::Space) =>
            {
                Some(DiagnosticEvent::slope(sample))
            }
            HoldTransition::Holding | HoldTransition::Idle => None,
        }
    }
}
