//! Host-side bench for the detector
//!
//! Stands in for the board: in-memory lines, a byte link that behaves like a
//! shift register, and a sampler model that notices when a conversion is
//! overwritten before the handler got to it.

use core::convert::Infallible;

use heapless::Vec;

use crate::config::{DetectorConfig, Gating, TELEMETRY_BACKLOG};
use crate::detector::Cycle;
use crate::dispatch::{Dispatcher, HazardCounters};
use crate::error::{Error, Result};
use crate::lines::{InputLine, LinePort, OutputLine};
use crate::telemetry::{ByteLink, DiagnosticEvent};

const LINK_CAPACITY: usize = 256;
const WORD_CAPACITY: usize = LINK_CAPACITY / 4;

#[derive(Debug, Default)]
pub struct FakeLines {
    hold: bool,
    enable: Option<bool>,
    result: bool,
    heartbeat: bool,
    strobe: bool,
    result_writes: usize,
    enable_reads: usize,
}

impl FakeLines {
    pub fn new() -> Self {
        Self {
            enable: Some(false),
            ..Self::default()
        }
    }

    /// Board without an enable-gate input.
    pub fn without_enable() -> Self {
        Self::default()
    }

    pub fn set_hold(&mut self, level: bool) {
        self.hold = level;
    }

    /// No effect on a board built with [`FakeLines::without_enable`].
    pub fn set_enable(&mut self, level: bool) {
        if let Some(enable) = self.enable.as_mut() {
            *enable = level;
        }
    }

    /// Preset an output without counting it as a write.
    pub fn set_initial(&mut self, line: OutputLine, level: bool) {
        *self.output_mut(line) = level;
    }

    pub fn level(&self, line: OutputLine) -> bool {
        match line {
            OutputLine::Result => self.result,
            OutputLine::Heartbeat => self.heartbeat,
            OutputLine::DebugStrobe => self.strobe,
        }
    }

    pub fn result_writes(&self) -> usize {
        self.result_writes
    }

    pub fn enable_reads(&self) -> usize {
        self.enable_reads
    }

    fn output_mut(&mut self, line: OutputLine) -> &mut bool {
        match line {
            OutputLine::Result => &mut self.result,
            OutputLine::Heartbeat => &mut self.heartbeat,
            OutputLine::DebugStrobe => &mut self.strobe,
        }
    }
}

impl LinePort for FakeLines {
    type Error = Infallible;

    fn read(&mut self, line: InputLine) -> Result<bool, Infallible> {
        match line {
            InputLine::HoldGate => Ok(self.hold),
            InputLine::EnableGate => {
                self.enable_reads += 1;
                self.enable.ok_or(Error::UnboundLine(line))
            }
        }
    }

    fn write(&mut self, line: OutputLine, level: bool) -> Result<(), Infallible> {
        if line == OutputLine::Result {
            self.result_writes += 1;
        }
        *self.output_mut(line) = level;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkFault {
    Rejected,
    Full,
}

/// Byte link modelled as a shift register: a byte written while the previous
/// one is still shifting is refused with `WouldBlock`.
#[derive(Debug, Default)]
pub struct FakeLink {
    bytes: Vec<u8, LINK_CAPACITY>,
    shifting: bool,
    fail_next: bool,
}

impl FakeLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shifting(&self) -> bool {
        self.shifting
    }

    /// The byte on the wire has been clocked out.
    pub fn finish_byte(&mut self) {
        self.shifting = false;
    }

    /// Refuse the next byte with a hard fault.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Received bytes reassembled as little-endian words; a trailing partial
    /// word is ignored.
    pub fn words(&self) -> Vec<u32, WORD_CAPACITY> {
        self.bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

impl ByteLink for FakeLink {
    type Error = LinkFault;

    fn send(&mut self, byte: u8) -> nb::Result<(), LinkFault> {
        if self.fail_next {
            self.fail_next = false;
            return Err(nb::Error::Other(LinkFault::Rejected));
        }
        if self.shifting {
            return Err(nb::Error::WouldBlock);
        }
        self.bytes
            .push(byte)
            .map_err(|_| nb::Error::Other(LinkFault::Full))?;
        self.shifting = true;
        Ok(())
    }
}

/// A dispatcher wired to fake lines and a fake link, plus a sampler model.
pub struct Bench {
    dispatcher: Dispatcher<FakeLines, FakeLink, TELEMETRY_BACKLOG>,
    pending: Option<u16>,
}

impl Bench {
    /// Lines are wired the way `config.gating` expects: no enable input for
    /// the ungated variant.
    pub fn new(config: DetectorConfig) -> Self {
        let lines = match config.gating {
            Gating::EnableGated => FakeLines::new(),
            Gating::Ungated => FakeLines::without_enable(),
        };
        Self {
            dispatcher: Dispatcher::new(config, lines, FakeLink::new()),
            pending: None,
        }
    }

    pub fn start(&mut self) {
        self.dispatcher.start().ok();
    }

    pub fn set_hold(&mut self, level: bool) {
        self.dispatcher.lines_mut().set_hold(level);
    }

    pub fn set_enable(&mut self, level: bool) {
        self.dispatcher.lines_mut().set_enable(level);
    }

    /// A conversion finished. If the previous one was never serviced the
    /// handler missed its deadline; the bench drops the older value and
    /// counts a late sample.
    pub fn post_sample(&mut self, value: u16) {
        if self.pending.replace(value).is_some() {
            self.dispatcher.note_late_sample();
        }
    }

    /// Run the sample handler on the pending conversion, if any.
    pub fn service(&mut self) -> Option<Cycle> {
        let value = self.pending.take()?;
        match self.dispatcher.on_sample_ready(value) {
            Ok(cycle) => Some(cycle),
            Err(e) => panic!("sample handler failed: {e}"),
        }
    }

    /// Post and immediately service one conversion.
    pub fn sample(&mut self, value: u16) -> Cycle {
        self.post_sample(value);
        match self.service() {
            Some(cycle) => cycle,
            None => unreachable!("a sample was just posted"),
        }
    }

    /// Clock out one byte and run the transmit handler. Returns `false` when
    /// the link was idle.
    pub fn clock_byte(&mut self) -> bool {
        if !self.dispatcher.link().is_shifting() {
            return false;
        }
        self.dispatcher.link_mut().finish_byte();
        self.dispatcher.on_transmit_byte_ready().ok();
        true
    }

    /// Clock bytes until the link goes quiet. Returns the number clocked.
    pub fn drain_telemetry(&mut self) -> usize {
        let mut clocked = 0;
        while self.clock_byte() {
            clocked += 1;
        }
        clocked
    }

    pub fn result(&self) -> bool {
        self.dispatcher.lines().level(OutputLine::Result)
    }

    pub fn lines(&self) -> &FakeLines {
        self.dispatcher.lines()
    }

    pub fn link(&self) -> &FakeLink {
        self.dispatcher.link()
    }

    /// Every complete word on the wire, decoded.
    pub fn events(&self) -> Vec<Option<DiagnosticEvent>, WORD_CAPACITY> {
        self.link()
            .words()
            .iter()
            .map(|&word| DiagnosticEvent::from_word(word))
            .collect()
    }

    pub fn hazards(&self) -> HazardCounters {
        self.dispatcher.hazards()
    }

    pub fn dispatcher(&self) -> &Dispatcher<FakeLines, FakeLink, TELEMETRY_BACKLOG> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<FakeLines, FakeLink, TELEMETRY_BACKLOG> {
        &mut self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_link_refuses_while_shifting() {
        let mut link = FakeLink::new();
        assert!(link.send(1).is_ok());
        assert!(matches!(link.send(2), Err(nb::Error::WouldBlock)));
        link.finish_byte();
        assert!(link.send(2).is_ok());
        assert_eq!(link.bytes(), &[1, 2]);
    }

    #[test]
    fn words_ignore_trailing_partial() {
        let mut link = FakeLink::new();
        for byte in [0x2C, 0x01, 0x00, 0x01, 0xAA] {
            link.send(byte).unwrap();
            link.finish_byte();
        }
        assert_eq!(link.words().as_slice(), &[0x0100_012C]);
    }

    #[test]
    fn unserviced_conversion_counts_as_late() {
        let mut bench = Bench::new(DetectorConfig::ENABLE_GATED);
        bench.post_sample(10);
        bench.post_sample(20);
        assert_eq!(bench.hazards().late_samples, 1);
        let cycle = bench.service().unwrap();
        assert_eq!(cycle.transition, crate::detector::HoldTransition::Idle);
        assert!(bench.service().is_none());
    }
}
