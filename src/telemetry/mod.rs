//! Diagnostic telemetry over a byte-wide synchronous link
//!
//! Each event is one 32-bit word: event code in the top byte, 24-bit payload
//! below it. Words go out low byte first. The first byte is written from the
//! caller's context; the other three are written one per transmit-complete
//! interrupt through [`Telemetry::on_transmit_byte_ready`].
//!
//! The sample handler and the transmit handler both touch the in-flight word.
//! [`BusyPolicy`] decides what an `emit` during a transmission does, and every
//! word that does not make it out intact is counted in [`TelemetryStats`].

mod link;

pub use link::{ByteLink, SerialLink};

use heapless::Deque;
use ufmt::derive::uDebug;

use crate::config::BusyPolicy;
use crate::error::{Error, Result};

const PAYLOAD_MASK: u32 = 0x00FF_FFFF;
const WORD_BYTES: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EventCode {
    Start = 0xFF,
    Hold = 0x01,
    Sample = 0x02,
    Slope = 0x04,
}

impl EventCode {
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0xFF => Some(Self::Start),
            0x01 => Some(Self::Hold),
            0x02 => Some(Self::Sample),
            0x04 => Some(Self::Slope),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiagnosticEvent {
    code: EventCode,
    payload: u32,
}

impl DiagnosticEvent {
    /// Firmware came up. Encodes as the all-ones word.
    pub const fn start() -> Self {
        Self::new(EventCode::Start, PAYLOAD_MASK)
    }

    /// A reference was captured.
    pub const fn hold(reference: u16) -> Self {
        Self::new(EventCode::Hold, reference as u32)
    }

    /// The hold was released.
    pub const fn sample() -> Self {
        Self::new(EventCode::Sample, 0)
    }

    /// The sample crossed reference + threshold.
    pub const fn slope(value: u16) -> Self {
        Self::new(EventCode::Slope, value as u32)
    }

    pub const fn new(code: EventCode, payload: u32) -> Self {
        Self {
            code,
            payload: payload & PAYLOAD_MASK,
        }
    }

    pub const fn code(&self) -> EventCode {
        self.code
    }

    pub const fn payload(&self) -> u32 {
        self.payload
    }

    pub const fn word(&self) -> u32 {
        ((self.code as u32) << 24) | self.payload
    }

    pub const fn from_word(word: u32) -> Option<Self> {
        match EventCode::from_bits((word >> 24) as u8) {
            Some(code) => Some(Self::new(code, word)),
            None => None,
        }
    }
}

/// What `emit` did with a word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmitOutcome {
    /// Link was idle; the first byte is on the wire
    Started,
    /// Parked behind the in-flight word
    Queued,
    /// Discarded; the in-flight word is untouched
    Dropped,
    /// Replaced the in-flight word mid-transmission
    Overwrote,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryStats {
    pub words_sent: u16,
    pub words_dropped: u16,
    pub words_overwritten: u16,
    /// Byte writes refused because the shift register was still busy
    pub link_busy: u16,
    pub link_faults: u16,
}

pub struct Telemetry<const DEPTH: usize> {
    policy: BusyPolicy,
    word: u32,
    sent: u8,
    active: bool,
    backlog: Deque<u32, DEPTH>,
    stats: TelemetryStats,
}

impl<const DEPTH: usize> Telemetry<DEPTH> {
    pub const fn new(policy: BusyPolicy) -> Self {
        Self {
            policy,
            word: 0,
            sent: 0,
            active: false,
            backlog: Deque::new(),
            stats: TelemetryStats {
                words_sent: 0,
                words_dropped: 0,
                words_overwritten: 0,
                link_busy: 0,
                link_faults: 0,
            },
        }
    }

    /// A word is being shifted out.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.active
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn stats(&self) -> TelemetryStats {
        self.stats
    }

    pub fn emit<T: ByteLink>(&mut self, link: &mut T, event: DiagnosticEvent) -> Result<EmitOutcome, T::Error> {
        let word = event.word();
        if !self.active {
            self.begin(link, word)?;
            return Ok(EmitOutcome::Started);
        }

        match self.policy {
            BusyPolicy::Queue => match self.backlog.push_back(word) {
                Ok(()) => Ok(EmitOutcome::Queued),
                Err(_) => {
                    self.stats.words_dropped = self.stats.words_dropped.saturating_add(1);
                    Ok(EmitOutcome::Dropped)
                }
            },
            BusyPolicy::DropNewest => {
                self.stats.words_dropped = self.stats.words_dropped.saturating_add(1);
                Ok(EmitOutcome::Dropped)
            }
            BusyPolicy::Overwrite => {
                self.stats.words_overwritten = self.stats.words_overwritten.saturating_add(1);
                self.begin(link, word)?;
                Ok(EmitOutcome::Overwrote)
            }
        }
    }

    /// Transmit-complete handler: push the next byte, or finish the word and
    /// start the next queued one.
    pub fn on_transmit_byte_ready<T: ByteLink>(&mut self, link: &mut T) -> Result<(), T::Error> {
        if !self.active {
            return Ok(());
        }
        if self.sent < WORD_BYTES {
            return self.send_next(link);
        }

        self.active = false;
        self.stats.words_sent = self.stats.words_sent.saturating_add(1);
        match self.backlog.pop_front() {
            Some(word) => self.begin(link, word),
            None => Ok(()),
        }
    }

    fn begin<T: ByteLink>(&mut self, link: &mut T, word: u32) -> Result<(), T::Error> {
        self.word = word;
        self.sent = 0;
        self.active = true;
        self.send_next(link)
    }

    fn send_next<T: ByteLink>(&mut self, link: &mut T) -> Result<(), T::Error> {
        let byte = (self.word >> (8 * u32::from(self.sent))) as u8;
        match link.send(byte) {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(nb::Error::WouldBlock) => {
                self.stats.link_busy = self.stats.link_busy.saturating_add(1);
                Ok(())
            }
            Err(nb::Error::Other(e)) => {
                self.stats.link_faults = self.stats.link_faults.saturating_add(1);
                self.active = false;
                // no transmit-complete interrupt follows a fault, so nothing
                // would ever pop the backlog
                let stranded = self.backlog.len() as u16;
                self.backlog.clear();
                self.stats.words_dropped = self.stats.words_dropped.saturating_add(stranded);
                Err(Error::Link(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLink;

    fn pump<const N: usize>(telemetry: &mut Telemetry<N>, link: &mut FakeLink) {
        while link.is_shifting() {
            link.finish_byte();
            telemetry.on_transmit_byte_ready(link).unwrap();
        }
    }

    #[test]
    fn word_layout() {
        assert_eq!(DiagnosticEvent::start().word(), 0xFFFF_FFFF);
        assert_eq!(DiagnosticEvent::hold(300).word(), 0x0100_012C);
        assert_eq!(DiagnosticEvent::sample().word(), 0x0200_0000);
        assert_eq!(DiagnosticEvent::slope(0x3FF).word(), 0x0400_03FF);
        assert_eq!(DiagnosticEvent::new(EventCode::Hold, 0xAB12_3456).payload(), 0x12_3456);
    }

    #[test]
    fn from_word_rejects_unknown_codes() {
        assert_eq!(
            DiagnosticEvent::from_word(0x0100_012C),
            Some(DiagnosticEvent::hold(300))
        );
        assert_eq!(DiagnosticEvent::from_word(0x0300_0000), None);
    }

    #[test]
    fn first_byte_synchronous_rest_one_per_interrupt() {
        let mut telemetry: Telemetry<2> = Telemetry::new(BusyPolicy::Queue);
        let mut link = FakeLink::new();

        let outcome = telemetry.emit(&mut link, DiagnosticEvent::hold(300)).unwrap();
        assert_eq!(outcome, EmitOutcome::Started);
        assert_eq!(link.bytes(), &[0x2C]);

        let steps: [&[u8]; 3] = [&[0x2C, 0x01], &[0x2C, 0x01, 0x00], &[0x2C, 0x01, 0x00, 0x01]];
        for expected in steps {
            link.finish_byte();
            telemetry.on_transmit_byte_ready(&mut link).unwrap();
            assert_eq!(link.bytes(), expected);
            assert!(telemetry.is_busy());
        }

        link.finish_byte();
        telemetry.on_transmit_byte_ready(&mut link).unwrap();
        assert!(!telemetry.is_busy());
        assert_eq!(telemetry.stats().words_sent, 1);

        // a stray interrupt after the word is done sends nothing
        telemetry.on_transmit_byte_ready(&mut link).unwrap();
        assert_eq!(link.bytes().len(), 4);
    }

    #[test]
    fn queue_keeps_words_whole_and_in_order() {
        let mut telemetry: Telemetry<2> = Telemetry::new(BusyPolicy::Queue);
        let mut link = FakeLink::new();
        telemetry.emit(&mut link, DiagnosticEvent::hold(300)).unwrap();
        assert_eq!(
            telemetry.emit(&mut link, DiagnosticEvent::sample()).unwrap(),
            EmitOutcome::Queued
        );
        assert_eq!(telemetry.backlog_len(), 1);
        pump(&mut telemetry, &mut link);

        assert_eq!(link.words().as_slice(), &[0x0100_012C, 0x0200_0000]);
        assert_eq!(telemetry.stats().words_sent, 2);
        assert_eq!(telemetry.stats().words_dropped, 0);
    }

    #[test]
    fn full_backlog_drops_newest() {
        let mut telemetry: Telemetry<1> = Telemetry::new(BusyPolicy::Queue);
        let mut link = FakeLink::new();
        telemetry.emit(&mut link, DiagnosticEvent::hold(1)).unwrap();
        telemetry.emit(&mut link, DiagnosticEvent::hold(2)).unwrap();
        assert_eq!(
            telemetry.emit(&mut link, DiagnosticEvent::hold(3)).unwrap(),
            EmitOutcome::Dropped
        );
        pump(&mut telemetry, &mut link);
        assert_eq!(link.words().as_slice(), &[0x0100_0001, 0x0100_0002]);
        assert_eq!(telemetry.stats().words_dropped, 1);
    }

    #[test]
    fn drop_newest_never_touches_the_wire() {
        let mut telemetry: Telemetry<4> = Telemetry::new(BusyPolicy::DropNewest);
        let mut link = FakeLink::new();
        telemetry.emit(&mut link, DiagnosticEvent::hold(300)).unwrap();
        assert_eq!(
            telemetry.emit(&mut link, DiagnosticEvent::sample()).unwrap(),
            EmitOutcome::Dropped
        );
        assert_eq!(telemetry.backlog_len(), 0);
        pump(&mut telemetry, &mut link);
        assert_eq!(link.words().as_slice(), &[0x0100_012C]);
    }

    #[test]
    fn overwrite_corrupts_the_word_in_flight() {
        let mut telemetry: Telemetry<4> = Telemetry::new(BusyPolicy::Overwrite);
        let mut link = FakeLink::new();
        telemetry.emit(&mut link, DiagnosticEvent::hold(300)).unwrap();
        assert_eq!(
            telemetry.emit(&mut link, DiagnosticEvent::sample()).unwrap(),
            EmitOutcome::Overwrote
        );
        // the restarted first byte collided with the one still shifting
        assert_eq!(telemetry.stats().link_busy, 1);
        pump(&mut telemetry, &mut link);

        assert_eq!(link.bytes(), &[0x2C, 0x00, 0x00, 0x00, 0x02]);
        assert_eq!(telemetry.stats().words_overwritten, 1);
        assert_eq!(link.bytes().len() % 4, 1);
    }

    #[test]
    fn link_fault_is_reported_and_counted() {
        let mut telemetry: Telemetry<1> = Telemetry::new(BusyPolicy::Queue);
        let mut link = FakeLink::new();
        link.fail_next();
        let err = telemetry.emit(&mut link, DiagnosticEvent::start()).unwrap_err();
        assert!(matches!(err, Error::Link(_)));
        assert_eq!(telemetry.stats().link_faults, 1);
        assert!(!telemetry.is_busy());
    }

    #[test]
    fn link_fault_drops_the_backlog_instead_of_reordering_it() {
        let mut telemetry: Telemetry<4> = Telemetry::new(BusyPolicy::Queue);
        let mut link = FakeLink::new();
        telemetry.emit(&mut link, DiagnosticEvent::hold(1)).unwrap();
        telemetry.emit(&mut link, DiagnosticEvent::hold(2)).unwrap();
        assert_eq!(telemetry.backlog_len(), 1);

        link.finish_byte();
        link.fail_next();
        assert!(telemetry.on_transmit_byte_ready(&mut link).is_err());
        assert!(!telemetry.is_busy());
        assert_eq!(telemetry.backlog_len(), 0);
        assert_eq!(telemetry.stats().words_dropped, 1);

        assert_eq!(
            telemetry.emit(&mut link, DiagnosticEvent::hold(3)).unwrap(),
            EmitOutcome::Started
        );
        pump(&mut telemetry, &mut link);
        // the stranded hold(2) never reaches the wire after hold(3)
        assert_eq!(link.bytes(), &[0x01, 0x03, 0x00, 0x00, 0x01]);
        assert_eq!(telemetry.stats().words_sent, 1);
    }
}
