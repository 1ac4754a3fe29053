//! Named boolean lines between the detector and the board
//!
//! The detector never touches a port register. It reads and writes the lines
//! below through [`LinePort`]; [`PinLines`] binds that to any set of
//! `embedded-hal` digital pins, and `testing::FakeLines` binds it to memory.

use core::convert::Infallible;
use core::marker::PhantomData;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use ufmt::derive::uDebug;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputLine {
    HoldGate,
    EnableGate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputLine {
    Result,
    Heartbeat,
    DebugStrobe,
}

/// Read/write access to the detector's lines.
pub trait LinePort {
    type Error;

    fn read(&mut self, line: InputLine) -> Result<bool, Self::Error>;

    fn write(&mut self, line: OutputLine, level: bool) -> Result<(), Self::Error>;
}

/// Placeholder for an input the board leaves unconnected.
///
/// Reading the matching [`InputLine`] through [`PinLines`] yields
/// [`Error::UnboundLine`]; the pin itself is never sampled.
pub struct Unwired<E = Infallible> {
    _error: PhantomData<E>,
}

impl<E> Unwired<E> {
    pub const fn new() -> Self {
        Self { _error: PhantomData }
    }
}

impl<E> Default for Unwired<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InputPin for Unwired<E> {
    type Error = E;

    fn is_high(&self) -> core::result::Result<bool, E> {
        Ok(false)
    }

    fn is_low(&self) -> core::result::Result<bool, E> {
        Ok(true)
    }
}

/// [`LinePort`] over `embedded-hal` pins sharing one error type.
pub struct PinLines<HOLD, EN, RES, HB, DBG> {
    hold: HOLD,
    enable: Option<EN>,
    result: RES,
    heartbeat: HB,
    strobe: DBG,
}

impl<HOLD, EN, RES, HB, DBG> PinLines<HOLD, EN, RES, HB, DBG> {
    pub fn new(hold: HOLD, enable: EN, result: RES, heartbeat: HB, strobe: DBG) -> Self {
        Self {
            hold,
            enable: Some(enable),
            result,
            heartbeat,
            strobe,
        }
    }

    /// Give the pins back, e.g. to check mock expectations.
    pub fn release(self) -> (HOLD, Option<EN>, RES, HB, DBG) {
        (self.hold, self.enable, self.result, self.heartbeat, self.strobe)
    }
}

impl<HOLD: InputPin, RES, HB, DBG> PinLines<HOLD, Unwired<HOLD::Error>, RES, HB, DBG> {
    /// Board variant without an enable-gate input.
    pub fn without_enable(hold: HOLD, result: RES, heartbeat: HB, strobe: DBG) -> Self {
        Self {
            hold,
            enable: None,
            result,
            heartbeat,
            strobe,
        }
    }
}

impl<HOLD, EN, RES, HB, DBG> LinePort for PinLines<HOLD, EN, RES, HB, DBG>
where
    HOLD: InputPin,
    EN: InputPin<Error = HOLD::Error>,
    RES: OutputPin<Error = HOLD::Error>,
    HB: OutputPin<Error = HOLD::Error>,
    DBG: OutputPin<Error = HOLD::Error>,
{
    type Error = HOLD::Error;

    fn read(&mut self, line: InputLine) -> Result<bool, Self::Error> {
        match line {
            InputLine::HoldGate => self.hold.is_high().map_err(Error::Pin),
            InputLine::EnableGate => match &self.enable {
                Some(pin) => pin.is_high().map_err(Error::Pin),
                None => Err(Error::UnboundLine(line)),
            },
        }
    }

    fn write(&mut self, line: OutputLine, level: bool) -> Result<(), Self::Error> {
        let res = match line {
            OutputLine::Result => set_level(&mut self.result, level),
            OutputLine::Heartbeat => set_level(&mut self.heartbeat, level),
            OutputLine::DebugStrobe => set_level(&mut self.strobe, level),
        };
        res.map_err(Error::Pin)
    }
}

fn set_level<P: OutputPin>(pin: &mut P, level: bool) -> core::result::Result<(), P::Error> {
    if level {
        pin.set_high()
    } else {
        pin.set_low()
    }
}
