//! Error types for the detector
//!
//! Nothing here allocates. On the AVR board every pin and link error type is
//! `Infallible`, so these only carry information on host benches and mocks.

use core::fmt;

use crate::lines::InputLine;

/// Errors surfaced by the sample and transmit handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<E> {
    /// A GPIO line read or write failed
    Pin(E),
    /// The telemetry byte link rejected a byte
    Link(E),
    /// The active policy needs a line the board does not wire
    UnboundLine(InputLine),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin(e) => write!(f, "GPIO line error: {e:?}"),
            Self::Link(e) => write!(f, "telemetry link error: {e:?}"),
            Self::UnboundLine(line) => write!(f, "{line:?} is not wired on this board"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Pin(e) => defmt::write!(f, "GPIO line error: {}", e),
            Self::Link(e) => defmt::write!(f, "telemetry link error: {}", e),
            Self::UnboundLine(line) => defmt::write!(f, "{} is not wired on this board", line),
        }
    }
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_part() {
        let pin: Error<&str> = Error::Pin("stuck");
        assert_eq!(pin.to_string(), "GPIO line error: \"stuck\"");
        let unbound: Error<()> = Error::UnboundLine(InputLine::EnableGate);
        assert_eq!(unbound.to_string(), "EnableGate is not wired on this board");
    }
}
