//! SPI master used as the telemetry byte link

use avr_device::atmega128a::{PORTB, SPI};
use core::convert::Infallible;

use crate::config::TelemetryLinkConfig;
use crate::telemetry::ByteLink;

// PB0 = SS, PB1 = SCK, PB2 = MOSI
const SPI_OUTPUTS: u8 = 0x07;

/// Interrupt-driven SPI transmitter.
///
/// `send` writes SPDR and marks the link busy; the SPI_STC handler calls
/// [`SpiLink::transfer_complete`] before asking telemetry for the next byte.
pub struct SpiLink {
    spi: SPI,
    busy: bool,
}

impl SpiLink {
    pub fn new(spi: SPI, portb: &PORTB, config: &TelemetryLinkConfig) -> Self {
        // SS must be an output or a low level on it drops us out of master mode
        portb.ddrb.modify(|r, w| unsafe { w.bits(r.bits() | SPI_OUTPUTS) });
        spi.spcr.write(|w| unsafe { w.bits(config.spcr_bits()) });
        Self { spi, busy: false }
    }

    #[inline]
    pub fn transfer_complete(&mut self) {
        // reading SPSR then SPDR clears SPIF and WCOL
        let _ = self.spi.spsr.read().bits();
        let _ = self.spi.spdr.read().bits();
        self.busy = false;
    }
}

impl ByteLink for SpiLink {
    type Error = Infallible;

    fn send(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if self.busy {
            return Err(nb::Error::WouldBlock);
        }
        self.spi.spdr.write(|w| unsafe { w.bits(byte) });
        self.busy = true;
        Ok(())
    }
}
