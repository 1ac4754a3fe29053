//! Byte-wide transmit side of the telemetry link

use embedded_hal::serial;

/// Accepts one byte at a time without blocking.
///
/// `WouldBlock` means the previous byte is still being shifted out.
pub trait ByteLink {
    type Error;

    fn send(&mut self, byte: u8) -> nb::Result<(), Self::Error>;
}

/// Runs telemetry over any `embedded-hal` serial writer.
pub struct SerialLink<W>(pub W);

impl<W: serial::Write<u8>> ByteLink for SerialLink<W> {
    type Error = W::Error;

    fn send(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        self.0.write(byte)
    }
}
