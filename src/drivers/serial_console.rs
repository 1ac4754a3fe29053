use embedded_hal::serial;
use ufmt::{uDebug, uWrite};

/// Line-oriented console on top of any blocking-capable serial writer.
pub struct SerialConsole<W> {
    uart: W,
}

impl<W: serial::Write<u8>> SerialConsole<W> {
    pub fn new(uart: W) -> Self {
        Self { uart }
    }

    pub fn release(self) -> W {
        self.uart
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), W::Error> {
        nb::block!(self.uart.write(byte))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), W::Error> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    pub fn write_line(&mut self, s: &str) -> Result<(), W::Error> {
        self.write_bytes(s.as_bytes())?;
        self.write_bytes(b"\r\n")
    }

    // Print formatted debug info
    pub fn debug<T: uDebug + ?Sized>(&mut self, msg: &str, val: &T) -> Result<(), W::Error> {
        ufmt::uwriteln!(self, "[DBG] {}: {:?}\r", msg, val)
    }
}

impl<W: serial::Write<u8>> uWrite for SerialConsole<W> {
    type Error = W::Error;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        self.write_bytes(s.as_bytes())
    }
}
