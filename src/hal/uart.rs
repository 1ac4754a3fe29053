use avr_device::atmega128a::USART0;
use core::convert::Infallible;
use embedded_hal::serial;

use crate::config::CPU_FREQ_HZ;

const UDRE: u8 = 0x20;
const TXC: u8 = 0x40;
const TXEN: u8 = 0x08;
// 8N1
const UCSZ_8BIT: u8 = 0x06;

/// Polled console transmitter on USART0.
pub struct Usart0 {
    usart: USART0,
}

impl Usart0 {
    pub fn new(usart: USART0, baud: u32) -> Self {
        // (16_000_000 / (16 * 9600)) - 1 = 103
        let ubrr = (CPU_FREQ_HZ / (16 * baud) - 1) as u16;
        usart.ubrr0h.write(|w| unsafe { w.bits((ubrr >> 8) as u8) });
        usart.ubrr0l.write(|w| unsafe { w.bits(ubrr as u8) });
        usart.ucsr0c.write(|w| unsafe { w.bits(UCSZ_8BIT) });
        usart.ucsr0b.write(|w| unsafe { w.bits(TXEN) });
        Self { usart }
    }
}

impl serial::Write<u8> for Usart0 {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if self.usart.ucsr0a.read().bits() & UDRE == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.usart.udr0.write(|w| unsafe { w.bits(byte) });
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        if self.usart.ucsr0a.read().bits() & TXC == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }
}
