//! ATmega128 register-level HAL for the detector board

pub mod adc;
pub mod gpio;
pub mod spi;
pub mod uart;
pub mod watchdog;

pub use adc::Adc;
pub use gpio::{Input, Output, Pin, Pins};
pub use spi::SpiLink;
pub use uart::Usart0;
pub use watchdog::Watchdog;

use avr_device::atmega128a::CPU;

/// Run the core straight off the oscillator (XDIV divider off).
#[inline]
pub fn full_speed(cpu: &CPU) {
    cpu.xdiv.write(|w| unsafe { w.bits(0x00) });
}
