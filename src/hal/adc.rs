use avr_device::atmega128a::ADC;

use crate::config::SamplerConfig;

const ADIF: u8 = 0x10;

/// Free-running converter that raises the ADC vector on every result.
pub struct Adc {
    adc: ADC,
}

impl Adc {
    /// Program reference, channel and clock, then start converting.
    pub fn new(adc: ADC, config: &SamplerConfig) -> Self {
        adc.admux.write(|w| unsafe { w.bits(config.admux_bits()) });
        adc.adcsra.write(|w| unsafe { w.bits(config.adcsra_bits()) });
        Self { adc }
    }

    /// Latest conversion result. ADCL is read before ADCH by the 16-bit access.
    #[inline]
    pub fn result() -> u16 {
        unsafe { (*ADC::ptr()).adc.read().bits() }
    }

    /// Another conversion completed while the last one was being handled.
    #[inline]
    pub fn conversion_pending() -> bool {
        unsafe { (*ADC::ptr()).adcsra.read().bits() & ADIF != 0 }
    }

    pub fn release(self) -> ADC {
        self.adc
    }
}
