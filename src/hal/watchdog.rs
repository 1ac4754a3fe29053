use avr_device::atmega128a::WDT;

// WDCE | WDE
const CHANGE_ENABLE: u8 = 0x18;

/// The detector runs with the watchdog off; a hung handler needs a power cycle.
pub struct Watchdog {
    wdt: WDT,
}

impl Watchdog {
    #[inline]
    pub fn new(wdt: WDT) -> Self {
        Self { wdt }
    }

    #[inline]
    pub fn disable(&mut self) {
        // Timed sequence: WDCE|WDE, then clear within four cycles
        self.wdt.wdtcr.write(|w| unsafe { w.bits(CHANGE_ENABLE) });
        self.wdt.wdtcr.write(|w| unsafe { w.bits(0x00) });
    }
}
