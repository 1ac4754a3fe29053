#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;
    use avr_device::atmega128a::{Peripherals, PORTA, PORTC};
    use avr_device::interrupt::{self, Mutex};
    use core::cell::RefCell;

    use atmega128_ook_detector::config::{self, TELEMETRY_BACKLOG};
    use atmega128_ook_detector::dispatch::{Dispatcher, HazardCounters};
    use atmega128_ook_detector::drivers::SerialConsole;
    use atmega128_ook_detector::hal::{self, Adc, Input, Output, Pin, Pins, SpiLink, Usart0, Watchdog};
    use atmega128_ook_detector::lines::PinLines;
    #[cfg(feature = "fail-safe-mark")]
    use atmega128_ook_detector::lines::Unwired;

    type HoldPin = Pin<PORTC, 3, Input>;
    #[cfg(not(feature = "fail-safe-mark"))]
    type EnablePin = Pin<PORTC, 4, Input>;
    #[cfg(feature = "fail-safe-mark")]
    type EnablePin = Unwired;
    type ResultPin = Pin<PORTC, 2, Output>;
    type HeartbeatPin = Pin<PORTA, 7, Output>;
    type StrobePin = Pin<PORTA, 6, Output>;

    type BoardLines = PinLines<HoldPin, EnablePin, ResultPin, HeartbeatPin, StrobePin>;
    type Firmware = Dispatcher<BoardLines, SpiLink, TELEMETRY_BACKLOG>;

    // Shared between the ADC and SPI_STC handlers and the idle loop
    static FIRMWARE: Mutex<RefCell<Option<Firmware>>> = Mutex::new(RefCell::new(None));

    #[avr_device::entry]
    fn main() -> ! {
        let dp = Peripherals::take().unwrap();

        Watchdog::new(dp.WDT).disable();
        hal::full_speed(&dp.CPU);

        let pins = Pins::new(dp.PORTA, dp.PORTC);
        let lines = board_lines(pins);
        let link = SpiLink::new(dp.SPI, &dp.PORTB, &config::TELEMETRY_LINK);
        let mut console = SerialConsole::new(Usart0::new(dp.USART0, config::UART_BAUD));

        console.write_line("ATmega128 OOK detector v0.1.0").ok();
        console.debug("detector", &config::FIRMWARE).ok();
        console.debug("sampler", &config::SAMPLER).ok();
        console
            .debug("cadence_hz", &config::SAMPLER.cadence_hz(config::CPU_FREQ_HZ))
            .ok();

        let mut firmware: Firmware = Dispatcher::new(config::FIRMWARE, lines, link);
        firmware.start().ok();
        interrupt::free(|cs| {
            FIRMWARE.borrow(cs).replace(Some(firmware));
        });

        // Conversions start now; the first result is handled once interrupts are on
        let _adc = Adc::new(dp.ADC, &config::SAMPLER);

        // Enable interrupts globally
        unsafe { avr_device::interrupt::enable() };

        console.write_line("Ready...").ok();

        let mut reported = HazardCounters::default();
        let mut idle_counter = 0u16;

        loop {
            let hazards = interrupt::free(|cs| {
                FIRMWARE.borrow(cs).borrow_mut().as_mut().map(|fw| {
                    fw.on_idle().ok();
                    fw.hazards()
                })
            });

            idle_counter = idle_counter.wrapping_add(1);
            if idle_counter % config::HAZARD_REPORT_INTERVAL != 0 {
                continue;
            }
            if let Some(hazards) = hazards {
                if hazards != reported {
                    console.debug("hazards", &hazards).ok();
                    reported = hazards;
                }
            }
        }
    }

    #[cfg(not(feature = "fail-safe-mark"))]
    fn board_lines(pins: Pins) -> BoardLines {
        PinLines::new(
            pins.pc3.into_input(),
            pins.pc4.into_input(),
            pins.pc2.into_output(),
            pins.pa7.into_output(),
            pins.pa6.into_output(),
        )
    }

    #[cfg(feature = "fail-safe-mark")]
    fn board_lines(pins: Pins) -> BoardLines {
        PinLines::without_enable(
            pins.pc3.into_input(),
            pins.pc2.into_output(),
            pins.pa7.into_output(),
            pins.pa6.into_output(),
        )
    }

    #[avr_device::interrupt(atmega128a)]
    fn ADC() {
        interrupt::free(|cs| {
            let sample = Adc::result();
            if let Some(fw) = FIRMWARE.borrow(cs).borrow_mut().as_mut() {
                fw.on_sample_ready(sample).ok();
                if Adc::conversion_pending() {
                    fw.note_late_sample();
                }
            }
        });
    }

    #[avr_device::interrupt(atmega128a)]
    fn SPI_STC() {
        interrupt::free(|cs| {
            if let Some(fw) = FIRMWARE.borrow(cs).borrow_mut().as_mut() {
                fw.link_mut().transfer_complete();
                fw.on_transmit_byte_ready().ok();
            }
        });
    }
}

/// The firmware only exists for AVR targets; host builds run the library tests.
#[cfg(not(target_arch = "avr"))]
fn main() {}
