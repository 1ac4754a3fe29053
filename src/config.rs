//! Configuration constants for the ATmega128 mark/space detector
//!
//! Everything here is resolved at compile time. Cargo features pick the
//! detector preset that [`FIRMWARE`] resolves to.

use ufmt::derive::uDebug;

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// Console UART baud rate
pub const UART_BAUD: u32 = 9600;

/// ADC reference voltage in millivolts (internal 2.56V bandgap)
pub const ADC_VREF_MV: u16 = 2560;

/// ADC resolution in bits
pub const ADC_RESOLUTION_BITS: u8 = 10;

/// Sense resistor in the line loop, in milliohms
pub const SHUNT_MILLIOHM: u32 = 25_000;

/// Current swing between mark and space, in microamps
pub const SIGNAL_SWING_UA: u32 = 10_000;

/// Space/mark threshold in ADC counts for the reference deployment
pub const SPACE_MARK_THRESHOLD: u16 =
    threshold_counts(SHUNT_MILLIOHM, SIGNAL_SWING_UA, ADC_VREF_MV, ADC_RESOLUTION_BITS);

/// Telemetry words that can wait behind the one being shifted out
pub const TELEMETRY_BACKLOG: usize = 4;

/// Main-loop iterations between hazard summaries on the console
pub const HAZARD_REPORT_INTERVAL: u16 = 0x8000;

/// Convert a shunt voltage swing into ADC counts.
///
/// `shunt_milliohm * swing_microamp` is the swing in nanovolts; one LSB is
/// `vref / 2^bits`. Saturates at `u16::MAX`.
pub const fn threshold_counts(
    shunt_milliohm: u32,
    swing_microamp: u32,
    vref_millivolt: u16,
    resolution_bits: u8,
) -> u16 {
    if vref_millivolt == 0 {
        return u16::MAX;
    }
    let swing_nv = shunt_milliohm as u128 * swing_microamp as u128;
    let full_scale_nv = vref_millivolt as u128 * 1_000_000;
    let counts = (swing_nv << resolution_bits) / full_scale_nv;
    if counts > u16::MAX as u128 {
        u16::MAX
    } else {
        counts as u16
    }
}

/// Which result level a space (sample above reference + threshold) maps to
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Space drives the result line high, mark drives it low
    ExceedsHigh,
    /// Space drives the result line low, mark drives it high
    ExceedsLow,
}

/// Whether the result line also waits for the enable gate
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gating {
    /// Result follows the comparator only while enable-gate and hold are both asserted
    EnableGated,
    /// Result follows the comparator whenever hold is asserted; enable is never read
    Ungated,
}

/// What happens to the result line while the detector is inactive
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReleasePolicy {
    /// Drive the idle level in the same sample that went inactive
    DriveIdle,
    /// Leave the line alone; it keeps the last classification
    Retain,
}

/// What `emit` does while a telemetry word is still being shifted out
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusyPolicy {
    /// Park the word in the backlog; drop it when the backlog is full
    Queue,
    /// Drop the new word
    DropNewest,
    /// Replace the in-flight word mid-transmission
    Overwrite,
}

/// Detector behaviour
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectorConfig {
    pub threshold: u16,
    pub polarity: Polarity,
    pub gating: Gating,
    pub release: ReleasePolicy,
    pub idle_level: bool,
    pub telemetry: bool,
    pub slope_events: bool,
    pub busy_policy: BusyPolicy,
}

impl DetectorConfig {
    /// Enable-gated detector: result high on space, forced low otherwise.
    pub const ENABLE_GATED: Self = Self {
        threshold: SPACE_MARK_THRESHOLD,
        polarity: Polarity::ExceedsHigh,
        gating: Gating::EnableGated,
        release: ReleasePolicy::DriveIdle,
        idle_level: false,
        telemetry: true,
        slope_events: false,
        busy_policy: BusyPolicy::Queue,
    };

    /// Ungated detector that rests at the quiescent (high) line level when
    /// no hold is in progress.
    pub const FAIL_SAFE_MARK: Self = Self {
        threshold: SPACE_MARK_THRESHOLD,
        polarity: Polarity::ExceedsLow,
        gating: Gating::Ungated,
        release: ReleasePolicy::DriveIdle,
        idle_level: true,
        telemetry: true,
        slope_events: false,
        busy_policy: BusyPolicy::Queue,
    };

    pub const fn with_threshold(mut self, threshold: u16) -> Self {
        self.threshold = threshold;
        self
    }

    pub const fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub const fn with_gating(mut self, gating: Gating) -> Self {
        self.gating = gating;
        self
    }

    pub const fn with_release(mut self, release: ReleasePolicy) -> Self {
        self.release = release;
        self
    }

    pub const fn with_idle_level(mut self, idle_level: bool) -> Self {
        self.idle_level = idle_level;
        self
    }

    pub const fn with_telemetry(mut self, telemetry: bool) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub const fn with_slope_events(mut self, slope_events: bool) -> Self {
        self.slope_events = slope_events;
        self
    }

    pub const fn with_busy_policy(mut self, busy_policy: BusyPolicy) -> Self {
        self.busy_policy = busy_policy;
        self
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::ENABLE_GATED
    }
}

const fn firmware_preset() -> DetectorConfig {
    if cfg!(feature = "fail-safe-mark") {
        DetectorConfig::FAIL_SAFE_MARK
    } else {
        DetectorConfig::ENABLE_GATED
    }
}

const fn firmware_release() -> ReleasePolicy {
    if cfg!(feature = "legacy-retain") {
        ReleasePolicy::Retain
    } else {
        ReleasePolicy::DriveIdle
    }
}

/// Detector configuration the firmware image is built with
pub const FIRMWARE: DetectorConfig = firmware_preset()
    .with_release(firmware_release())
    .with_slope_events(cfg!(feature = "slope-events"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcChannel {
    Adc0 = 0,
    Adc1 = 1,
    Adc2 = 2,
    Adc3 = 3,
    Adc4 = 4,
    Adc5 = 5,
    Adc6 = 6,
    Adc7 = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcReference {
    Aref = 0,            // External AREF
    Avcc = 1,            // AVCC with external cap at AREF
    Internal2_56V = 3,   // Internal 2.56V with external cap at AREF
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AdcPrescaler {
    Div2 = 1,
    Div4 = 2,
    Div8 = 3,
    Div16 = 4,
    Div32 = 5,
    Div64 = 6,
    Div128 = 7,
}

/// Analog sampler setup
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplerConfig {
    pub reference: AdcReference,
    pub channel: AdcChannel,
    pub prescaler: AdcPrescaler,
    pub free_running: bool,
}

impl SamplerConfig {
    /// ADMUX value: REFS1:0 in bits 7:6, MUX in bits 4:0, right adjusted
    pub const fn admux_bits(&self) -> u8 {
        ((self.reference as u8) << 6) | (self.channel as u8 & 0x1F)
    }

    /// ADCSRA value: ADEN | ADSC | ADFR | ADIE | ADPS
    pub const fn adcsra_bits(&self) -> u8 {
        let mut bits = 0x80 | 0x40 | 0x08 | self.prescaler as u8;
        if self.free_running {
            bits |= 0x20;
        }
        bits
    }

    /// Conversions per second at `cpu_hz`; a free-running conversion takes 13 ADC clocks.
    pub const fn cadence_hz(&self, cpu_hz: u32) -> u32 {
        let div = 1u32 << (self.prescaler as u8);
        cpu_hz / div / 13
    }
}

/// Free-running conversion of ADC3 against the internal 2.56V reference,
/// 125kHz ADC clock at 16MHz.
pub const SAMPLER: SamplerConfig = SamplerConfig {
    reference: AdcReference::Internal2_56V,
    channel: AdcChannel::Adc3,
    prescaler: AdcPrescaler::Div128,
    free_running: true,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SpiPrescaler {
    Div4 = 0,
    Div16 = 1,
    Div64 = 2,
    Div128 = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataOrder {
    MsbFirst,
    LsbFirst,
}

/// Telemetry SPI link setup
#[derive(Clone, Copy, Debug, PartialEq, Eq, uDebug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryLinkConfig {
    pub prescaler: SpiPrescaler,
    pub data_order: DataOrder,
}

impl TelemetryLinkConfig {
    /// SPCR value: SPIE | SPE | MSTR | DORD | clock rate, mode 0
    pub const fn spcr_bits(&self) -> u8 {
        let mut bits = 0x80 | 0x40 | 0x10 | self.prescaler as u8;
        if let DataOrder::LsbFirst = self.data_order {
            bits |= 0x20;
        }
        bits
    }
}

pub const TELEMETRY_LINK: TelemetryLinkConfig = TelemetryLinkConfig {
    prescaler: SpiPrescaler::Div16,
    data_order: DataOrder::MsbFirst,
};
