//! Mark/space detector firmware for the ATmega128
//!
//! A reference sample is frozen when the hold gate rises, and every later
//! sample is compared against reference + threshold to drive the result line.
//! Everything except [`hal`] is platform neutral and runs on the host.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod detector;
pub mod dispatch;
pub mod drivers;
pub mod error;
pub mod lines;
pub mod telemetry;
pub mod testing;

#[cfg(target_arch = "avr")]
pub mod hal;

pub use config::DetectorConfig;
pub use detector::{Cycle, Detector, Keying};
pub use dispatch::{Dispatcher, HazardCounters};
pub use error::Error;
pub use lines::{InputLine, LinePort, OutputLine, PinLines};
pub use telemetry::{ByteLink, DiagnosticEvent, EventCode, Telemetry};
