//! Board model for the FMCDAQ2 JESD204B data-converter card.
//!
//! This crate has **no dependencies** and **no hardware access** — it is a
//! pure model of the board: the clock-distribution output roles, PLL2
//! parameters, JESD204B link parameters, discrete control-line map,
//! SPI chip-select map, speed-grade presets, and the test-pattern
//! vocabulary used during self-test.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`clock`] | Clock roles, per-channel dividers, PLL2 parameters, validation |
//! | [`descriptor`] | Whole-board descriptor handed to the sequencer |
//! | [`link`] | Per-direction JESD204B + SERDES link parameters |
//! | [`pins`] | GPIO line map and SPI chip-select map |
//! | [`preset`] | Speed-grade presets with the paired divider/lane-rate override |
//! | [`pattern`] | Source selectors, PRBS polynomials, short-pattern derivation |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod descriptor;
pub mod link;
pub mod pattern;
pub mod pins;
pub mod preset;

pub use clock::{ChannelProgram, ClockChannelSpec, ClockRole, ClockTreeConfig, Pll2Config};
pub use descriptor::BoardDescriptor;
pub use link::{ConverterConfig, Direction, LinkParams};
pub use pattern::{stpl_samples, AdcTestMode, DacPrbs, DacSource, PnMonitor};
pub use pins::{BoardPins, ChipSelects};
pub use preset::SpeedGrade;
