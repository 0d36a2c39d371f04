//! Bring-up and verification sequencer for FMCDAQ2-style JESD204B
//! data-converter boards.
//!
//! The board pairs a clock-distribution device, a transmit converter
//! (DAC), and a receive converter (ADC) with FPGA-side transceiver,
//! link-layer, sample, and DMA cores. This crate drives the whole
//! power-on path: clock-tree programming, the two-phase reset sequence,
//! per-direction JESD204B link establishment with its strict
//! configure-before-train ordering, the pattern self-test ladders, and
//! finally DMA streaming.
//!
//! Hardware access goes through the driver traits in [`hal`]; the
//! [`sim`] module implements them against an in-memory board model so
//! the sequence can be exercised without a bench.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`hal`] | Driver traits and the [`hal::BoardHal`] driver set |
//! | [`error`] | [`BringupError`] and the crate [`Result`] alias |
//! | [`report`] | Per-stage outcome report |
//! | [`sim`] | Simulated board backend with fault injection |
//!
//! The sequencing logic itself lives in private modules behind
//! [`BringupSequencer`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod clock;
pub mod error;
pub mod hal;
mod link;
mod path;
pub mod report;
mod reset;
mod selftest;
mod sequencer;
pub mod sim;
mod stream;

pub use error::{BringupError, Result};
pub use link::{LinkEndpoint, LinkState, TRAIN_SETTLE};
pub use path::{DacChannel, RxPath, TxPath};
pub use report::{BringupReport, Stage, StageRecord, StageStatus};
pub use reset::SETTLE as RESET_SETTLE;
pub use selftest::SelfTestPolicy;
pub use sequencer::{BringupOptions, BringupSequencer, StreamBuffers};
