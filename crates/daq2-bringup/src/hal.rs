//! Collaborator interfaces the sequencer consumes.
//!
//! Each trait mirrors one of the low-level drivers the bring-up sequence
//! depends on: the clock-distribution device, the two converters, the
//! FPGA-side transceiver and link-layer cores, the sample cores, the DMA
//! engines, GPIO, and timed waits. The drivers themselves — SPI framing,
//! PLL math, eye training, ring buffers — are out of scope here; the
//! sequencer only needs these operations to exist and report failure.
//!
//! Every interaction returns a `Result` even where the underlying
//! hardware offers no acknowledgment, so failure states stay explicit
//! and inspectable.

use std::time::Duration;

use daq2_board::{
    AdcTestMode, ClockTreeConfig, ConverterConfig, DacPrbs, DacSource, LinkParams, PnMonitor,
};

use crate::error::Result;

/// Clock-distribution device driver.
pub trait ClockChip {
    /// Program the whole clock tree. Called exactly once per bring-up,
    /// after validation and preset resolution.
    fn configure(&mut self, config: &ClockTreeConfig) -> Result<()>;
}

/// Discrete control-line driver.
pub trait GpioCtl {
    /// Drive one line to a level. The side effect is physical and only
    /// observable through downstream device behavior.
    fn set(&mut self, line: u32, level: bool) -> Result<()>;
}

/// Timed wait. Blocks the (single) sequencing thread.
pub trait Delay {
    /// Sleep for at least `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Raw status word read back from a converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusBits(pub u32);

/// Transmit converter (DAC) driver, reached over the control bus.
pub trait TxConverter {
    /// Push link parameters and operating mode over SPI.
    fn configure(&mut self, config: &ConverterConfig) -> Result<()>;

    /// Run the built-in short-pattern test against the expected
    /// per-channel sample quadruples. Returns the mismatch count.
    fn short_pattern_test(&mut self, expected: &[[u16; 4]]) -> Result<u32>;

    /// Run the datapath PRBS checker for one polynomial. Returns the
    /// mismatch count across all lanes.
    fn datapath_prbs_test(&mut self, prbs: DacPrbs) -> Result<u32>;

    /// Read back the converter's link status word.
    fn read_status(&mut self) -> Result<StatusBits>;
}

/// Receive converter (ADC) driver, reached over the control bus.
pub trait RxConverter {
    /// Push link parameters and operating mode over SPI.
    fn configure(&mut self, config: &ConverterConfig) -> Result<()>;

    /// Select the internal test-data generator mode.
    fn set_test_mode(&mut self, mode: AdcTestMode) -> Result<()>;

    /// Read back the converter's link status word.
    fn read_status(&mut self) -> Result<StatusBits>;
}

/// FPGA-side JESD204B link-layer core.
pub trait LinkCore {
    /// Latch framing parameters. Must happen before the transceiver is
    /// configured — the training sequence depends on them.
    fn configure(&mut self, params: &LinkParams) -> Result<()>;

    /// Whether the link layer reports sync.
    fn lock_status(&mut self) -> Result<bool>;
}

/// FPGA-side gigabit transceiver core.
pub trait Transceiver {
    /// Program lane rate and PHY parameters.
    fn configure(&mut self, params: &LinkParams) -> Result<()>;

    /// Kick off PHY training. Asynchronous in hardware; the sequencer
    /// follows with a fixed settle delay and a single status sample.
    fn train(&mut self) -> Result<()>;

    /// Whether the PHY reports lock.
    fn lock_status(&mut self) -> Result<bool>;
}

/// Transmit sample core: owns the per-channel data-path source mux.
pub trait TxCore {
    /// Select the sample source for one channel, or for all channels
    /// when `channel` is `None`.
    fn set_source(&mut self, channel: Option<usize>, source: DacSource) -> Result<()>;
}

/// Receive sample core: owns the pseudo-random sequence monitor.
pub trait RxCore {
    /// Run the selected PN checker against incoming samples and return
    /// the mismatch count.
    fn pattern_monitor(&mut self, monitor: PnMonitor) -> Result<u32>;
}

/// One DMA transfer, described up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDescriptor {
    /// Physical address of the sample buffer.
    pub address: u64,
    /// Transfer length in bytes.
    pub length: usize,
}

/// Streaming DMA engine for one direction.
pub trait DmaEngine {
    /// Hand the engine a transfer descriptor. Does not start anything.
    fn bind(&mut self, descriptor: &TransferDescriptor) -> Result<()>;

    /// Start one transfer. Fails with `DmaBusy` if a transfer is
    /// already in flight.
    fn start(&mut self) -> Result<()>;
}

/// The full set of drivers the sequencer owns for one board.
///
/// All handles are exclusively owned by the single sequencing thread
/// for the duration of bring-up.
pub struct BoardHal {
    /// Discrete control lines.
    pub gpio: Box<dyn GpioCtl>,
    /// Timed waits.
    pub delay: Box<dyn Delay>,
    /// Clock-distribution device.
    pub clock: Box<dyn ClockChip>,
    /// Transmit converter.
    pub tx_converter: Box<dyn TxConverter>,
    /// Transmit sample core.
    pub tx_core: Box<dyn TxCore>,
    /// Transmit link-layer core.
    pub tx_link_core: Box<dyn LinkCore>,
    /// Transmit transceiver core.
    pub tx_xcvr: Box<dyn Transceiver>,
    /// Transmit DMA engine.
    pub tx_dma: Box<dyn DmaEngine>,
    /// Receive converter.
    pub rx_converter: Box<dyn RxConverter>,
    /// Receive sample core.
    pub rx_core: Box<dyn RxCore>,
    /// Receive link-layer core.
    pub rx_link_core: Box<dyn LinkCore>,
    /// Receive transceiver core.
    pub rx_xcvr: Box<dyn Transceiver>,
    /// Receive DMA engine.
    pub rx_dma: Box<dyn DmaEngine>,
}

impl std::fmt::Debug for BoardHal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardHal").finish_non_exhaustive()
    }
}
