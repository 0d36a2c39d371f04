//! Data paths: one converter, its FPGA-side cores, and its DMA engine,
//! bound together with the link state machine.

use daq2_board::{DacSource, Direction};
use tracing::debug;

use crate::error::{BringupError, Result};
use crate::hal::{DmaEngine, RxConverter, RxCore, TxConverter, TxCore};
use crate::link::LinkEndpoint;

/// One transmit channel's identity for the short-pattern test: the first
/// sample word of its playback buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DacChannel {
    /// First 32-bit sample word of the channel's buffer.
    pub pattern_word: u32,
}

/// The transmit path: DAC, sample core, DMA engine, link.
pub struct TxPath {
    /// Link state machine and FPGA cores.
    pub link: LinkEndpoint,
    pub(crate) converter: Box<dyn TxConverter>,
    pub(crate) core: Box<dyn TxCore>,
    pub(crate) dma: Box<dyn DmaEngine>,
    pub(crate) channels: Vec<DacChannel>,
    source: DacSource,
}

impl std::fmt::Debug for TxPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxPath")
            .field("link", &self.link)
            .field("channels", &self.channels)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl TxPath {
    /// Assemble the transmit path. The source selector starts disabled.
    pub fn new(
        link: LinkEndpoint,
        converter: Box<dyn TxConverter>,
        core: Box<dyn TxCore>,
        dma: Box<dyn DmaEngine>,
        channels: Vec<DacChannel>,
    ) -> Self {
        Self {
            link,
            converter,
            core,
            dma,
            channels,
            source: DacSource::Disabled,
        }
    }

    /// Currently selected sample source.
    #[must_use]
    pub const fn source(&self) -> DacSource {
        self.source
    }

    /// Switch all channels to a new sample source.
    ///
    /// # Errors
    ///
    /// `IllegalState` when the link is not `Locked` — switching sources
    /// on an untrained link produces garbage on the wire.
    pub fn select_source(&mut self, source: DacSource) -> Result<()> {
        if !self.link.is_locked() {
            return Err(BringupError::illegal_state(
                "select_source",
                self.link.state(),
            ));
        }
        self.core.set_source(None, source)?;
        self.source = source;
        debug!("{} source -> {:?}", Direction::Tx, source);
        Ok(())
    }
}

/// The receive path: ADC, sample core, DMA engine, link.
pub struct RxPath {
    /// Link state machine and FPGA cores.
    pub link: LinkEndpoint,
    pub(crate) converter: Box<dyn RxConverter>,
    pub(crate) core: Box<dyn RxCore>,
    pub(crate) dma: Box<dyn DmaEngine>,
    /// Sample resolution in bits.
    pub resolution: u32,
}

impl std::fmt::Debug for RxPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RxPath")
            .field("link", &self.link)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

impl RxPath {
    /// Assemble the receive path.
    pub fn new(
        link: LinkEndpoint,
        converter: Box<dyn RxConverter>,
        core: Box<dyn RxCore>,
        dma: Box<dyn DmaEngine>,
        resolution: u32,
    ) -> Self {
        Self {
            link,
            converter,
            core,
            dma,
            resolution,
        }
    }
}
