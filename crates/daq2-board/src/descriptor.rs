//! The whole-board descriptor handed to the sequencer at construction.

use crate::clock::ClockTreeConfig;
use crate::link::LinkParams;
use crate::pins::{BoardPins, ChipSelects};

/// Immutable description of one board revision: pin map, chip selects,
/// clock tree, and both link parameter sets.
///
/// The sequencer takes this by value and owns its (preset-resolved)
/// copy for the whole bring-up; nothing here is compiled in, so the
/// same sequencer serves other board revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDescriptor {
    /// Discrete control-line map.
    pub pins: BoardPins,
    /// SPI chip-select map.
    pub chip_selects: ChipSelects,
    /// Clock-distribution configuration.
    pub clock: ClockTreeConfig,
    /// Transmit link parameters.
    pub tx_link: LinkParams,
    /// Receive link parameters.
    pub rx_link: LinkParams,
    /// ADC sample resolution in bits.
    pub adc_resolution: u32,
}

impl BoardDescriptor {
    /// The FMCDAQ2 reference board.
    #[must_use]
    pub fn fmcdaq2() -> Self {
        Self {
            pins: BoardPins::fmcdaq2(),
            chip_selects: ChipSelects::fmcdaq2(),
            clock: ClockTreeConfig::fmcdaq2(),
            tx_link: LinkParams::fmcdaq2_tx(),
            rx_link: LinkParams::fmcdaq2_rx(),
            adc_resolution: 14,
        }
    }
}
