//! Discrete control lines and SPI chip selects.
//!
//! The line numbers below are the FMCDAQ2 carrier defaults. They live in
//! a descriptor struct rather than constants so the same sequencer
//! serves other board revisions unchanged.

/// GPIO line map for the board's discrete control and status signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPins {
    /// Transmit transceiver reset (active high).
    pub xcvr_tx_reset: u32,
    /// Receive transceiver reset (active high).
    pub xcvr_rx_reset: u32,
    /// External trigger line.
    pub trig: u32,
    /// ADC power-down (active high).
    pub adc_powerdown: u32,
    /// DAC transmit-enable.
    pub dac_txen: u32,
    /// DAC reset (active low at the chip; the sequencer drives the level
    /// it wants on the line, polarity handled on the carrier).
    pub dac_reset: u32,
    /// Clock-distribution sync strobe.
    pub clkd_sync: u32,
    /// ADC fast-detect B status input.
    pub adc_fdb: u32,
    /// ADC fast-detect A status input.
    pub adc_fda: u32,
    /// DAC interrupt request input.
    pub dac_irq: u32,
    /// Clock-distribution status input 1.
    pub clkd_status_1: u32,
    /// Clock-distribution status input 0.
    pub clkd_status_0: u32,
}

impl BoardPins {
    /// FMCDAQ2 carrier line assignment.
    #[must_use]
    pub const fn fmcdaq2() -> Self {
        Self {
            xcvr_tx_reset: 45,
            xcvr_rx_reset: 44,
            trig: 43,
            adc_powerdown: 42,
            dac_txen: 41,
            dac_reset: 40,
            clkd_sync: 38,
            adc_fdb: 36,
            adc_fda: 35,
            dac_irq: 34,
            clkd_status_1: 33,
            clkd_status_0: 32,
        }
    }
}

/// SPI chip-select assignment for the three devices on the control bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipSelects {
    /// Clock-distribution device.
    pub clock: u8,
    /// Transmit converter (DAC).
    pub dac: u8,
    /// Receive converter (ADC).
    pub adc: u8,
}

impl ChipSelects {
    /// FMCDAQ2 chip-select assignment.
    #[must_use]
    pub const fn fmcdaq2() -> Self {
        Self {
            clock: 0x6,
            dac: 0x5,
            adc: 0x3,
        }
    }

    /// True when all three selects are distinct. Two devices sharing a
    /// select would answer the same bus transactions.
    #[must_use]
    pub const fn unique(&self) -> bool {
        self.clock != self.dac && self.clock != self.adc && self.dac != self.adc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmcdaq2_selects_unique() {
        assert!(ChipSelects::fmcdaq2().unique());
    }

    #[test]
    fn shared_select_detected() {
        let cs = ChipSelects {
            clock: 0x5,
            dac: 0x5,
            adc: 0x3,
        };
        assert!(!cs.unique());
    }
}
