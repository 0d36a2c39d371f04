//! Test-pattern vocabulary for the self-test ladder.

/// Transmit data-path source selector.
///
/// Exactly one source is active per channel at any time; switching is
/// only meaningful once the underlying link is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DacSource {
    /// Output disabled.
    Disabled,
    /// Built-in short (static) test pattern.
    ShortPattern,
    /// First PRBS generator (PN23 sequence on the FPGA core side).
    PrbsA,
    /// Second PRBS generator (PN31 sequence on the FPGA core side).
    PrbsB,
    /// Live samples from the DMA engine.
    Dma,
}

/// PRBS polynomial selection for the DAC datapath checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DacPrbs {
    /// x^7 + x^6 + 1.
    Prbs7,
    /// x^15 + x^14 + 1.
    Prbs15,
}

/// ADC internal test-data generator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcTestMode {
    /// Live samples (generator off).
    Off,
    /// PN9 sequence.
    Pn9,
    /// PN23 sequence.
    Pn23,
}

/// FPGA-side pseudo-random sequence monitor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PnMonitor {
    /// PN9 checker.
    Pn9,
    /// PN23A checker.
    Pn23a,
}

/// Derive the short-pattern-test expectation from a channel's first
/// sample word.
///
/// The 32-bit word is split into its half-words and each is repeated so
/// both sample slots of the test carry a known value:
/// `0x1234_5678` becomes `[0x5678, 0x1234, 0x5678, 0x1234]`.
#[must_use]
pub const fn stpl_samples(word: u32) -> [u16; 4] {
    let lo = (word & 0xffff) as u16;
    let hi = (word >> 16) as u16;
    [lo, hi, lo, hi]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stpl_splits_half_words() {
        assert_eq!(
            stpl_samples(0x1234_5678),
            [0x5678, 0x1234, 0x5678, 0x1234]
        );
    }

    #[test]
    fn stpl_is_per_channel() {
        // Channel 0's expectation depends only on channel 0's word.
        let ch0 = stpl_samples(0x1234_5678);
        let _ch1 = stpl_samples(0xdead_beef);
        assert_eq!(ch0, [0x5678, 0x1234, 0x5678, 0x1234]);
    }
}
