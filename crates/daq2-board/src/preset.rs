//! Speed-grade presets.
//!
//! A preset lowers a converter's sample rate by re-dividing its clocks
//! and slowing the matching link's lanes. The clock divider and the lane
//! rate describe the same physical rate from two sides, so a preset must
//! change both or neither — a half-applied preset trains the link at a
//! rate the clock tree no longer produces.

use crate::clock::{ClockRole, ClockTreeConfig};
use crate::link::LinkParams;

/// The VCO M1 value the half-rate presets key off. With any other M1 the
/// divider arithmetic below would not land on the advertised rates, so
/// the preset refuses to apply.
const VCO_M1_SENTINEL: u32 = 3;

/// Named sampling-rate presets for the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedGrade {
    /// Full rate: 1 GSPS converters, 10 Gbps lanes.
    #[default]
    Nominal,
    /// Receive side at 500 Msps, 5 Gbps lanes; transmit unchanged.
    Rx500Msps,
    /// Transmit side at 500 Msps, 5 Gbps lanes; receive unchanged.
    Tx500Msps,
    /// Both sides at 750 Msps via a VCO M1 change, 7.5 Gbps lanes.
    Sym750Msps,
}

impl SpeedGrade {
    /// Resolve the preset against the clock tree and both links.
    ///
    /// Returns `true` when the preset was applied. The half-rate presets
    /// apply only when `pll2.vco_diff_m1` equals the sentinel value; on a
    /// mismatch **nothing** is modified — dividers and lane rate change
    /// as a pair or not at all.
    pub fn apply(
        self,
        clock: &mut ClockTreeConfig,
        tx: &mut LinkParams,
        rx: &mut LinkParams,
    ) -> bool {
        match self {
            Self::Nominal => false,
            Self::Rx500Msps => {
                half_rate(clock, rx, ClockRole::AdcFpgaClk, ClockRole::AdcDeviceClk)
            }
            Self::Tx500Msps => {
                half_rate(clock, tx, ClockRole::DacFpgaClk, ClockRole::DacDeviceClk)
            }
            Self::Sym750Msps => {
                clock.pll2.vco_diff_m1 = 4;
                tx.lane_rate_kbps = 7_500_000;
                rx.lane_rate_kbps = 7_500_000;
                true
            }
        }
    }
}

fn half_rate(
    clock: &mut ClockTreeConfig,
    link: &mut LinkParams,
    fpga_clk: ClockRole,
    device_clk: ClockRole,
) -> bool {
    if clock.pll2.vco_diff_m1 != VCO_M1_SENTINEL {
        return false;
    }
    // Both roles exist in any config that passes validation; an
    // unpopulated role here leaves the config untouched.
    let (Some(_), Some(_)) = (clock.channel(fpga_clk), clock.channel(device_clk)) else {
        return false;
    };
    if let Some(spec) = clock.channel_mut(fpga_clk) {
        spec.divider = 4;
    }
    if let Some(spec) = clock.channel_mut(device_clk) {
        spec.divider = 2;
    }
    link.lane_rate_kbps = 5_000_000;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ClockTreeConfig, LinkParams, LinkParams) {
        (
            ClockTreeConfig::fmcdaq2(),
            LinkParams::fmcdaq2_tx(),
            LinkParams::fmcdaq2_rx(),
        )
    }

    #[test]
    fn rx500_changes_dividers_and_lane_rate_together() {
        let (mut clock, mut tx, mut rx) = setup();
        assert!(SpeedGrade::Rx500Msps.apply(&mut clock, &mut tx, &mut rx));
        assert_eq!(clock.channel(ClockRole::AdcFpgaClk).unwrap().divider, 4);
        assert_eq!(clock.channel(ClockRole::AdcDeviceClk).unwrap().divider, 2);
        assert_eq!(rx.lane_rate_kbps, 5_000_000);
        // Transmit side untouched.
        assert_eq!(tx.lane_rate_kbps, 10_000_000);
        assert_eq!(clock.channel(ClockRole::DacFpgaClk).unwrap().divider, 2);
    }

    #[test]
    fn mismatched_sentinel_changes_nothing() {
        let (mut clock, mut tx, mut rx) = setup();
        clock.pll2.vco_diff_m1 = 4; // not the sentinel
        let before_clock = clock.clone();
        let before_rx = rx;
        assert!(!SpeedGrade::Rx500Msps.apply(&mut clock, &mut tx, &mut rx));
        assert_eq!(clock, before_clock);
        assert_eq!(rx, before_rx);
    }

    #[test]
    fn tx500_leaves_rx_alone() {
        let (mut clock, mut tx, mut rx) = setup();
        assert!(SpeedGrade::Tx500Msps.apply(&mut clock, &mut tx, &mut rx));
        assert_eq!(tx.lane_rate_kbps, 5_000_000);
        assert_eq!(rx.lane_rate_kbps, 10_000_000);
        assert_eq!(clock.channel(ClockRole::AdcFpgaClk).unwrap().divider, 2);
    }

    #[test]
    fn sym750_retunes_vco_and_both_links() {
        let (mut clock, mut tx, mut rx) = setup();
        assert!(SpeedGrade::Sym750Msps.apply(&mut clock, &mut tx, &mut rx));
        assert_eq!(clock.pll2.vco_diff_m1, 4);
        assert_eq!(tx.lane_rate_kbps, 7_500_000);
        assert_eq!(rx.lane_rate_kbps, 7_500_000);
    }

    #[test]
    fn nominal_is_identity() {
        let (mut clock, mut tx, mut rx) = setup();
        let before = clock.clone();
        assert!(!SpeedGrade::Nominal.apply(&mut clock, &mut tx, &mut rx));
        assert_eq!(clock, before);
    }
}
