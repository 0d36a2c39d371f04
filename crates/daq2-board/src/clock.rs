//! Clock-distribution device model.
//!
//! The AD9523 on the FMCDAQ2 fans a 125 MHz VCXO out to eight consumers:
//! each converter needs a device clock and a device sysref, and the FPGA
//! side of each link needs its own clock and sysref. Every output is the
//! PLL2 VCO frequency divided by a small integer; sysref outputs use a
//! large divider (128) so the pulse lands well inside a multiframe.
//!
//! The division itself happens in silicon — this module only models the
//! requested configuration and validates it before anything touches the
//! SPI bus.

/// One logical consumer of the clock-distribution device.
///
/// Each role must map to exactly one physical output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockRole {
    /// DAC sample clock (converter side).
    DacDeviceClk,
    /// DAC sysref pulse (converter side).
    DacDeviceSysref,
    /// Transmit-link reference clock (FPGA side).
    DacFpgaClk,
    /// Transmit-link sysref pulse (FPGA side).
    DacFpgaSysref,
    /// ADC sample clock (converter side).
    AdcDeviceClk,
    /// ADC sysref pulse (converter side).
    AdcDeviceSysref,
    /// Receive-link reference clock (FPGA side).
    AdcFpgaClk,
    /// Receive-link sysref pulse (FPGA side).
    AdcFpgaSysref,
}

impl ClockRole {
    /// All eight roles, in programming order.
    pub const ALL: [Self; 8] = [
        Self::DacDeviceClk,
        Self::DacDeviceSysref,
        Self::DacFpgaClk,
        Self::DacFpgaSysref,
        Self::AdcDeviceClk,
        Self::AdcDeviceSysref,
        Self::AdcFpgaClk,
        Self::AdcFpgaSysref,
    ];

    /// Stable index into the per-role channel table.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::DacDeviceClk => 0,
            Self::DacDeviceSysref => 1,
            Self::DacFpgaClk => 2,
            Self::DacFpgaSysref => 3,
            Self::AdcDeviceClk => 4,
            Self::AdcDeviceSysref => 5,
            Self::AdcFpgaClk => 6,
            Self::AdcFpgaSysref => 7,
        }
    }
}

impl std::fmt::Display for ClockRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DacDeviceClk => "dac-device-clk",
            Self::DacDeviceSysref => "dac-device-sysref",
            Self::DacFpgaClk => "dac-fpga-clk",
            Self::DacFpgaSysref => "dac-fpga-sysref",
            Self::AdcDeviceClk => "adc-device-clk",
            Self::AdcDeviceSysref => "adc-device-sysref",
            Self::AdcFpgaClk => "adc-fpga-clk",
            Self::AdcFpgaSysref => "adc-fpga-sysref",
        };
        f.write_str(name)
    }
}

/// One output of the clock-distribution device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockChannelSpec {
    /// Physical output channel index on the device.
    pub channel: u32,
    /// Integer divider from the VCO; must be ≥ 1.
    pub divider: u32,
}

/// PLL2 frequency-synthesis parameters.
///
/// These program the second PLL stage of the distribution device. The
/// synthesis math lives in the device driver; the sequencer only carries
/// the values through and uses `vco_diff_m1` as the speed-grade sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pll2Config {
    /// Charge-pump current in nA.
    pub charge_pump_current_na: u32,
    /// Reference frequency doubler enable.
    pub freq_doubler: bool,
    /// R2 divider.
    pub r2_div: u32,
    /// N divider A counter.
    pub ndiv_a: u32,
    /// N divider B counter.
    pub ndiv_b: u32,
    /// VCO differential M1 divider. Speed-grade presets key off this.
    pub vco_diff_m1: u32,
    /// VCO differential M2 divider.
    pub vco_diff_m2: u32,
    /// Loop-filter pole resistor code.
    pub rpole2: u32,
    /// Loop-filter zero resistor code.
    pub rzero: u32,
    /// Loop-filter pole capacitor code.
    pub cpole1: u32,
}

/// Whole clock-distribution device configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockTreeConfig {
    /// VCXO reference frequency in Hz.
    pub vcxo_freq_hz: u64,
    /// Use 3-wire SPI on the device.
    pub spi3wire: bool,
    /// Differential oscillator input enable.
    pub osc_in_diff: bool,
    /// PLL2 synthesis parameters.
    pub pll2: Pll2Config,
    /// Per-role output channel assignment, indexed by [`ClockRole::index`].
    /// `None` means the role is unpopulated, which fails validation.
    pub channels: [Option<ClockChannelSpec>; 8],
}

/// A validated `(role, channel, divider)` program for one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelProgram {
    /// The logical role this output serves.
    pub role: ClockRole,
    /// Physical output channel index.
    pub channel: u32,
    /// Integer divider.
    pub divider: u32,
}

/// Reasons a [`ClockTreeConfig`] can fail validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockTreeError {
    /// A required role has no channel assigned.
    MissingRole(ClockRole),
    /// A divider of zero was requested.
    ZeroDivider(ClockRole),
    /// Two roles were mapped to the same physical channel.
    DuplicateChannel {
        /// The physical channel claimed twice.
        channel: u32,
        /// First role mapped to it.
        first: ClockRole,
        /// Second role mapped to it.
        second: ClockRole,
    },
}

impl std::fmt::Display for ClockTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRole(role) => write!(f, "clock role {role} has no channel assigned"),
            Self::ZeroDivider(role) => write!(f, "clock role {role} has divider 0"),
            Self::DuplicateChannel {
                channel,
                first,
                second,
            } => write!(
                f,
                "clock channel {channel} assigned to both {first} and {second}"
            ),
        }
    }
}

impl std::error::Error for ClockTreeError {}

impl ClockTreeConfig {
    /// Default configuration for the FMCDAQ2 board: 125 MHz VCXO,
    /// 1 GSPS converter clocks, sysref at VCO/128.
    #[must_use]
    pub fn fmcdaq2() -> Self {
        let mut channels = [None; 8];
        let assign = |channels: &mut [Option<ClockChannelSpec>; 8],
                      role: ClockRole,
                      channel: u32,
                      divider: u32| {
            channels[role.index()] = Some(ClockChannelSpec { channel, divider });
        };
        assign(&mut channels, ClockRole::DacDeviceClk, 1, 1);
        assign(&mut channels, ClockRole::DacDeviceSysref, 7, 128);
        assign(&mut channels, ClockRole::DacFpgaClk, 9, 2);
        assign(&mut channels, ClockRole::DacFpgaSysref, 8, 128);
        assign(&mut channels, ClockRole::AdcDeviceClk, 13, 1);
        assign(&mut channels, ClockRole::AdcDeviceSysref, 6, 128);
        assign(&mut channels, ClockRole::AdcFpgaClk, 4, 2);
        assign(&mut channels, ClockRole::AdcFpgaSysref, 5, 128);

        Self {
            vcxo_freq_hz: 125_000_000,
            spi3wire: true,
            osc_in_diff: true,
            pll2: Pll2Config {
                charge_pump_current_na: 413_000,
                freq_doubler: false,
                r2_div: 1,
                ndiv_a: 0,
                ndiv_b: 6,
                vco_diff_m1: 3,
                vco_diff_m2: 0,
                rpole2: 0,
                rzero: 7,
                cpole1: 2,
            },
            channels,
        }
    }

    /// Access the channel spec for one role.
    #[must_use]
    pub fn channel(&self, role: ClockRole) -> Option<ClockChannelSpec> {
        self.channels[role.index()]
    }

    /// Mutable access to the channel spec for one role.
    pub fn channel_mut(&mut self, role: ClockRole) -> Option<&mut ClockChannelSpec> {
        self.channels[role.index()].as_mut()
    }

    /// Validate and flatten the configuration into the eight per-output
    /// programs, in role order.
    ///
    /// # Errors
    ///
    /// Fails if any role is unpopulated, any divider is zero, or two
    /// roles claim the same physical channel.
    pub fn channel_programs(&self) -> Result<[ChannelProgram; 8], ClockTreeError> {
        let mut programs = [ChannelProgram {
            role: ClockRole::DacDeviceClk,
            channel: 0,
            divider: 1,
        }; 8];

        for role in ClockRole::ALL {
            let spec = self
                .channel(role)
                .ok_or(ClockTreeError::MissingRole(role))?;
            if spec.divider == 0 {
                return Err(ClockTreeError::ZeroDivider(role));
            }
            programs[role.index()] = ChannelProgram {
                role,
                channel: spec.channel,
                divider: spec.divider,
            };
        }

        for i in 0..programs.len() {
            for j in (i + 1)..programs.len() {
                if programs[i].channel == programs[j].channel {
                    return Err(ClockTreeError::DuplicateChannel {
                        channel: programs[i].channel,
                        first: programs[i].role,
                        second: programs[j].role,
                    });
                }
            }
        }

        Ok(programs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmcdaq2_defaults_validate() {
        let programs = ClockTreeConfig::fmcdaq2().channel_programs().unwrap();
        assert_eq!(programs.len(), 8);
        // One program per role, in role order.
        for (i, role) in ClockRole::ALL.iter().enumerate() {
            assert_eq!(programs[i].role, *role);
        }
    }

    #[test]
    fn missing_role_rejected() {
        let mut cfg = ClockTreeConfig::fmcdaq2();
        cfg.channels[ClockRole::AdcFpgaSysref.index()] = None;
        assert_eq!(
            cfg.channel_programs(),
            Err(ClockTreeError::MissingRole(ClockRole::AdcFpgaSysref))
        );
    }

    #[test]
    fn duplicate_channel_rejected() {
        let mut cfg = ClockTreeConfig::fmcdaq2();
        cfg.channel_mut(ClockRole::AdcDeviceClk).unwrap().channel = 1; // collides with DAC device clk
        match cfg.channel_programs() {
            Err(ClockTreeError::DuplicateChannel { channel: 1, .. }) => {}
            other => panic!("expected duplicate channel error, got {other:?}"),
        }
    }

    #[test]
    fn zero_divider_rejected() {
        let mut cfg = ClockTreeConfig::fmcdaq2();
        cfg.channel_mut(ClockRole::DacFpgaClk).unwrap().divider = 0;
        assert_eq!(
            cfg.channel_programs(),
            Err(ClockTreeError::ZeroDivider(ClockRole::DacFpgaClk))
        );
    }
}
