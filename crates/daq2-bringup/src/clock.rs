//! Clock-tree configuration stage.
//!
//! Validation happens entirely before the first hardware write: an
//! unpopulated role, a zero divider, or a duplicated output channel is a
//! configuration error the caller can fix, not something to discover
//! from a link that never trains.

use daq2_board::clock::ChannelProgram;
use daq2_board::ClockTreeConfig;
use tracing::{debug, info};

use crate::error::{BringupError, Result};
use crate::hal::ClockChip;

/// Validate the configuration and flatten it into the eight per-output
/// channel programs.
///
/// # Errors
///
/// Returns `Config` if any of the eight roles is unpopulated, any
/// divider is zero, or two roles map to the same output channel.
pub fn validate(config: &ClockTreeConfig) -> Result<[ChannelProgram; 8]> {
    config
        .channel_programs()
        .map_err(|e| BringupError::config(e.to_string()))
}

/// Validate, then hand the configuration to the distribution device.
///
/// # Errors
///
/// `Config` on validation failure (before any hardware write), or the
/// device driver's error if the device rejects the configuration.
pub fn program(chip: &mut dyn ClockChip, config: &ClockTreeConfig) -> Result<()> {
    let programs = validate(config)?;
    for p in &programs {
        debug!(
            "clock {}: channel {} divider {}",
            p.role, p.channel, p.divider
        );
    }
    chip.configure(config)?;
    info!(
        "clock tree programmed: vcxo {} Hz, vco m1 {}",
        config.vcxo_freq_hz, config.pll2.vco_diff_m1
    );
    Ok(())
}
