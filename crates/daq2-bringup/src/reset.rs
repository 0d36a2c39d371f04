//! Reset/power sequencing.
//!
//! The converters and transceivers must see a clean reset edge after the
//! reference clock is stable and in sync; otherwise their internal state
//! machines can latch on a glitching clock. The two phases below and the
//! settle holds between them are therefore a hard invariant of the
//! bring-up order, not a tunable.

use std::time::Duration;

use daq2_board::BoardPins;
use tracing::debug;

use crate::error::Result;
use crate::hal::{Delay, GpioCtl};

/// Hold time after each phase.
pub const SETTLE: Duration = Duration::from_millis(1);

/// Drive the discrete control lines through the two-phase
/// assert/settle/release protocol.
///
/// Phase 1 parks everything: transceiver resets asserted, sync strobe
/// and converter controls released, ADC powered down. Phase 2 releases
/// the converters into the now-stable clock: sync asserted, DAC out of
/// reset with outputs enabled, ADC powered up.
///
/// No failure is observable here beyond a GPIO write error; the
/// consequences of a wrong sequence surface downstream as links that
/// never lock.
///
/// # Errors
///
/// Propagates GPIO driver errors.
pub fn run(gpio: &mut dyn GpioCtl, delay: &mut dyn Delay, pins: &BoardPins) -> Result<()> {
    debug!("reset sequence: phase 1 (park)");
    gpio.set(pins.xcvr_tx_reset, true)?;
    gpio.set(pins.xcvr_rx_reset, true)?;
    gpio.set(pins.clkd_sync, false)?;
    gpio.set(pins.dac_reset, false)?;
    gpio.set(pins.dac_txen, false)?;
    gpio.set(pins.adc_powerdown, true)?;
    delay.sleep(SETTLE);

    debug!("reset sequence: phase 2 (release)");
    gpio.set(pins.clkd_sync, true)?;
    gpio.set(pins.dac_reset, true)?;
    gpio.set(pins.dac_txen, true)?;
    gpio.set(pins.adc_powerdown, false)?;
    delay.sleep(SETTLE);

    Ok(())
}
