//! Pattern-based self-test ladder.
//!
//! Transmit: a static short-pattern test derived from each channel's
//! first real sample, then the datapath PRBS checker with two
//! polynomials. Receive: the converter's internal PN generators against
//! the FPGA-side monitor, then back to live samples.
//!
//! Each check either passes or yields a mismatch count; any non-zero
//! count fails the check. All checks of a ladder run even after a
//! failure — a complete mismatch picture is worth more during debugging
//! than an early abort — and the first failure is reported at the end.
//! Whether a failed ladder stops the bring-up is the sequencer's policy,
//! not decided here.
//!
//! All of this assumes the link is already `Locked`; pre-lock results
//! are meaningless, so a non-locked path is rejected as a caller error.

use daq2_board::{stpl_samples, AdcTestMode, DacPrbs, DacSource, PnMonitor};
use tracing::{info, warn};

use crate::error::{BringupError, Result};
use crate::path::{RxPath, TxPath};

/// What to do with the sequence when a self-test fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfTestPolicy {
    /// Log the failure and keep going. Bring-up with an uncalibrated
    /// eye margin is still useful for debugging.
    #[default]
    Continue,
    /// Treat a self-test failure like a hard failure for that path.
    Abort,
}

struct Ladder {
    first_failure: Option<(&'static str, u32)>,
}

impl Ladder {
    const fn new() -> Self {
        Self {
            first_failure: None,
        }
    }

    fn record(&mut self, test: &'static str, mismatches: u32) {
        if mismatches == 0 {
            info!("self-test {test}: passed");
        } else {
            warn!("self-test {test}: {mismatches} mismatches");
            if self.first_failure.is_none() {
                self.first_failure = Some((test, mismatches));
            }
        }
    }

    fn finish(self) -> Result<()> {
        match self.first_failure {
            None => Ok(()),
            Some((test, mismatches)) => Err(BringupError::self_test(test, mismatches)),
        }
    }
}

/// Run the transmit self-test ladder: short pattern, PRBS7, PRBS15.
///
/// # Errors
///
/// `IllegalState` if the link is not `Locked`; `SelfTest` with the first
/// failing check if any mismatch count is non-zero; driver errors pass
/// through.
pub fn run_tx(path: &mut TxPath) -> Result<()> {
    if !path.link.is_locked() {
        return Err(BringupError::illegal_state("tx self-test", path.link.state()));
    }
    let mut ladder = Ladder::new();

    // Static pattern: both sample slots of each channel carry the
    // half-words of that channel's first buffer sample.
    let expected: Vec<[u16; 4]> = path
        .channels
        .iter()
        .map(|ch| stpl_samples(ch.pattern_word))
        .collect();
    path.select_source(DacSource::ShortPattern)?;
    let mismatches = path.converter.short_pattern_test(&expected)?;
    ladder.record("tx-short-pattern", mismatches);

    path.select_source(DacSource::PrbsA)?;
    let mismatches = path.converter.datapath_prbs_test(DacPrbs::Prbs7)?;
    ladder.record("tx-prbs7", mismatches);

    path.select_source(DacSource::PrbsB)?;
    let mismatches = path.converter.datapath_prbs_test(DacPrbs::Prbs15)?;
    ladder.record("tx-prbs15", mismatches);

    ladder.finish()
}

/// Run the receive self-test ladder: PN9 and PN23 through the FPGA-side
/// monitor, then the test generator off.
///
/// The generator is switched off even when a check fails, so the path
/// is always left in live-sample mode.
///
/// # Errors
///
/// `IllegalState` if the link is not `Locked`; `SelfTest` with the first
/// failing check if any mismatch count is non-zero; driver errors pass
/// through.
pub fn run_rx(path: &mut RxPath) -> Result<()> {
    if !path.link.is_locked() {
        return Err(BringupError::illegal_state("rx self-test", path.link.state()));
    }
    let mut ladder = Ladder::new();

    path.converter.set_test_mode(AdcTestMode::Pn9)?;
    let mismatches = path.core.pattern_monitor(PnMonitor::Pn9)?;
    ladder.record("rx-pn9", mismatches);

    path.converter.set_test_mode(AdcTestMode::Pn23)?;
    let mismatches = path.core.pattern_monitor(PnMonitor::Pn23a)?;
    ladder.record("rx-pn23", mismatches);

    path.converter.set_test_mode(AdcTestMode::Off)?;

    ladder.finish()
}
