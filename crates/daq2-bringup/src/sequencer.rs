//! The bring-up sequencer: one straight-line pass from power-on to
//! streaming.
//!
//! Stages run strictly in order — validate, clock tree, resets, link
//! bring-up (tx then rx), self-test, streaming — on a single thread.
//! Configuration errors are caught before the first hardware write. A
//! hardware failure in one direction aborts that direction's remaining
//! stages without disturbing the other. Self-test mismatches are the
//! one category the sequencer may continue past, governed by
//! [`SelfTestPolicy`]; a driver fault during a ladder is a hard
//! failure like any other.

use daq2_board::link::ConverterConfig;
use daq2_board::{BoardDescriptor, SpeedGrade};
use tracing::{debug, info, warn};

use crate::clock;
use crate::error::{BringupError, Result};
use crate::hal::{BoardHal, TransferDescriptor};
use crate::link::LinkEndpoint;
use crate::path::{DacChannel, RxPath, TxPath};
use crate::report::{BringupReport, Stage, StageStatus};
use crate::reset;
use crate::selftest::{self, SelfTestPolicy};
use crate::stream;

/// DAC sample resolution. The AD9144 datapath is 16 bits regardless of
/// link configuration.
const DAC_RESOLUTION: u32 = 16;

/// The pre-populated DMA buffers for the steady-state capture/playback
/// path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBuffers {
    /// Playback buffer for the transmit path.
    pub tx: TransferDescriptor,
    /// First sample word of each transmit channel's buffer; the
    /// short-pattern test expectation is derived from these.
    pub tx_channel_words: Vec<u32>,
    /// Capture buffer for the receive path.
    pub rx: TransferDescriptor,
}

/// Caller-selectable knobs, resolved once at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct BringupOptions {
    /// Sampling-rate preset, applied to the descriptor before any
    /// hardware write.
    pub speed_grade: SpeedGrade,
    /// Disposition of self-test failures.
    pub self_test_policy: SelfTestPolicy,
}

/// Owns the board descriptor and every driver handle for the duration
/// of bring-up.
pub struct BringupSequencer {
    descriptor: BoardDescriptor,
    gpio: Box<dyn crate::hal::GpioCtl>,
    delay: Box<dyn crate::hal::Delay>,
    clock_chip: Box<dyn crate::hal::ClockChip>,
    tx: TxPath,
    rx: RxPath,
    buffers: StreamBuffers,
    policy: SelfTestPolicy,
}

impl std::fmt::Debug for BringupSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BringupSequencer")
            .field("descriptor", &self.descriptor)
            .field("tx", &self.tx)
            .field("rx", &self.rx)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BringupSequencer {
    /// Assemble the sequencer. The speed-grade preset is resolved here,
    /// once, before anything can touch hardware; the paired
    /// divider/lane-rate override either fully applies or the
    /// descriptor stays at nominal.
    pub fn new(
        mut descriptor: BoardDescriptor,
        hal: BoardHal,
        buffers: StreamBuffers,
        options: BringupOptions,
    ) -> Self {
        let applied = options.speed_grade.apply(
            &mut descriptor.clock,
            &mut descriptor.tx_link,
            &mut descriptor.rx_link,
        );
        if applied {
            info!("speed grade {:?} applied", options.speed_grade);
        } else if options.speed_grade != SpeedGrade::Nominal {
            warn!(
                "speed grade {:?} not applicable (vco m1 is {}), staying at nominal",
                options.speed_grade, descriptor.clock.pll2.vco_diff_m1
            );
        }

        let channels: Vec<DacChannel> = buffers
            .tx_channel_words
            .iter()
            .map(|&pattern_word| DacChannel { pattern_word })
            .collect();

        let tx = TxPath::new(
            LinkEndpoint::new(descriptor.tx_link, hal.tx_link_core, hal.tx_xcvr),
            hal.tx_converter,
            hal.tx_core,
            hal.tx_dma,
            channels,
        );
        let rx = RxPath::new(
            LinkEndpoint::new(descriptor.rx_link, hal.rx_link_core, hal.rx_xcvr),
            hal.rx_converter,
            hal.rx_core,
            hal.rx_dma,
            descriptor.adc_resolution,
        );

        Self {
            descriptor,
            gpio: hal.gpio,
            delay: hal.delay,
            clock_chip: hal.clock,
            tx,
            rx,
            buffers,
            policy: options.self_test_policy,
        }
    }

    /// The (preset-resolved) descriptor the sequencer is driving.
    #[must_use]
    pub const fn descriptor(&self) -> &BoardDescriptor {
        &self.descriptor
    }

    /// Transmit path, for post-run inspection.
    #[must_use]
    pub const fn tx(&self) -> &TxPath {
        &self.tx
    }

    /// Receive path, for post-run inspection.
    #[must_use]
    pub const fn rx(&self) -> &RxPath {
        &self.rx
    }

    /// Run the whole sequence and report per-stage outcomes.
    ///
    /// Never panics and never returns early: every stage is recorded as
    /// passed, failed, or skipped.
    pub fn run(&mut self) -> BringupReport {
        let mut report = BringupReport::default();

        // Everything below Validate touches hardware; everything in
        // Validate must not.
        if let Err(e) = self.validate() {
            report.record(Stage::Validate, StageStatus::Failed(e.to_string()));
            Self::skip(
                &mut report,
                &[
                    Stage::ClockTree,
                    Stage::ResetSequence,
                    Stage::LinkTx,
                    Stage::LinkRx,
                    Stage::SelfTestTx,
                    Stage::SelfTestRx,
                    Stage::StreamTx,
                    Stage::StreamRx,
                ],
            );
            return report;
        }
        report.record(Stage::Validate, StageStatus::Passed);

        if let Err(e) = clock::program(self.clock_chip.as_mut(), &self.descriptor.clock) {
            report.record(Stage::ClockTree, StageStatus::Failed(e.to_string()));
            Self::skip(
                &mut report,
                &[
                    Stage::ResetSequence,
                    Stage::LinkTx,
                    Stage::LinkRx,
                    Stage::SelfTestTx,
                    Stage::SelfTestRx,
                    Stage::StreamTx,
                    Stage::StreamRx,
                ],
            );
            return report;
        }
        report.record(Stage::ClockTree, StageStatus::Passed);

        if let Err(e) = reset::run(
            self.gpio.as_mut(),
            self.delay.as_mut(),
            &self.descriptor.pins,
        ) {
            report.record(Stage::ResetSequence, StageStatus::Failed(e.to_string()));
            Self::skip(
                &mut report,
                &[
                    Stage::LinkTx,
                    Stage::LinkRx,
                    Stage::SelfTestTx,
                    Stage::SelfTestRx,
                    Stage::StreamTx,
                    Stage::StreamRx,
                ],
            );
            return report;
        }
        report.record(Stage::ResetSequence, StageStatus::Passed);

        // The two directions are electrically independent: a failure on
        // one side must not stop the other. Transmit first.
        let tx_locked = Self::record_link(&mut report, Stage::LinkTx, self.bring_up_tx());
        let rx_locked = Self::record_link(&mut report, Stage::LinkRx, self.bring_up_rx());

        let tx_may_stream = if tx_locked {
            Self::record_self_test(
                &mut report,
                Stage::SelfTestTx,
                selftest::run_tx(&mut self.tx),
                self.policy,
            )
        } else {
            report.record(Stage::SelfTestTx, StageStatus::Skipped);
            false
        };
        let rx_may_stream = if rx_locked {
            Self::record_self_test(
                &mut report,
                Stage::SelfTestRx,
                selftest::run_rx(&mut self.rx),
                self.policy,
            )
        } else {
            report.record(Stage::SelfTestRx, StageStatus::Skipped);
            false
        };

        if tx_may_stream {
            match stream::start_tx(&mut self.tx, &self.buffers.tx) {
                Ok(()) => report.record(Stage::StreamTx, StageStatus::Passed),
                Err(e) => report.record(Stage::StreamTx, StageStatus::Failed(e.to_string())),
            }
        } else {
            report.record(Stage::StreamTx, StageStatus::Skipped);
        }

        if rx_may_stream {
            match stream::start_rx(&mut self.rx, &self.buffers.rx) {
                Ok(()) => report.record(Stage::StreamRx, StageStatus::Passed),
                Err(e) => report.record(Stage::StreamRx, StageStatus::Failed(e.to_string())),
            }
        } else {
            report.record(Stage::StreamRx, StageStatus::Skipped);
        }

        report
    }

    /// Pre-hardware checks over the whole descriptor.
    fn validate(&self) -> Result<()> {
        if !self.descriptor.chip_selects.unique() {
            return Err(BringupError::config(format!(
                "chip selects must be unique: clock {:#x}, dac {:#x}, adc {:#x}",
                self.descriptor.chip_selects.clock,
                self.descriptor.chip_selects.dac,
                self.descriptor.chip_selects.adc
            )));
        }
        clock::validate(&self.descriptor.clock)?;
        for params in [&self.descriptor.tx_link, &self.descriptor.rx_link] {
            if params.lane_rate_kbps == 0 {
                return Err(BringupError::config(format!(
                    "{} lane rate must be positive",
                    params.direction
                )));
            }
        }
        let expected = self.descriptor.tx_link.converters as usize;
        if self.buffers.tx_channel_words.len() != expected {
            return Err(BringupError::config(format!(
                "{} tx channel words supplied for {} active converters",
                self.buffers.tx_channel_words.len(),
                expected
            )));
        }
        Ok(())
    }

    fn bring_up_tx(&mut self) -> Result<bool> {
        let config = ConverterConfig::from_link(&self.descriptor.tx_link, DAC_RESOLUTION);
        self.tx.converter.configure(&config)?;
        self.tx.link.spi_configured()?;
        self.tx.link.configure_cores()?;
        self.tx.link.train(self.delay.as_mut())?;
        let locked = self.tx.link.check_lock()?;
        if locked {
            let status = self.tx.converter.read_status()?;
            debug!("tx converter status: {:#010x}", status.0);
        }
        Ok(locked)
    }

    fn bring_up_rx(&mut self) -> Result<bool> {
        let config =
            ConverterConfig::from_link(&self.descriptor.rx_link, self.rx.resolution);
        self.rx.converter.configure(&config)?;
        self.rx.link.spi_configured()?;
        self.rx.link.configure_cores()?;
        self.rx.link.train(self.delay.as_mut())?;
        let locked = self.rx.link.check_lock()?;
        if locked {
            let status = self.rx.converter.read_status()?;
            debug!("rx converter status: {:#010x}", status.0);
        }
        Ok(locked)
    }

    fn record_link(report: &mut BringupReport, stage: Stage, outcome: Result<bool>) -> bool {
        match outcome {
            Ok(true) => {
                report.record(stage, StageStatus::Passed);
                true
            }
            Ok(false) => {
                report.record(stage, StageStatus::Failed("link did not lock".into()));
                false
            }
            Err(e) => {
                report.record(stage, StageStatus::Failed(e.to_string()));
                false
            }
        }
    }

    /// Record a ladder outcome and decide whether the path may stream.
    /// Only a genuine mismatch is continuable under `Continue`; a
    /// driver fault mid-ladder blocks the path regardless of policy.
    fn record_self_test(
        report: &mut BringupReport,
        stage: Stage,
        outcome: Result<()>,
        policy: SelfTestPolicy,
    ) -> bool {
        match outcome {
            Ok(()) => {
                report.record(stage, StageStatus::Passed);
                true
            }
            Err(e) => {
                let continuable = e.is_self_test() && policy == SelfTestPolicy::Continue;
                report.record(stage, StageStatus::Failed(e.to_string()));
                continuable
            }
        }
    }

    fn skip(report: &mut BringupReport, stages: &[Stage]) {
        for stage in stages {
            report.record(*stage, StageStatus::Skipped);
        }
    }
}
