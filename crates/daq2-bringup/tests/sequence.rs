//! End-to-end bring-up runs against the simulated board.

use daq2_board::{AdcTestMode, BoardDescriptor, ClockRole, DacSource, Direction, SpeedGrade};
use daq2_bringup::hal::TransferDescriptor;
use daq2_bringup::sim::{SimBoard, SimFaults};
use daq2_bringup::{
    BringupError, BringupOptions, BringupSequencer, SelfTestPolicy, Stage, StageStatus,
    StreamBuffers,
};

const CHANNEL_WORDS: [u32; 2] = [0x0001_0002, 0x0003_0004];

fn buffers() -> StreamBuffers {
    StreamBuffers {
        tx: TransferDescriptor {
            address: 0x8000_0000,
            length: 0x1_0000,
        },
        tx_channel_words: CHANNEL_WORDS.to_vec(),
        rx: TransferDescriptor {
            address: 0x8100_0000,
            length: 0x1_0000,
        },
    }
}

fn board_with(faults: SimFaults) -> SimBoard {
    SimBoard::with_faults(
        BoardDescriptor::fmcdaq2().pins,
        CHANNEL_WORDS.to_vec(),
        faults,
    )
}

fn run_with(
    board: &SimBoard,
    options: BringupOptions,
) -> (BringupSequencer, daq2_bringup::BringupReport) {
    let mut sequencer =
        BringupSequencer::new(BoardDescriptor::fmcdaq2(), board.hal(), buffers(), options);
    let report = sequencer.run();
    (sequencer, report)
}

#[test]
fn nominal_bring_up_streams_both_directions() {
    let board = board_with(SimFaults::default());
    let (sequencer, report) = run_with(&board, BringupOptions::default());

    assert!(report.success(), "{}", report.summary());
    assert!(sequencer.tx().link.is_locked());
    assert!(sequencer.rx().link.is_locked());
    assert!(board.dma_active(Direction::Tx));
    assert!(board.dma_active(Direction::Rx));
    // Steady state: DAC plays from memory, ADC delivers live samples.
    assert_eq!(board.dac_source(), DacSource::Dma);
    assert_eq!(board.adc_test_mode(), AdcTestMode::Off);
}

#[test]
fn tx_lock_failure_leaves_rx_path_untouched() {
    let board = board_with(SimFaults {
        tx_link_lock_fail: true,
        ..SimFaults::default()
    });
    let (sequencer, report) = run_with(&board, BringupOptions::default());

    assert!(!report.success());
    assert!(matches!(
        report.status(Stage::LinkTx),
        Some(StageStatus::Failed(_))
    ));
    assert_eq!(report.status(Stage::SelfTestTx), Some(&StageStatus::Skipped));
    assert_eq!(report.status(Stage::StreamTx), Some(&StageStatus::Skipped));

    // The receive side is electrically independent and must come up.
    assert_eq!(report.status(Stage::LinkRx), Some(&StageStatus::Passed));
    assert_eq!(report.status(Stage::StreamRx), Some(&StageStatus::Passed));
    assert!(!sequencer.tx().link.is_locked());
    assert!(!board.dma_active(Direction::Tx));
    assert!(board.dma_active(Direction::Rx));
}

#[test]
fn converter_nack_reports_bus_error_for_that_direction() {
    let board = board_with(SimFaults {
        rx_converter_nack: true,
        ..SimFaults::default()
    });
    let (_, report) = run_with(&board, BringupOptions::default());

    match report.status(Stage::LinkRx) {
        Some(StageStatus::Failed(reason)) => {
            assert!(reason.contains("no acknowledgment"), "{reason}");
        }
        other => panic!("expected LinkRx failure, got {other:?}"),
    }
    assert_eq!(report.status(Stage::LinkTx), Some(&StageStatus::Passed));
    assert_eq!(report.status(Stage::StreamTx), Some(&StageStatus::Passed));
}

#[test]
fn second_dma_start_reports_busy() {
    let board = board_with(SimFaults::default());
    let (_, report) = run_with(&board, BringupOptions::default());
    assert!(report.success(), "{}", report.summary());

    let mut dma = board.dma(Direction::Tx);
    match dma.start() {
        Err(BringupError::DmaBusy {
            direction: Direction::Tx,
        }) => {}
        other => panic!("expected DmaBusy, got {other:?}"),
    }
}

#[test]
fn reset_phases_are_ordered_and_settled() {
    let board = board_with(SimFaults::default());
    let (_, report) = run_with(&board, BringupOptions::default());
    assert!(report.success(), "{}", report.summary());

    let pins = BoardDescriptor::fmcdaq2().pins;
    let events = board.gpio_events();
    let find = |line: u32, level: bool| {
        events
            .iter()
            .find(|e| e.line == line && e.level == level)
            .unwrap_or_else(|| panic!("no event for line {line} level {level}"))
    };

    // Phase 1 parks everything in the same instant.
    let park = [
        find(pins.xcvr_tx_reset, true),
        find(pins.xcvr_rx_reset, true),
        find(pins.clkd_sync, false),
        find(pins.dac_reset, false),
        find(pins.dac_txen, false),
        find(pins.adc_powerdown, true),
    ];
    // Phase 2 releases after the settle hold.
    let release = [
        find(pins.clkd_sync, true),
        find(pins.dac_reset, true),
        find(pins.dac_txen, true),
        find(pins.adc_powerdown, false),
    ];

    let park_end = park.iter().map(|e| e.at_ms).max().unwrap();
    for event in &release {
        assert!(
            event.at_ms > park_end,
            "release on line {} at {} ms did not wait out the park settle",
            event.line,
            event.at_ms
        );
    }
    let park_last_seq = park.iter().map(|e| e.seq).max().unwrap();
    let release_first_seq = release.iter().map(|e| e.seq).min().unwrap();
    assert!(release_first_seq > park_last_seq);
}

#[test]
fn invalid_descriptor_fails_before_any_hardware_write() {
    let board = board_with(SimFaults::default());
    let mut descriptor = BoardDescriptor::fmcdaq2();
    descriptor.clock.channels[ClockRole::AdcFpgaSysref.index()] = None;

    let mut sequencer =
        BringupSequencer::new(descriptor, board.hal(), buffers(), BringupOptions::default());
    let report = sequencer.run();

    match report.status(Stage::Validate) {
        Some(StageStatus::Failed(reason)) => {
            assert!(reason.contains("adc-fpga-sysref"), "{reason}");
        }
        other => panic!("expected Validate failure, got {other:?}"),
    }
    for stage in [Stage::ClockTree, Stage::ResetSequence, Stage::StreamRx] {
        assert_eq!(report.status(stage), Some(&StageStatus::Skipped));
    }
    assert!(!board.hardware_touched());
}

#[test]
fn clock_nack_skips_everything_downstream() {
    let board = board_with(SimFaults {
        clock_nack: true,
        ..SimFaults::default()
    });
    let (_, report) = run_with(&board, BringupOptions::default());

    assert!(matches!(
        report.status(Stage::ClockTree),
        Some(StageStatus::Failed(_))
    ));
    for stage in [
        Stage::ResetSequence,
        Stage::LinkTx,
        Stage::LinkRx,
        Stage::StreamTx,
        Stage::StreamRx,
    ] {
        assert_eq!(report.status(stage), Some(&StageStatus::Skipped));
    }
    // The reset lines were never driven.
    assert!(board.gpio_events().is_empty());
}

#[test]
fn self_test_failure_streams_under_continue_policy() {
    let board = board_with(SimFaults {
        tx_prbs_mismatches: 12,
        ..SimFaults::default()
    });
    let (_, report) = run_with(&board, BringupOptions::default());

    match report.status(Stage::SelfTestTx) {
        Some(StageStatus::Failed(reason)) => {
            assert!(reason.contains("tx-prbs7"), "{reason}");
            assert!(reason.contains("12"), "{reason}");
        }
        other => panic!("expected SelfTestTx failure, got {other:?}"),
    }
    // Default policy keeps going: the degraded path still streams.
    assert_eq!(report.status(Stage::StreamTx), Some(&StageStatus::Passed));
    assert!(board.dma_active(Direction::Tx));
    assert!(!report.success());
}

#[test]
fn self_test_failure_blocks_streaming_under_abort_policy() {
    let board = board_with(SimFaults {
        tx_prbs_mismatches: 12,
        ..SimFaults::default()
    });
    let (_, report) = run_with(
        &board,
        BringupOptions {
            self_test_policy: SelfTestPolicy::Abort,
            ..BringupOptions::default()
        },
    );

    assert!(matches!(
        report.status(Stage::SelfTestTx),
        Some(StageStatus::Failed(_))
    ));
    assert_eq!(report.status(Stage::StreamTx), Some(&StageStatus::Skipped));
    assert!(!board.dma_active(Direction::Tx));
    // The receive ladder passed, so only the transmit side is held back.
    assert_eq!(report.status(Stage::StreamRx), Some(&StageStatus::Passed));
    assert!(board.dma_active(Direction::Rx));
}

#[test]
fn driver_fault_in_ladder_blocks_streaming_despite_continue_policy() {
    let board = board_with(SimFaults {
        rx_monitor_fault: true,
        ..SimFaults::default()
    });
    let (_, report) = run_with(&board, BringupOptions::default());

    match report.status(Stage::SelfTestRx) {
        Some(StageStatus::Failed(reason)) => {
            assert!(reason.contains("pn monitor readback"), "{reason}");
        }
        other => panic!("expected SelfTestRx failure, got {other:?}"),
    }
    // Continue only forgives mismatches; a faulted monitor means the
    // path's health is unknown, so it must not stream.
    assert_eq!(report.status(Stage::StreamRx), Some(&StageStatus::Skipped));
    assert!(!board.dma_active(Direction::Rx));
    assert_eq!(report.status(Stage::StreamTx), Some(&StageStatus::Passed));
    assert!(board.dma_active(Direction::Tx));
}

#[test]
fn rx_pattern_mismatches_fail_the_rx_ladder_only() {
    let board = board_with(SimFaults {
        rx_pn_mismatches: 3,
        ..SimFaults::default()
    });
    let (_, report) = run_with(&board, BringupOptions::default());

    match report.status(Stage::SelfTestRx) {
        Some(StageStatus::Failed(reason)) => {
            assert!(reason.contains("rx-pn9"), "{reason}");
        }
        other => panic!("expected SelfTestRx failure, got {other:?}"),
    }
    assert_eq!(report.status(Stage::SelfTestTx), Some(&StageStatus::Passed));
    // The generator is switched off even after a failed check.
    assert_eq!(board.adc_test_mode(), AdcTestMode::Off);
}

#[test]
fn speed_grade_resolves_before_hardware_and_keeps_pair_consistent() {
    let board = board_with(SimFaults::default());
    let (sequencer, report) = run_with(
        &board,
        BringupOptions {
            speed_grade: SpeedGrade::Rx500Msps,
            ..BringupOptions::default()
        },
    );

    assert!(report.success(), "{}", report.summary());
    let descriptor = sequencer.descriptor();
    assert_eq!(descriptor.rx_link.lane_rate_kbps, 5_000_000);
    assert_eq!(descriptor.tx_link.lane_rate_kbps, 10_000_000);

    // The clock device saw the re-divided tree, not the nominal one.
    let accepted = board.clock_config().unwrap();
    assert_eq!(accepted.channel(ClockRole::AdcFpgaClk).unwrap().divider, 4);
    assert_eq!(accepted.channel(ClockRole::AdcDeviceClk).unwrap().divider, 2);
    assert_eq!(accepted.channel(ClockRole::DacFpgaClk).unwrap().divider, 2);
}

#[test]
fn wrong_channel_word_count_is_a_config_error() {
    let board = board_with(SimFaults::default());
    let mut short = buffers();
    short.tx_channel_words.pop();

    let mut sequencer = BringupSequencer::new(
        BoardDescriptor::fmcdaq2(),
        board.hal(),
        short,
        BringupOptions::default(),
    );
    let report = sequencer.run();

    assert!(matches!(
        report.status(Stage::Validate),
        Some(StageStatus::Failed(_))
    ));
    assert!(!board.hardware_touched());
}
