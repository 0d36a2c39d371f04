//! `daq2` — bring-up runner for FMCDAQ2-style JESD204B boards.
//!
//! ```text
//! USAGE:
//!   daq2 describe                Print the resolved board descriptor
//!   daq2 run [options]           Run the bring-up sequence (simulated)
//! ```
//!
//! `run` drives the full sequence against the simulated board; the fault
//! flags inject the failures a bench would produce, so the sequencer's
//! skip and policy behavior can be inspected from a shell.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use daq2_board::{BoardDescriptor, ClockRole, SpeedGrade};
use daq2_bringup::hal::TransferDescriptor;
use daq2_bringup::sim::{SimBoard, SimFaults};
use daq2_bringup::{BringupOptions, BringupSequencer, SelfTestPolicy, StreamBuffers};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "daq2", about = "FMCDAQ2 JESD204B bring-up runner", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum GradeArg {
    /// 1 GSPS converters, 10 Gbps lanes.
    Nominal,
    /// Receive side at 500 Msps.
    Rx500,
    /// Transmit side at 500 Msps.
    Tx500,
    /// Both sides at 750 Msps.
    Sym750,
}

impl From<GradeArg> for SpeedGrade {
    fn from(arg: GradeArg) -> Self {
        match arg {
            GradeArg::Nominal => Self::Nominal,
            GradeArg::Rx500 => Self::Rx500Msps,
            GradeArg::Tx500 => Self::Tx500Msps,
            GradeArg::Sym750 => Self::Sym750Msps,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Log self-test failures and keep going.
    Continue,
    /// Hold back streaming on a path whose self-test failed.
    Abort,
}

impl From<PolicyArg> for SelfTestPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Continue => Self::Continue,
            PolicyArg::Abort => Self::Abort,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the resolved board descriptor.
    Describe {
        /// Sampling-rate preset to resolve before printing.
        #[arg(long, value_enum, default_value = "nominal")]
        speed_grade: GradeArg,
    },
    /// Run the bring-up sequence against the simulated board.
    Run {
        /// Sampling-rate preset.
        #[arg(long, value_enum, default_value = "nominal")]
        speed_grade: GradeArg,
        /// Disposition of self-test failures.
        #[arg(long, value_enum, default_value = "continue")]
        selftest_policy: PolicyArg,
        /// Inject: clock device does not acknowledge.
        #[arg(long)]
        fail_clock: bool,
        /// Inject: transmit link-layer core never locks.
        #[arg(long)]
        fail_tx_lock: bool,
        /// Inject: receive transceiver never locks.
        #[arg(long)]
        fail_rx_lock: bool,
        /// Inject: N mismatches in the transmit PRBS checker.
        #[arg(long, value_name = "N")]
        tx_prbs_mismatches: Option<u32>,
        /// Inject: N mismatches in the receive PN monitor.
        #[arg(long, value_name = "N")]
        rx_pn_mismatches: Option<u32>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Describe { speed_grade } => cmd_describe(speed_grade.into()),
        Cmd::Run {
            speed_grade,
            selftest_policy,
            fail_clock,
            fail_tx_lock,
            fail_rx_lock,
            tx_prbs_mismatches,
            rx_pn_mismatches,
        } => cmd_run(
            speed_grade.into(),
            selftest_policy.into(),
            SimFaults {
                clock_nack: fail_clock,
                tx_link_lock_fail: fail_tx_lock,
                rx_phy_lock_fail: fail_rx_lock,
                tx_prbs_mismatches: tx_prbs_mismatches.unwrap_or(0),
                rx_pn_mismatches: rx_pn_mismatches.unwrap_or(0),
                ..SimFaults::default()
            },
        ),
    }
}

fn cmd_describe(speed_grade: SpeedGrade) -> Result<()> {
    let mut descriptor = BoardDescriptor::fmcdaq2();
    speed_grade.apply(
        &mut descriptor.clock,
        &mut descriptor.tx_link,
        &mut descriptor.rx_link,
    );

    println!("FMCDAQ2  (vcxo {} Hz)", descriptor.clock.vcxo_freq_hz);
    println!(
        "  tx link  {} kbps  M={} F={} K={}",
        descriptor.tx_link.lane_rate_kbps,
        descriptor.tx_link.converters,
        descriptor.tx_link.octets_per_frame,
        descriptor.tx_link.frames_per_multiframe
    );
    println!(
        "  rx link  {} kbps  M={} F={} K={}  ({} bit)",
        descriptor.rx_link.lane_rate_kbps,
        descriptor.rx_link.converters,
        descriptor.rx_link.octets_per_frame,
        descriptor.rx_link.frames_per_multiframe,
        descriptor.adc_resolution
    );
    println!("  clock outputs:");
    for role in ClockRole::ALL {
        if let Some(spec) = descriptor.clock.channel(role) {
            println!(
                "    {role:18}  ch {:2}  / {}",
                spec.channel, spec.divider
            );
        }
    }
    Ok(())
}

fn cmd_run(speed_grade: SpeedGrade, policy: SelfTestPolicy, faults: SimFaults) -> Result<()> {
    let descriptor = BoardDescriptor::fmcdaq2();

    // A short two-tone ramp; the first word of each channel doubles as
    // the short-pattern test expectation.
    let tx_channel_words = vec![0x0000_1000, 0x0000_2000];
    let buffers = StreamBuffers {
        tx: TransferDescriptor {
            address: 0x8000_0000,
            length: 0x1_0000,
        },
        tx_channel_words: tx_channel_words.clone(),
        rx: TransferDescriptor {
            address: 0x8100_0000,
            length: 0x1_0000,
        },
    };

    let board = SimBoard::with_faults(descriptor.pins, tx_channel_words, faults);
    let mut sequencer = BringupSequencer::new(
        descriptor,
        board.hal(),
        buffers,
        BringupOptions {
            speed_grade,
            self_test_policy: policy,
        },
    );

    let report = sequencer.run();
    print!("{}", report.summary());

    if report.success() {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
