//! Simulated board backend.
//!
//! Implements every collaborator trait against a shared in-memory board
//! model: a virtual millisecond clock advanced by `sleep`, a recorded
//! `(line, level, timestamp)` GPIO event log, and lock behavior gated on
//! the same prerequisites the real hardware has — stable clock, released
//! resets, configured converter, link-layer core latched before the
//! transceiver, training settled. This makes the sequencer's ordering
//! bugs visible as links that never lock, exactly like the bench.
//!
//! Fault injection knobs cover the failure paths: bus NACKs, a stuck
//! lock status on either core of either direction, and self-test
//! mismatch counts.
//!
//! All handles share one `Rc<RefCell<…>>` state; the bring-up sequence
//! is single-threaded by design, so nothing here is `Send`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use daq2_board::{
    stpl_samples, AdcTestMode, BoardPins, ClockTreeConfig, ConverterConfig, DacPrbs, DacSource,
    Direction, LinkParams, PnMonitor,
};
use tracing::debug;

use crate::error::{BringupError, Result};
use crate::hal::{
    BoardHal, ClockChip, Delay, DmaEngine, GpioCtl, LinkCore, RxConverter, RxCore, StatusBits,
    Transceiver, TransferDescriptor, TxConverter, TxCore,
};

/// Virtual time the PHY needs after `train` before lock can be observed.
/// Shorter than the sequencer's settle delay, so a correctly ordered
/// sequence always finds lock on its single status sample.
const TRAIN_TIME_MS: u64 = 5;

/// One recorded GPIO write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimEvent {
    /// GPIO line number.
    pub line: u32,
    /// Level driven.
    pub level: bool,
    /// Virtual time of the write, ms.
    pub at_ms: u64,
    /// Monotonic sequence number, for ordering within one instant.
    pub seq: u64,
}

/// Injectable faults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimFaults {
    /// Clock-distribution device does not acknowledge.
    pub clock_nack: bool,
    /// Transmit converter does not acknowledge.
    pub tx_converter_nack: bool,
    /// Receive converter does not acknowledge.
    pub rx_converter_nack: bool,
    /// Transmit transceiver never reports lock.
    pub tx_phy_lock_fail: bool,
    /// Transmit link-layer core never reports lock.
    pub tx_link_lock_fail: bool,
    /// Receive transceiver never reports lock.
    pub rx_phy_lock_fail: bool,
    /// Receive link-layer core never reports lock.
    pub rx_link_lock_fail: bool,
    /// Mismatches reported by the DAC short-pattern test.
    pub tx_stpl_mismatches: u32,
    /// Mismatches reported by the DAC PRBS checker.
    pub tx_prbs_mismatches: u32,
    /// Mismatches reported by the ADC PN monitor.
    pub rx_pn_mismatches: u32,
    /// Receive PN monitor readback fails outright.
    pub rx_monitor_fault: bool,
}

#[derive(Debug, Default)]
struct SimLinkSide {
    converter_configured: bool,
    link_core_configured: bool,
    xcvr_configured: bool,
    trained_at_ms: Option<u64>,
}

#[derive(Debug)]
struct SimState {
    pins: BoardPins,
    chip_select_clock: u8,
    chip_select_dac: u8,
    chip_select_adc: u8,
    faults: SimFaults,
    now_ms: u64,
    next_seq: u64,
    gpio_events: Vec<SimEvent>,
    clock_config: Option<ClockTreeConfig>,
    tx: SimLinkSide,
    rx: SimLinkSide,
    tx_channel_words: Vec<u32>,
    dac_source: DacSource,
    adc_test_mode: AdcTestMode,
    tx_dma_bound: Option<TransferDescriptor>,
    rx_dma_bound: Option<TransferDescriptor>,
    tx_dma_active: bool,
    rx_dma_active: bool,
    hardware_writes: u64,
}

impl SimState {
    fn line_level(&self, line: u32) -> bool {
        // Last write wins; lines start low.
        self.gpio_events
            .iter()
            .rev()
            .find(|e| e.line == line)
            .is_some_and(|e| e.level)
    }

    fn resets_released(&self, direction: Direction) -> bool {
        let sync = self.line_level(self.pins.clkd_sync);
        match direction {
            Direction::Tx => {
                sync && self.line_level(self.pins.dac_reset) && self.line_level(self.pins.dac_txen)
            }
            Direction::Rx => sync && !self.line_level(self.pins.adc_powerdown),
        }
    }

    fn side(&self, direction: Direction) -> &SimLinkSide {
        match direction {
            Direction::Tx => &self.tx,
            Direction::Rx => &self.rx,
        }
    }

    fn side_mut(&mut self, direction: Direction) -> &mut SimLinkSide {
        match direction {
            Direction::Tx => &mut self.tx,
            Direction::Rx => &mut self.rx,
        }
    }

    /// The prerequisites every lock source shares.
    fn link_ready(&self, direction: Direction) -> bool {
        let side = self.side(direction);
        self.clock_config.is_some()
            && self.resets_released(direction)
            && side.converter_configured
            && side.link_core_configured
            && side.xcvr_configured
            && side
                .trained_at_ms
                .is_some_and(|t| self.now_ms >= t + TRAIN_TIME_MS)
    }

    fn phy_locked(&self, direction: Direction) -> bool {
        let fault = match direction {
            Direction::Tx => self.faults.tx_phy_lock_fail,
            Direction::Rx => self.faults.rx_phy_lock_fail,
        };
        !fault && self.link_ready(direction)
    }

    fn link_core_locked(&self, direction: Direction) -> bool {
        let fault = match direction {
            Direction::Tx => self.faults.tx_link_lock_fail,
            Direction::Rx => self.faults.rx_link_lock_fail,
        };
        !fault && self.link_ready(direction)
    }
}

/// A simulated FMCDAQ2-style board. Cloning shares the underlying
/// state, so inspection handles stay valid while the sequencer owns the
/// driver boxes.
#[derive(Clone)]
pub struct SimBoard {
    state: Rc<RefCell<SimState>>,
}

impl std::fmt::Debug for SimBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimBoard").finish_non_exhaustive()
    }
}

impl SimBoard {
    /// Create a fault-free board. `tx_channel_words` are the first
    /// sample words the FPGA core's pattern generator will emit per
    /// transmit channel, the ground truth the short-pattern test is
    /// checked against.
    #[must_use]
    pub fn new(pins: BoardPins, tx_channel_words: Vec<u32>) -> Self {
        Self::with_faults(pins, tx_channel_words, SimFaults::default())
    }

    /// Create a board with injected faults.
    #[must_use]
    pub fn with_faults(pins: BoardPins, tx_channel_words: Vec<u32>, faults: SimFaults) -> Self {
        let cs = daq2_board::ChipSelects::fmcdaq2();
        Self {
            state: Rc::new(RefCell::new(SimState {
                pins,
                chip_select_clock: cs.clock,
                chip_select_dac: cs.dac,
                chip_select_adc: cs.adc,
                faults,
                now_ms: 0,
                next_seq: 0,
                gpio_events: Vec::new(),
                clock_config: None,
                tx: SimLinkSide::default(),
                rx: SimLinkSide::default(),
                tx_channel_words,
                dac_source: DacSource::Disabled,
                adc_test_mode: AdcTestMode::Off,
                tx_dma_bound: None,
                rx_dma_bound: None,
                tx_dma_active: false,
                rx_dma_active: false,
                hardware_writes: 0,
            })),
        }
    }

    /// Build the full driver set for the sequencer.
    #[must_use]
    pub fn hal(&self) -> BoardHal {
        BoardHal {
            gpio: Box::new(SimGpio(self.state.clone())),
            delay: Box::new(SimDelay(self.state.clone())),
            clock: Box::new(SimClock(self.state.clone())),
            tx_converter: Box::new(SimTxConverter(self.state.clone())),
            tx_core: Box::new(SimTxCore(self.state.clone())),
            tx_link_core: Box::new(SimLinkLayer {
                state: self.state.clone(),
                direction: Direction::Tx,
            }),
            tx_xcvr: Box::new(SimXcvr {
                state: self.state.clone(),
                direction: Direction::Tx,
            }),
            tx_dma: Box::new(SimDma {
                state: self.state.clone(),
                direction: Direction::Tx,
            }),
            rx_converter: Box::new(SimRxConverter(self.state.clone())),
            rx_core: Box::new(SimRxCore(self.state.clone())),
            rx_link_core: Box::new(SimLinkLayer {
                state: self.state.clone(),
                direction: Direction::Rx,
            }),
            rx_xcvr: Box::new(SimXcvr {
                state: self.state.clone(),
                direction: Direction::Rx,
            }),
            rx_dma: Box::new(SimDma {
                state: self.state.clone(),
                direction: Direction::Rx,
            }),
        }
    }

    /// A standalone DMA handle for one direction, sharing the board
    /// state (e.g. to provoke a double start).
    #[must_use]
    pub fn dma(&self, direction: Direction) -> Box<dyn DmaEngine> {
        Box::new(SimDma {
            state: self.state.clone(),
            direction,
        })
    }

    /// The recorded GPIO writes, in order.
    #[must_use]
    pub fn gpio_events(&self) -> Vec<SimEvent> {
        self.state.borrow().gpio_events.clone()
    }

    /// Current virtual time, ms.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.state.borrow().now_ms
    }

    /// Whether any hardware-facing write has happened yet.
    #[must_use]
    pub fn hardware_touched(&self) -> bool {
        self.state.borrow().hardware_writes > 0
    }

    /// The clock configuration the device accepted, if any.
    #[must_use]
    pub fn clock_config(&self) -> Option<ClockTreeConfig> {
        self.state.borrow().clock_config.clone()
    }

    /// Whether a DMA transfer is in flight for one direction.
    #[must_use]
    pub fn dma_active(&self, direction: Direction) -> bool {
        let state = self.state.borrow();
        match direction {
            Direction::Tx => state.tx_dma_active,
            Direction::Rx => state.rx_dma_active,
        }
    }

    /// Currently selected DAC source.
    #[must_use]
    pub fn dac_source(&self) -> DacSource {
        self.state.borrow().dac_source
    }

    /// Current ADC test-generator mode.
    #[must_use]
    pub fn adc_test_mode(&self) -> AdcTestMode {
        self.state.borrow().adc_test_mode
    }
}

struct SimGpio(Rc<RefCell<SimState>>);

impl GpioCtl for SimGpio {
    fn set(&mut self, line: u32, level: bool) -> Result<()> {
        let mut s = self.0.borrow_mut();
        let event = SimEvent {
            line,
            level,
            at_ms: s.now_ms,
            seq: s.next_seq,
        };
        s.next_seq += 1;
        s.hardware_writes += 1;
        s.gpio_events.push(event);
        Ok(())
    }
}

struct SimDelay(Rc<RefCell<SimState>>);

impl Delay for SimDelay {
    #[allow(clippy::cast_possible_truncation)]
    fn sleep(&mut self, duration: Duration) {
        let mut s = self.0.borrow_mut();
        s.now_ms += duration.as_millis() as u64;
    }
}

struct SimClock(Rc<RefCell<SimState>>);

impl ClockChip for SimClock {
    fn configure(&mut self, config: &ClockTreeConfig) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.hardware_writes += 1;
        if s.faults.clock_nack {
            return Err(BringupError::bus(s.chip_select_clock, "no acknowledgment"));
        }
        s.clock_config = Some(config.clone());
        debug!("sim: clock tree accepted");
        Ok(())
    }
}

struct SimTxConverter(Rc<RefCell<SimState>>);

impl TxConverter for SimTxConverter {
    fn configure(&mut self, _config: &ConverterConfig) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.hardware_writes += 1;
        if s.faults.tx_converter_nack {
            return Err(BringupError::bus(s.chip_select_dac, "no acknowledgment"));
        }
        s.tx.converter_configured = true;
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn short_pattern_test(&mut self, expected: &[[u16; 4]]) -> Result<u32> {
        let s = self.0.borrow();
        if s.dac_source != DacSource::ShortPattern {
            return Err(BringupError::illegal_state(
                "short_pattern_test",
                format!("source {:?}", s.dac_source),
            ));
        }
        // The generator emits each channel's first buffer word; count
        // half-word slots that differ from the caller's expectation.
        let mut mismatches = s.faults.tx_stpl_mismatches;
        for (channel, samples) in expected.iter().enumerate() {
            let generated = s
                .tx_channel_words
                .get(channel)
                .map_or([0; 4], |&w| stpl_samples(w));
            mismatches += samples
                .iter()
                .zip(generated.iter())
                .filter(|(a, b)| a != b)
                .count() as u32;
        }
        Ok(mismatches)
    }

    fn datapath_prbs_test(&mut self, prbs: DacPrbs) -> Result<u32> {
        let s = self.0.borrow();
        let expected_source = match prbs {
            DacPrbs::Prbs7 => DacSource::PrbsA,
            DacPrbs::Prbs15 => DacSource::PrbsB,
        };
        if s.dac_source != expected_source {
            // Checker free-runs against unrelated data.
            return Ok(u32::MAX);
        }
        Ok(s.faults.tx_prbs_mismatches)
    }

    fn read_status(&mut self) -> Result<StatusBits> {
        let s = self.0.borrow();
        let mut bits = 0;
        if s.phy_locked(Direction::Tx) {
            bits |= 0x1;
        }
        if s.link_core_locked(Direction::Tx) {
            bits |= 0x2;
        }
        Ok(StatusBits(bits))
    }
}

struct SimRxConverter(Rc<RefCell<SimState>>);

impl RxConverter for SimRxConverter {
    fn configure(&mut self, _config: &ConverterConfig) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.hardware_writes += 1;
        if s.faults.rx_converter_nack {
            return Err(BringupError::bus(s.chip_select_adc, "no acknowledgment"));
        }
        s.rx.converter_configured = true;
        Ok(())
    }

    fn set_test_mode(&mut self, mode: AdcTestMode) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.hardware_writes += 1;
        s.adc_test_mode = mode;
        Ok(())
    }

    fn read_status(&mut self) -> Result<StatusBits> {
        let s = self.0.borrow();
        let mut bits = 0;
        if s.phy_locked(Direction::Rx) {
            bits |= 0x1;
        }
        if s.link_core_locked(Direction::Rx) {
            bits |= 0x2;
        }
        Ok(StatusBits(bits))
    }
}

struct SimLinkLayer {
    state: Rc<RefCell<SimState>>,
    direction: Direction,
}

impl LinkCore for SimLinkLayer {
    fn configure(&mut self, _params: &LinkParams) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.hardware_writes += 1;
        s.side_mut(self.direction).link_core_configured = true;
        Ok(())
    }

    fn lock_status(&mut self) -> Result<bool> {
        Ok(self.state.borrow().link_core_locked(self.direction))
    }
}

struct SimXcvr {
    state: Rc<RefCell<SimState>>,
    direction: Direction,
}

impl Transceiver for SimXcvr {
    fn configure(&mut self, _params: &LinkParams) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.hardware_writes += 1;
        // Training reads framing parameters out of the link-layer core;
        // configuring the PHY first is a sequencing bug.
        if !s.side(self.direction).link_core_configured {
            return Err(BringupError::device_config(
                format!("{} transceiver", self.direction),
                "link-layer core not configured",
            ));
        }
        s.side_mut(self.direction).xcvr_configured = true;
        Ok(())
    }

    fn train(&mut self) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.hardware_writes += 1;
        if !s.side(self.direction).xcvr_configured {
            return Err(BringupError::device_config(
                format!("{} transceiver", self.direction),
                "train issued before configuration",
            ));
        }
        let now = s.now_ms;
        s.side_mut(self.direction).trained_at_ms = Some(now);
        Ok(())
    }

    fn lock_status(&mut self) -> Result<bool> {
        Ok(self.state.borrow().phy_locked(self.direction))
    }
}

struct SimTxCore(Rc<RefCell<SimState>>);

impl TxCore for SimTxCore {
    fn set_source(&mut self, _channel: Option<usize>, source: DacSource) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.hardware_writes += 1;
        s.dac_source = source;
        Ok(())
    }
}

struct SimRxCore(Rc<RefCell<SimState>>);

impl RxCore for SimRxCore {
    fn pattern_monitor(&mut self, monitor: PnMonitor) -> Result<u32> {
        let s = self.0.borrow();
        if s.faults.rx_monitor_fault {
            return Err(BringupError::device_config(
                "rx sample core",
                "pn monitor readback failed",
            ));
        }
        let expected_mode = match monitor {
            PnMonitor::Pn9 => AdcTestMode::Pn9,
            PnMonitor::Pn23a => AdcTestMode::Pn23,
        };
        if s.adc_test_mode != expected_mode {
            // Monitor sees live (or wrong-polynomial) samples.
            return Ok(u32::MAX);
        }
        Ok(s.faults.rx_pn_mismatches)
    }
}

struct SimDma {
    state: Rc<RefCell<SimState>>,
    direction: Direction,
}

impl DmaEngine for SimDma {
    fn bind(&mut self, descriptor: &TransferDescriptor) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.hardware_writes += 1;
        match self.direction {
            Direction::Tx => s.tx_dma_bound = Some(*descriptor),
            Direction::Rx => s.rx_dma_bound = Some(*descriptor),
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let mut s = self.state.borrow_mut();
        s.hardware_writes += 1;
        let (bound, active) = match self.direction {
            Direction::Tx => (s.tx_dma_bound.is_some(), &mut s.tx_dma_active),
            Direction::Rx => (s.rx_dma_bound.is_some(), &mut s.rx_dma_active),
        };
        if *active {
            return Err(BringupError::DmaBusy {
                direction: self.direction,
            });
        }
        if !bound {
            return Err(BringupError::device_config(
                format!("{} dma", self.direction),
                "no transfer descriptor bound",
            ));
        }
        *active = true;
        Ok(())
    }
}
