//! Per-direction link bring-up state machine.
//!
//! ```text
//! Idle → SpiConfigured → LinkCoreConfigured → PhyTrained → Locked
//!                                                        ↘ Failed
//! ```
//!
//! Two ordering rules are load-bearing: the converter must be configured
//! over SPI before the FPGA cores, and the link-layer core must be
//! configured before the transceiver — the transceiver's training
//! sequence reads the framing parameters the link layer has latched.
//!
//! There is no automatic retry: training is issued once, followed by a
//! fixed settle and a single status sample of both lock sources. Retry
//! from `Failed` is a caller decision; `train` may be re-issued from
//! `Failed` and behaves identically.

use std::time::Duration;

use daq2_board::LinkParams;
use tracing::{debug, info, warn};

use crate::error::{BringupError, Result};
use crate::hal::{Delay, LinkCore, Transceiver};

/// Settle time between issuing transceiver training and sampling lock
/// status.
pub const TRAIN_SETTLE: Duration = Duration::from_millis(10);

/// Bring-up state of one link direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing configured yet.
    Idle,
    /// Converter accepted its SPI configuration.
    SpiConfigured,
    /// Link-layer and transceiver cores configured, in that order.
    LinkCoreConfigured,
    /// Training issued and settle elapsed.
    PhyTrained,
    /// Both the transceiver and the link layer report lock.
    Locked,
    /// At least one lock source reported unlocked.
    Failed,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::SpiConfigured => "SpiConfigured",
            Self::LinkCoreConfigured => "LinkCoreConfigured",
            Self::PhyTrained => "PhyTrained",
            Self::Locked => "Locked",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// One direction's FPGA-side link: the link-layer core, the transceiver,
/// and the state machine that orders their configuration.
pub struct LinkEndpoint {
    /// Link parameters for this direction.
    pub params: LinkParams,
    state: LinkState,
    link_core: Box<dyn LinkCore>,
    xcvr: Box<dyn Transceiver>,
}

impl std::fmt::Debug for LinkEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkEndpoint")
            .field("params", &self.params)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LinkEndpoint {
    /// Create an endpoint in `Idle`.
    pub fn new(
        params: LinkParams,
        link_core: Box<dyn LinkCore>,
        xcvr: Box<dyn Transceiver>,
    ) -> Self {
        Self {
            params,
            state: LinkState::Idle,
            link_core,
            xcvr,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LinkState {
        self.state
    }

    /// Whether the link reached `Locked`.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self.state, LinkState::Locked)
    }

    /// Record that the converter accepted its SPI configuration.
    ///
    /// # Errors
    ///
    /// `IllegalState` unless the endpoint is `Idle`.
    pub fn spi_configured(&mut self) -> Result<()> {
        if self.state != LinkState::Idle {
            return Err(BringupError::illegal_state("spi_configured", self.state));
        }
        self.state = LinkState::SpiConfigured;
        Ok(())
    }

    /// Configure the FPGA-side cores: link layer first, transceiver
    /// second.
    ///
    /// # Errors
    ///
    /// `IllegalState` unless called from `SpiConfigured`; otherwise the
    /// core drivers' errors.
    pub fn configure_cores(&mut self) -> Result<()> {
        if self.state != LinkState::SpiConfigured {
            return Err(BringupError::illegal_state("configure_cores", self.state));
        }
        self.link_core.configure(&self.params)?;
        self.xcvr.configure(&self.params)?;
        self.state = LinkState::LinkCoreConfigured;
        debug!(
            "{} cores configured: {} kbps, F={}, K={}",
            self.params.direction,
            self.params.lane_rate_kbps,
            self.params.octets_per_frame,
            self.params.frames_per_multiframe
        );
        Ok(())
    }

    /// Issue transceiver training and wait the fixed settle.
    ///
    /// Valid from `LinkCoreConfigured`, and from `Failed` for a
    /// caller-driven retry.
    ///
    /// # Errors
    ///
    /// `IllegalState` from any other state; otherwise the transceiver
    /// driver's error.
    pub fn train(&mut self, delay: &mut dyn Delay) -> Result<()> {
        match self.state {
            LinkState::LinkCoreConfigured | LinkState::Failed => {}
            other => return Err(BringupError::illegal_state("train", other)),
        }
        self.xcvr.train()?;
        delay.sleep(TRAIN_SETTLE);
        self.state = LinkState::PhyTrained;
        Ok(())
    }

    /// Sample both lock sources once and settle into `Locked` or
    /// `Failed`.
    ///
    /// `Locked` requires the transceiver **and** the link-layer core to
    /// report lock in this same attempt.
    ///
    /// # Errors
    ///
    /// `IllegalState` unless the endpoint is `PhyTrained`; otherwise the
    /// drivers' readback errors.
    pub fn check_lock(&mut self) -> Result<bool> {
        if self.state != LinkState::PhyTrained {
            return Err(BringupError::illegal_state("check_lock", self.state));
        }
        let phy = self.xcvr.lock_status()?;
        let link = self.link_core.lock_status()?;
        if phy && link {
            self.state = LinkState::Locked;
            info!("{} link locked", self.params.direction);
        } else {
            self.state = LinkState::Failed;
            warn!(
                "{} link failed to lock (phy: {}, link layer: {})",
                self.params.direction, phy, link
            );
        }
        Ok(self.is_locked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BringupError;

    struct StubCore {
        lock: bool,
    }
    impl LinkCore for StubCore {
        fn configure(&mut self, _params: &LinkParams) -> Result<()> {
            Ok(())
        }
        fn lock_status(&mut self) -> Result<bool> {
            Ok(self.lock)
        }
    }

    struct StubXcvr {
        lock: bool,
        trained: u32,
    }
    impl Transceiver for StubXcvr {
        fn configure(&mut self, _params: &LinkParams) -> Result<()> {
            Ok(())
        }
        fn train(&mut self) -> Result<()> {
            self.trained += 1;
            Ok(())
        }
        fn lock_status(&mut self) -> Result<bool> {
            Ok(self.lock)
        }
    }

    struct NoDelay;
    impl Delay for NoDelay {
        fn sleep(&mut self, _d: Duration) {}
    }

    fn endpoint(phy_lock: bool, link_lock: bool) -> LinkEndpoint {
        LinkEndpoint::new(
            LinkParams::fmcdaq2_tx(),
            Box::new(StubCore { lock: link_lock }),
            Box::new(StubXcvr {
                lock: phy_lock,
                trained: 0,
            }),
        )
    }

    fn walk_to_trained(ep: &mut LinkEndpoint) {
        ep.spi_configured().unwrap();
        ep.configure_cores().unwrap();
        ep.train(&mut NoDelay).unwrap();
    }

    #[test]
    fn locks_only_when_both_sources_lock() {
        for (phy, link, expect) in [
            (true, true, true),
            (true, false, false),
            (false, true, false),
            (false, false, false),
        ] {
            let mut ep = endpoint(phy, link);
            walk_to_trained(&mut ep);
            assert_eq!(ep.check_lock().unwrap(), expect);
            assert_eq!(
                ep.state(),
                if expect {
                    LinkState::Locked
                } else {
                    LinkState::Failed
                }
            );
        }
    }

    #[test]
    fn retrain_allowed_from_failed() {
        let mut ep = endpoint(true, false);
        walk_to_trained(&mut ep);
        assert!(!ep.check_lock().unwrap());
        // Caller-driven retry: train again from Failed.
        ep.train(&mut NoDelay).unwrap();
        assert_eq!(ep.state(), LinkState::PhyTrained);
    }

    #[test]
    fn out_of_order_calls_rejected() {
        let mut ep = endpoint(true, true);
        assert!(matches!(
            ep.configure_cores(),
            Err(BringupError::IllegalState { .. })
        ));
        assert!(matches!(
            ep.check_lock(),
            Err(BringupError::IllegalState { .. })
        ));
        ep.spi_configured().unwrap();
        assert!(matches!(
            ep.train(&mut NoDelay),
            Err(BringupError::IllegalState { .. })
        ));
    }
}
