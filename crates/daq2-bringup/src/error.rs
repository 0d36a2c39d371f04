//! Error types for bring-up operations.

use daq2_board::Direction;
use thiserror::Error;

/// Result type alias for bring-up operations.
pub type Result<T> = std::result::Result<T, BringupError>;

/// Errors that can occur while bringing up the board.
#[derive(Debug, Error)]
pub enum BringupError {
    /// Malformed or inconsistent configuration, detected before any
    /// hardware write. Recoverable by correcting the configuration.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// A device did not accept its configuration.
    #[error("{device} rejected configuration: {reason}")]
    DeviceConfig {
        /// Which device.
        device: String,
        /// Reason for rejection.
        reason: String,
    },

    /// No acknowledgment on the control bus.
    #[error("no acknowledgment on control bus (cs {chip_select:#x}): {reason}")]
    Bus {
        /// Chip select of the unresponsive device.
        chip_select: u8,
        /// Transport-level detail.
        reason: String,
    },

    /// A self-test observed mismatching data. Non-fatal by default; the
    /// sequencer's policy decides the disposition.
    #[error("self-test {test} failed with {mismatches} mismatches")]
    SelfTest {
        /// Which test of the ladder failed.
        test: String,
        /// Observed mismatch count.
        mismatches: u32,
    },

    /// An operation was attempted in the wrong state machine state.
    /// Always a programming error, always fatal.
    #[error("{operation} attempted in state {state}")]
    IllegalState {
        /// The operation that was attempted.
        operation: String,
        /// The state it was attempted in.
        state: String,
    },

    /// A DMA transfer is already in flight. Recoverable by retrying
    /// after the current transfer completes.
    #[error("{direction} DMA transfer already in flight")]
    DmaBusy {
        /// Which data path.
        direction: Direction,
    },
}

impl BringupError {
    /// Create a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a device-configuration error.
    pub fn device_config(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceConfig {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create a bus error.
    pub fn bus(chip_select: u8, reason: impl Into<String>) -> Self {
        Self::Bus {
            chip_select,
            reason: reason.into(),
        }
    }

    /// Create a self-test failure.
    pub fn self_test(test: impl Into<String>, mismatches: u32) -> Self {
        Self::SelfTest {
            test: test.into(),
            mismatches,
        }
    }

    /// Create an illegal-state error.
    pub fn illegal_state(operation: impl Into<String>, state: impl std::fmt::Display) -> Self {
        Self::IllegalState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// True for the one category the sequencer may continue past.
    #[must_use]
    pub const fn is_self_test(&self) -> bool {
        matches!(self, Self::SelfTest { .. })
    }
}
