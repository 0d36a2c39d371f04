//! Streaming initiation: the hand-off from self-test to live DMA.

use daq2_board::DacSource;
use tracing::info;

use crate::error::{BringupError, Result};
use crate::hal::TransferDescriptor;
use crate::path::{RxPath, TxPath};

/// Switch the transmit path to the DMA source and start one playback
/// transfer from the pre-populated sample buffer.
///
/// # Errors
///
/// `IllegalState` when the link is not `Locked` — starting a transfer
/// into an untrained link is undefined behavior at the hardware level.
/// `DmaBusy` when a transfer is already in flight.
pub fn start_tx(path: &mut TxPath, descriptor: &TransferDescriptor) -> Result<()> {
    if !path.link.is_locked() {
        return Err(BringupError::illegal_state("start_tx", path.link.state()));
    }
    path.select_source(DacSource::Dma)?;
    path.dma.bind(descriptor)?;
    path.dma.start()?;
    info!("tx streaming: {} bytes from {:#x}", descriptor.length, descriptor.address);
    Ok(())
}

/// Start one capture transfer on the receive path. The converter's test
/// generator must already be off (the self-test ladder leaves it off).
///
/// # Errors
///
/// `IllegalState` when the link is not `Locked`; `DmaBusy` when a
/// transfer is already in flight.
pub fn start_rx(path: &mut RxPath, descriptor: &TransferDescriptor) -> Result<()> {
    if !path.link.is_locked() {
        return Err(BringupError::illegal_state("start_rx", path.link.state()));
    }
    path.dma.bind(descriptor)?;
    path.dma.start()?;
    info!("rx capture: {} bytes into {:#x}", descriptor.length, descriptor.address);
    Ok(())
}
