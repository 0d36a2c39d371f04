//! Per-direction JESD204B link and converter parameters.

/// Data-path direction, named from the FPGA's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// FPGA → DAC (transmit).
    Tx,
    /// ADC → FPGA (receive).
    Rx,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tx => f.write_str("tx"),
            Self::Rx => f.write_str("rx"),
        }
    }
}

/// JESD204B + SERDES parameters for one link direction.
///
/// `octets_per_frame` (F) and `frames_per_multiframe` (K) must match the
/// converter's operating mode; that consistency is a design-level
/// constraint and is not re-derived here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkParams {
    /// Raw per-lane serial rate in kbps.
    pub lane_rate_kbps: u64,
    /// Number of active converters on the link (M).
    pub converters: u32,
    /// Octets per frame per lane (F).
    pub octets_per_frame: u32,
    /// Frames per multiframe (K).
    pub frames_per_multiframe: u32,
    /// Which way the data flows.
    pub direction: Direction,
}

impl LinkParams {
    /// FMCDAQ2 transmit link: 10 Gbps lanes, 2 converters, F=1, K=32.
    #[must_use]
    pub const fn fmcdaq2_tx() -> Self {
        Self {
            lane_rate_kbps: 10_000_000,
            converters: 2,
            octets_per_frame: 1,
            frames_per_multiframe: 32,
            direction: Direction::Tx,
        }
    }

    /// FMCDAQ2 receive link: 10 Gbps lanes, 2 converters, F=1, K=32.
    #[must_use]
    pub const fn fmcdaq2_rx() -> Self {
        Self {
            lane_rate_kbps: 10_000_000,
            converters: 2,
            octets_per_frame: 1,
            frames_per_multiframe: 32,
            direction: Direction::Rx,
        }
    }
}

/// SPI-side configuration for one converter device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Per-lane serial rate the converter's SERDES must run at, kbps.
    pub lane_rate_kbps: u64,
    /// Active converter cores inside the device.
    pub active_converters: u32,
    /// Sample resolution in bits. Meaningful for the ADC (14 on FMCDAQ2);
    /// the DAC ignores it.
    pub resolution: u32,
}

impl ConverterConfig {
    /// Derive the converter configuration from the link parameters.
    #[must_use]
    pub const fn from_link(params: &LinkParams, resolution: u32) -> Self {
        Self {
            lane_rate_kbps: params.lane_rate_kbps,
            active_converters: params.converters,
            resolution,
        }
    }
}
