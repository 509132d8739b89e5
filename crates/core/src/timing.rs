//! Chain configuration and conversion-phase timing parameters.
//!
//! All phase durations are expressed in ticks of the fixed internal
//! sampling clock (fCLK). The settle and ready windows scale inversely with
//! the programmed data rate; the post-window update pause is a fixed four
//! ticks regardless of rate.

/// Ticks spent in the DataUpdating pause between two DataReady windows.
pub const UPDATE_TICKS: u32 = 4;

/// Bytes one device contributes to a frame: 3 status + 8 channels × 3 bytes.
pub const FRAME_BYTES_PER_DEVICE: u64 = 27;

/// Default daisy-chain length.
pub const DEFAULT_DEVICES: u32 = 8;
/// Default data rate in samples per second.
pub const DEFAULT_SAMPLE_RATE: u32 = 4000;

/// Highest data rate for which the DataReady window is at least one tick.
/// `floor(2^11 * 1000 / DR) - 4 >= 1` requires DR <= 409600.
pub const MAX_SAMPLE_RATE: u32 = 409_600;

/// Immutable daisy-chain configuration: chain length and data rate.
///
/// Validated once at construction; every phase limit is derived from these
/// two values and never changes while the model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    /// Number of devices in the daisy chain (DOUT of device k wired to
    /// DAISY_IN of device k+1).
    pub devices: u32,
    /// Data rate in samples per second.
    pub sample_rate: u32,
}

impl ChainConfig {
    /// Create a validated configuration.
    pub fn new(devices: u32, sample_rate: u32) -> Result<Self, String> {
        if devices == 0 {
            return Err("chain length must be at least 1 device".into());
        }
        if sample_rate == 0 {
            return Err("sample rate must be at least 1 sps".into());
        }
        if sample_rate > MAX_SAMPLE_RATE {
            return Err(format!(
                "sample rate {} sps leaves no DataReady window (max {})",
                sample_rate, MAX_SAMPLE_RATE
            ));
        }
        Ok(ChainConfig { devices, sample_rate })
    }

    /// Settle/conversion latency after start assertion, in fCLK ticks:
    /// `floor(2^13 * 1000 / DR) + 9`.
    pub fn settle_ticks(&self) -> u32 {
        8_192_000 / self.sample_rate + 9
    }

    /// Length of one DataReady window, in fCLK ticks:
    /// `floor(2^11 * 1000 / DR) - 4`.
    pub fn ready_ticks(&self) -> u32 {
        2_048_000 / self.sample_rate - 4
    }

    /// Bytes the host is expected to read per window: 27 per device.
    pub fn frame_bytes(&self) -> u64 {
        FRAME_BYTES_PER_DEVICE * self.devices as u64
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            devices: DEFAULT_DEVICES,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate_limits() {
        let cfg = ChainConfig::default();
        // 4000 sps: settle = 8192000/4000 + 9, ready = 2048000/4000 - 4
        assert_eq!(cfg.settle_ticks(), 2057);
        assert_eq!(cfg.ready_ticks(), 508);
        assert_eq!(cfg.frame_bytes(), 27 * 8);
    }

    #[test]
    fn test_floor_division() {
        // 3000 sps does not divide evenly: floor(8192000/3000) = 2730
        let cfg = ChainConfig::new(1, 3000).unwrap();
        assert_eq!(cfg.settle_ticks(), 2730 + 9);
        assert_eq!(cfg.ready_ticks(), 682 - 4);
    }

    #[test]
    fn test_rejects_zero_devices() {
        assert!(ChainConfig::new(0, 4000).is_err());
    }

    #[test]
    fn test_rejects_zero_rate() {
        assert!(ChainConfig::new(8, 0).is_err());
    }

    #[test]
    fn test_rejects_rate_above_window_limit() {
        assert!(ChainConfig::new(1, MAX_SAMPLE_RATE).is_ok());
        assert!(ChainConfig::new(1, MAX_SAMPLE_RATE + 1).is_err());
    }

    #[test]
    fn test_single_device_frame() {
        let cfg = ChainConfig::new(1, 4000).unwrap();
        assert_eq!(cfg.frame_bytes(), 27);
    }
}
