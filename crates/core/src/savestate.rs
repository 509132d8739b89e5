//! Save state (capture / restore) for the chain model.
//!
//! Captures the full model state to a file using bincode serialization
//! with deflate compression, so a harness can park a long-running timing
//! scenario and resume it later.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "ADSS"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Chain length N   |  u32 little-endian
//! +------------------+
//! | Sample rate DR   |  u32 little-endian
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```
//!
//! The configuration in the header must match the model the state is
//! loaded into; phase limits derive from it and a mismatched restore would
//! silently corrupt the timing.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::timing::ChainConfig;

/// Magic bytes identifying a chain-model save state file.
const MAGIC: &[u8; 4] = b"ADSS";
/// Current save state format version.
const FORMAT_VERSION: u32 = 1;

// ─── Per-component state structs ────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct FsmState {
    pub state: u8,
    pub phase_ticks: u32,
    pub error: bool,
}

#[derive(Serialize, Deserialize)]
pub struct ShifterState {
    pub pattern: u8,
    pub byte_count: u64,
    pub bit_pos: u8,
    pub dout: bool,
}

#[derive(Serialize, Deserialize)]
pub struct MonitorState {
    pub read_started: bool,
}

// ─── Top-level save state ───────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
pub struct SaveState {
    /// Configuration echo, re-checked on load.
    pub devices: u32,
    pub sample_rate: u32,

    // Signal-level state
    pub start: bool,
    pub mclk_ticks: u64,
    pub fsm: FsmState,
    pub shifter: ShifterState,
    pub monitor: MonitorState,

    // Diagnostics counters
    pub dbg_windows: u64,
    pub dbg_error_windows: u64,
    pub dbg_bits_shifted: u64,
}

// ─── File I/O ───────────────────────────────────────────────────────────────

/// Save state to file with header and deflate compression.
pub fn save_to_file(state: &SaveState, path: &Path) -> Result<(), String> {
    let payload = bincode::serialize(state)
        .map_err(|e| format!("Serialize error: {}", e))?;

    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(16 + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&state.devices.to_le_bytes());
    out.extend_from_slice(&state.sample_rate.to_le_bytes());
    out.extend_from_slice(&compressed);

    std::fs::write(path, &out)
        .map_err(|e| format!("Write error: {}", e))
}

/// Load state from file, verifying magic, version, and configuration.
pub fn load_from_file(path: &Path, expected: ChainConfig) -> Result<SaveState, String> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Read error: {}", e))?;

    if data.len() < 16 {
        return Err("File too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("Invalid save state file (bad magic)".into());
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(format!(
            "Unsupported save state version {} (expected {})",
            version, FORMAT_VERSION
        ));
    }
    let devices = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    let sample_rate = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);
    if devices != expected.devices || sample_rate != expected.sample_rate {
        return Err(format!(
            "Configuration mismatch: save={}dev@{}sps current={}dev@{}sps",
            devices, sample_rate, expected.devices, expected.sample_rate
        ));
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[16..])
        .map_err(|e| format!("Decompress error: {:?}", e))?;

    bincode::deserialize(&decompressed)
        .map_err(|e| format!("Deserialize error: {}", e))
}
