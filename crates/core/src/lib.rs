//! # ads129x-core
//!
//! Cycle-accurate timing model of a daisy-chained group of ADS1298/ADS1299
//! analog front ends running in read-data-continuous mode (v0.3.0).
//!
//! Models the control/timing boundary of the chain — the START control,
//! serial clock input, serial data output, active-low data-ready line, and
//! an auxiliary frame-error flag — and reproduces the tick-exact cycle
//! counts at which each output changes relative to the internal sampling
//! clock and the host-supplied serial clock. It exists so an acquisition
//! pipeline (the circuit or software that drives SCLK and reads DOUT) can
//! be validated without silicon. The data content is a synthetic
//! free-running mod-256 counter, not analog samples; command decoding,
//! chip select, and register access are not modeled — the chain behaves as
//! an always-selected device streaming unsolicited data.
//!
//! ## Architecture
//!
//! - [`AdsChain`] — Top-level model wiring all components behind the
//!   signal-step interface
//! - [`ChainConfig`] — Chain length / data rate and the derived phase limits
//! - [`conversion`] — Conversion-phase state machine
//!   (Idle/Settling/DataReady/DataUpdating)
//! - [`shifter`] — Serial shift engine with the free-running byte pattern
//! - [`drdy`] — Read-start monitor forcing DRDY high once a read begins
//! - [`savestate`] — Compressed save states for parking long scenarios
//! - [`snapshot`] — Rewind ring buffer
//! - [`trace`] — VCD waveform tracing of the boundary signals
//!
//! ## Clock domains
//!
//! Two independent edge streams drive the model: the internal sampling
//! clock ([`AdsChain::tick_mclk`]) and the host serial clock
//! ([`AdsChain::sclk_rising`] / [`AdsChain::sclk_falling`]), plus the
//! asynchronous START level ([`AdsChain::set_start`]). The domains
//! exchange exactly one level — "a DataReady window is open". Every edge
//! is processed as an atomic step: next-state values are computed from the
//! state sampled at the top of the step and committed together, and a
//! window closing resets the serial domain's counters in the same step.
//! The embedding harness is responsible for delivering edges in time
//! order; the model keeps no timers beyond its phase tick counters.

pub mod conversion;
pub mod drdy;
pub mod savestate;
pub mod shifter;
pub mod snapshot;
pub mod timing;
pub mod trace;

pub use conversion::{ConversionFsm, ConversionState};
pub use drdy::DrdyMonitor;
pub use savestate::SaveState;
pub use shifter::ShiftEngine;
pub use snapshot::{RewindBuffer, Snapshot};
pub use timing::{
    ChainConfig, DEFAULT_DEVICES, DEFAULT_SAMPLE_RATE, FRAME_BYTES_PER_DEVICE, UPDATE_TICKS,
};
pub use trace::{TraceSample, VcdTrace};

/// Output pins, sampled after any step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    /// Serial data out (MSB-first within each byte).
    pub dout: bool,
    /// Active-low data ready: true = no new data to read.
    pub drdy_low: bool,
    /// Active-high error flag from the most recently completed window.
    pub error: bool,
}

/// Main daisy-chain model combining all subsystems.
pub struct AdsChain {
    config: ChainConfig,
    fsm: ConversionFsm,
    shifter: ShiftEngine,
    monitor: DrdyMonitor,
    /// Current START control level.
    start: bool,
    /// Elapsed internal-clock ticks since power-on (diagnostics only).
    mclk_ticks: u64,
    /// Enable per-window diagnostics on stderr.
    pub debug: bool,
    /// Debug counter: completed DataReady windows since power-on.
    pub dbg_windows: u64,
    /// Debug counter: completed windows that latched the error flag.
    pub dbg_error_windows: u64,
    /// Debug counter: serial bits shifted out since power-on.
    pub dbg_bits_shifted: u64,
}

impl AdsChain {
    /// Create a chain model from a validated configuration, with all
    /// components in power-on state.
    pub fn new(config: ChainConfig) -> Self {
        AdsChain {
            config,
            fsm: ConversionFsm::new(config.settle_ticks(), config.ready_ticks()),
            shifter: ShiftEngine::new(config.frame_bytes()),
            monitor: DrdyMonitor::new(),
            start: false,
            mclk_ticks: 0,
            debug: false,
            dbg_windows: 0,
            dbg_error_windows: 0,
            dbg_bits_shifted: 0,
        }
    }

    pub fn config(&self) -> ChainConfig {
        self.config
    }

    /// Reset everything to power-on state, including the pattern byte.
    pub fn reset(&mut self) {
        self.fsm = ConversionFsm::new(self.config.settle_ticks(), self.config.ready_ticks());
        self.shifter.reset();
        self.monitor.clear();
        self.start = false;
        self.mclk_ticks = 0;
        self.dbg_windows = 0;
        self.dbg_error_windows = 0;
        self.dbg_bits_shifted = 0;
    }

    /// Drive the START control level.
    ///
    /// Deassertion acts as an asynchronous reset: it takes effect in the
    /// same step, not at the next internal-clock edge.
    pub fn set_start(&mut self, level: bool) {
        self.start = level;
        if !level {
            self.fsm.force_idle();
            self.sync_gate();
        }
    }

    /// Internal sampling clock rising edge.
    pub fn tick_mclk(&mut self) {
        // Sample the serial domain before the state machine commits; the
        // error latch must see the window exactly as it ended.
        let bytes = self.shifter.byte_count();
        let bit_pos = self.shifter.bit_pos();
        let frame_complete = self.shifter.frame_complete();
        let was_ready = self.fsm.data_ready();

        self.fsm.tick(self.start, frame_complete);
        self.mclk_ticks = self.mclk_ticks.wrapping_add(1);

        if was_ready && self.fsm.state() == ConversionState::DataUpdating {
            self.dbg_windows += 1;
            if self.fsm.error() {
                self.dbg_error_windows += 1;
            }
            if self.debug {
                eprintln!(
                    "[ads129x] window {}: {}/{} bytes, bit {}, error={}",
                    self.dbg_windows,
                    bytes,
                    self.config.frame_bytes(),
                    bit_pos,
                    self.fsm.error()
                );
            }
        }

        self.sync_gate();
    }

    /// Serial clock rising edge (host shifts one bit).
    pub fn sclk_rising(&mut self) {
        let gate = self.fsm.data_ready();
        self.shifter.sclk_rising(gate);
        if gate {
            self.dbg_bits_shifted += 1;
        }
    }

    /// Serial clock falling edge (read-start detection).
    pub fn sclk_falling(&mut self) {
        self.monitor.sclk_falling(self.fsm.data_ready());
    }

    /// A window closing (or never being open) clears the serial-domain
    /// counters in the same step, independent of serial-clock edges.
    fn sync_gate(&mut self) {
        if !self.fsm.data_ready() {
            self.shifter.clear();
            self.monitor.clear();
        }
    }

    // ─── Output composition (combinational) ─────────────────────────────

    /// All output pins at once.
    pub fn outputs(&self) -> Outputs {
        Outputs {
            dout: self.dout(),
            drdy_low: self.drdy_low(),
            error: self.error(),
        }
    }

    /// Serial data out. Forced low outside a DataReady window.
    pub fn dout(&self) -> bool {
        self.fsm.data_ready() && self.shifter.dout()
    }

    /// Active-low data ready. High during Settling and DataUpdating, and
    /// from the moment the host starts reading a window. Idle reports
    /// low ("ready") — the real part behaves the same before START.
    pub fn drdy_low(&self) -> bool {
        matches!(
            self.fsm.state(),
            ConversionState::Settling | ConversionState::DataUpdating
        ) || self.monitor.read_started()
    }

    /// Frame-error flag from the most recently completed window. Held low
    /// while START is deasserted.
    pub fn error(&self) -> bool {
        self.fsm.error()
    }

    pub fn conversion_state(&self) -> ConversionState {
        self.fsm.state()
    }

    pub fn start(&self) -> bool {
        self.start
    }

    pub fn mclk_ticks(&self) -> u64 {
        self.mclk_ticks
    }

    /// Boundary signals for VCD tracing.
    pub fn trace_sample(&self) -> TraceSample {
        TraceSample {
            start: self.start,
            drdy_low: self.drdy_low(),
            dout: self.dout(),
            error: self.error(),
            state: self.fsm.state().code(),
        }
    }

    // ─── Save / restore ─────────────────────────────────────────────────

    /// Capture the full model state.
    pub fn save_state(&self) -> SaveState {
        SaveState {
            devices: self.config.devices,
            sample_rate: self.config.sample_rate,
            start: self.start,
            mclk_ticks: self.mclk_ticks,
            fsm: self.fsm.save_state(),
            shifter: self.shifter.save_state(),
            monitor: self.monitor.save_state(),
            dbg_windows: self.dbg_windows,
            dbg_error_windows: self.dbg_error_windows,
            dbg_bits_shifted: self.dbg_bits_shifted,
        }
    }

    /// Restore from a captured state. The state must come from a model
    /// with the same configuration.
    pub fn load_state(&mut self, s: &SaveState) -> Result<(), String> {
        if s.devices != self.config.devices || s.sample_rate != self.config.sample_rate {
            return Err(format!(
                "Configuration mismatch: save={}dev@{}sps current={}dev@{}sps",
                s.devices, s.sample_rate, self.config.devices, self.config.sample_rate
            ));
        }
        let state = ConversionState::from_code(s.fsm.state)
            .ok_or_else(|| format!("Invalid conversion state code {}", s.fsm.state))?;
        self.fsm.load_state(state, s.fsm.phase_ticks, s.fsm.error);
        self.shifter.load_state(&s.shifter);
        self.monitor.load_state(&s.monitor);
        self.start = s.start;
        self.mclk_ticks = s.mclk_ticks;
        self.dbg_windows = s.dbg_windows;
        self.dbg_error_windows = s.dbg_error_windows;
        self.dbg_bits_shifted = s.dbg_bits_shifted;
        Ok(())
    }

    /// Capture a cheap in-memory snapshot for rewind.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            start: self.start,
            mclk_ticks: self.mclk_ticks,
            state: self.fsm.state().code(),
            phase_ticks: self.fsm.phase_ticks(),
            error: self.fsm.error(),
            pattern: self.shifter.pattern(),
            byte_count: self.shifter.byte_count(),
            bit_pos: self.shifter.bit_pos(),
            dout: self.shifter.dout(),
            read_started: self.monitor.read_started(),
            window: self.dbg_windows,
        }
    }

    /// Restore from a rewind snapshot.
    pub fn restore(&mut self, snap: &Snapshot) -> Result<(), String> {
        let state = ConversionState::from_code(snap.state)
            .ok_or_else(|| format!("Invalid conversion state code {}", snap.state))?;
        self.fsm.load_state(state, snap.phase_ticks, snap.error);
        self.shifter.load_state(&savestate::ShifterState {
            pattern: snap.pattern,
            byte_count: snap.byte_count,
            bit_pos: snap.bit_pos,
            dout: snap.dout,
        });
        self.monitor.load_state(&savestate::MonitorState {
            read_started: snap.read_started,
        });
        self.start = snap.start;
        self.mclk_ticks = snap.mclk_ticks;
        self.dbg_windows = snap.window;
        Ok(())
    }
}

impl Default for AdsChain {
    fn default() -> Self {
        AdsChain::new(ChainConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chain(devices: u32, rate: u32) -> AdsChain {
        AdsChain::new(ChainConfig::new(devices, rate).unwrap())
    }

    /// Tick through start assertion and settling into the first window.
    fn open_first_window(chain: &mut AdsChain) {
        chain.set_start(true);
        for _ in 0..=chain.config().settle_ticks() {
            chain.tick_mclk();
        }
        assert_eq!(chain.conversion_state(), ConversionState::DataReady);
    }

    /// Clock out one byte MSB-first with full serial-clock cycles.
    fn read_byte(chain: &mut AdsChain) -> u8 {
        let mut byte = 0u8;
        for _ in 0..8 {
            chain.sclk_rising();
            byte = (byte << 1) | chain.dout() as u8;
            chain.sclk_falling();
        }
        byte
    }

    #[test]
    fn test_idle_reports_ready() {
        // Before START the composed data-ready output reads "ready"; the
        // level formula deliberately excludes Idle.
        let chain = make_chain(1, 4000);
        assert!(!chain.drdy_low());
        assert!(!chain.dout());
        assert!(!chain.error());
    }

    #[test]
    fn test_settle_time_exact() {
        let mut chain = make_chain(1, 4000);
        let settle = chain.config().settle_ticks(); // 2057 at 4000 sps
        chain.set_start(true);
        chain.tick_mclk(); // Idle -> Settling
        assert!(chain.drdy_low());
        for _ in 0..settle - 1 {
            chain.tick_mclk();
            assert!(chain.drdy_low());
        }
        chain.tick_mclk();
        assert_eq!(chain.conversion_state(), ConversionState::DataReady);
        assert!(!chain.drdy_low());
    }

    #[test]
    fn test_unread_window_period() {
        let mut chain = make_chain(1, 4000);
        let ready = chain.config().ready_ticks(); // 508 at 4000 sps
        open_first_window(&mut chain);

        // two full periods: ready for `ready` ticks, high for 4
        for _ in 0..2 {
            for _ in 0..ready - 1 {
                chain.tick_mclk();
                assert!(!chain.drdy_low());
            }
            chain.tick_mclk();
            assert_eq!(chain.conversion_state(), ConversionState::DataUpdating);
            for _ in 0..UPDATE_TICKS - 1 {
                assert!(chain.drdy_low());
                chain.tick_mclk();
            }
            assert!(chain.drdy_low());
            chain.tick_mclk();
            assert_eq!(chain.conversion_state(), ConversionState::DataReady);
            assert!(!chain.drdy_low());
        }
    }

    #[test]
    fn test_continuous_byte_stream_across_windows() {
        let mut chain = make_chain(1, 4000);
        let ready = chain.config().ready_ticks();
        open_first_window(&mut chain);

        for b in 0..27u8 {
            assert_eq!(read_byte(&mut chain), b);
        }
        // exact frame: no error at the forced transition
        for _ in 0..ready {
            chain.tick_mclk();
        }
        assert_eq!(chain.conversion_state(), ConversionState::DataUpdating);
        assert!(!chain.error());
        for _ in 0..UPDATE_TICKS {
            chain.tick_mclk();
        }
        assert_eq!(chain.conversion_state(), ConversionState::DataReady);

        // the pattern continues where it left off
        for b in 27..54u8 {
            assert_eq!(read_byte(&mut chain), b);
        }
    }

    #[test]
    fn test_error_short_read() {
        let mut chain = make_chain(1, 4000);
        let ready = chain.config().ready_ticks();
        open_first_window(&mut chain);
        for _ in 0..26 {
            read_byte(&mut chain);
        }
        for _ in 0..ready {
            chain.tick_mclk();
        }
        assert!(chain.error());
    }

    #[test]
    fn test_error_midbyte_stop() {
        let mut chain = make_chain(1, 4000);
        let ready = chain.config().ready_ticks();
        open_first_window(&mut chain);
        // all 27 bytes plus 3 stray bits: the count matches but the byte
        // boundary does not
        for _ in 0..27 {
            read_byte(&mut chain);
        }
        for _ in 0..3 {
            chain.sclk_rising();
            chain.sclk_falling();
        }
        for _ in 0..ready {
            chain.tick_mclk();
        }
        assert!(chain.error());
    }

    #[test]
    fn test_error_clears_at_next_complete_window() {
        let mut chain = make_chain(1, 4000);
        let ready = chain.config().ready_ticks();
        open_first_window(&mut chain);

        // unread window latches the error
        for _ in 0..ready + UPDATE_TICKS {
            chain.tick_mclk();
        }
        assert!(chain.error());
        assert_eq!(chain.conversion_state(), ConversionState::DataReady);

        // complete read in the next window clears it at that boundary
        for _ in 0..27 {
            read_byte(&mut chain);
        }
        for _ in 0..ready - 1 {
            chain.tick_mclk();
            assert!(chain.error()); // still the previous window's verdict
        }
        chain.tick_mclk();
        assert!(!chain.error());
    }

    #[test]
    fn test_over_read_by_whole_bytes_is_clean() {
        let mut chain = make_chain(1, 4000);
        let ready = chain.config().ready_ticks();
        open_first_window(&mut chain);
        for _ in 0..28 {
            read_byte(&mut chain);
        }
        for _ in 0..ready {
            chain.tick_mclk();
        }
        assert!(!chain.error());
    }

    #[test]
    fn test_start_deassert_is_immediate() {
        let mut chain = make_chain(1, 4000);
        open_first_window(&mut chain);
        read_byte(&mut chain);
        assert!(chain.drdy_low()); // read started, DRDY already high

        chain.set_start(false);
        // same step, no clock edge needed
        assert_eq!(chain.conversion_state(), ConversionState::Idle);
        assert!(!chain.drdy_low());
        assert!(!chain.dout());
        assert!(!chain.error());

        // and it stays idle under further ticks
        for _ in 0..100 {
            chain.tick_mclk();
            assert_eq!(chain.conversion_state(), ConversionState::Idle);
        }
    }

    #[test]
    fn test_start_deassert_clears_latched_error() {
        let mut chain = make_chain(1, 4000);
        let ready = chain.config().ready_ticks();
        open_first_window(&mut chain);
        for _ in 0..ready {
            chain.tick_mclk();
        }
        assert!(chain.error());
        chain.set_start(false);
        assert!(!chain.error());
    }

    #[test]
    fn test_first_falling_edge_raises_drdy() {
        let mut chain = make_chain(1, 4000);
        open_first_window(&mut chain);
        assert!(!chain.drdy_low());

        chain.sclk_falling();
        assert!(chain.drdy_low());

        // sticky for the rest of the window, and shifting still works
        assert_eq!(read_byte(&mut chain), 0x00);
        assert!(chain.drdy_low());
    }

    #[test]
    fn test_serial_edges_outside_window_ignored() {
        let mut chain = make_chain(1, 4000);
        chain.set_start(true);
        chain.tick_mclk(); // Settling
        for _ in 0..16 {
            chain.sclk_rising();
            chain.sclk_falling();
        }
        assert!(!chain.dout());
        assert_eq!(chain.dbg_bits_shifted, 0);

        // the falling edges during Settling must not pre-arm the monitor
        let remaining = chain.config().settle_ticks() - 1;
        for _ in 0..=remaining {
            chain.tick_mclk();
        }
        assert_eq!(chain.conversion_state(), ConversionState::DataReady);
        assert!(!chain.drdy_low());
        // and the pattern still starts at 0
        assert_eq!(read_byte(&mut chain), 0x00);
    }

    #[test]
    fn test_pattern_free_runs_across_start_deassert() {
        let mut chain = make_chain(1, 4000);
        open_first_window(&mut chain);
        for b in 0..5u8 {
            assert_eq!(read_byte(&mut chain), b);
        }
        chain.set_start(false);
        open_first_window(&mut chain);
        // window counters were cleared, the pattern byte was not
        assert_eq!(read_byte(&mut chain), 0x05);
    }

    #[test]
    fn test_multi_device_frame_size() {
        let mut chain = make_chain(3, 4000);
        let ready = chain.config().ready_ticks();
        assert_eq!(chain.config().frame_bytes(), 81);
        open_first_window(&mut chain);
        for _ in 0..81 {
            read_byte(&mut chain);
        }
        for _ in 0..ready {
            chain.tick_mclk();
        }
        assert!(!chain.error());
        assert_eq!(chain.dbg_windows, 1);
    }

    #[test]
    fn test_save_state_resumes_identically() {
        let mut chain = make_chain(2, 4000);
        open_first_window(&mut chain);
        for _ in 0..10 {
            read_byte(&mut chain);
        }
        for _ in 0..100 {
            chain.tick_mclk();
        }

        let saved = chain.save_state();
        let mut resumed = make_chain(2, 4000);
        resumed.load_state(&saved).unwrap();
        assert_eq!(resumed.outputs(), chain.outputs());

        // both continue in lockstep
        for _ in 0..2000 {
            chain.tick_mclk();
            resumed.tick_mclk();
            assert_eq!(resumed.outputs(), chain.outputs());
            assert_eq!(resumed.conversion_state(), chain.conversion_state());
        }
    }

    #[test]
    fn test_load_state_config_mismatch() {
        let mut chain = make_chain(2, 4000);
        let saved = chain.save_state();
        let mut other = make_chain(4, 4000);
        assert!(other.load_state(&saved).is_err());
        chain.load_state(&saved).unwrap();
    }

    #[test]
    fn test_snapshot_rewind() {
        let mut chain = make_chain(1, 4000);
        open_first_window(&mut chain);
        let snap = chain.snapshot();

        for _ in 0..5 {
            read_byte(&mut chain);
        }
        for _ in 0..50 {
            chain.tick_mclk();
        }

        chain.restore(&snap).unwrap();
        assert_eq!(chain.conversion_state(), ConversionState::DataReady);
        assert_eq!(read_byte(&mut chain), 0x00);
    }

    #[test]
    fn test_reset_returns_to_power_on() {
        let mut chain = make_chain(1, 4000);
        open_first_window(&mut chain);
        for _ in 0..5 {
            read_byte(&mut chain);
        }
        chain.reset();
        assert_eq!(chain.conversion_state(), ConversionState::Idle);
        assert!(!chain.start());
        assert_eq!(chain.mclk_ticks(), 0);
        open_first_window(&mut chain);
        assert_eq!(read_byte(&mut chain), 0x00);
    }

    #[test]
    fn test_default_config() {
        let chain = AdsChain::default();
        assert_eq!(chain.config().devices, DEFAULT_DEVICES);
        assert_eq!(chain.config().sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(chain.config().frame_bytes(), 27 * 8);
    }

    #[test]
    fn test_window_counters() {
        let mut chain = make_chain(1, 4000);
        let ready = chain.config().ready_ticks();
        open_first_window(&mut chain);
        for _ in 0..3 {
            for _ in 0..ready + UPDATE_TICKS {
                chain.tick_mclk();
            }
        }
        assert_eq!(chain.dbg_windows, 3);
        assert_eq!(chain.dbg_error_windows, 3); // nothing was read
    }
}
