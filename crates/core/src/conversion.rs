//! Conversion-phase state machine.
//!
//! Advances once per internal-clock rising edge through the continuous
//! conversion cycle: Settling after start assertion, then alternating
//! DataReady windows and fixed four-tick DataUpdating pauses. The start
//! control acts as an asynchronous reset with priority over every timed
//! transition; while it is low the machine is pinned to Idle and the error
//! latch is held clear.
//!
//! The error latch is written exactly once per window, at the
//! DataReady→DataUpdating transition, from the frame-completion status the
//! shift engine reported for that window.

use crate::timing::UPDATE_TICKS;

/// Conversion cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    /// Start control low; no conversions running.
    Idle,
    /// Analog settling after start assertion, before the first sample.
    Settling,
    /// A sample frame is available for shifting out.
    DataReady,
    /// Dead time while the next sample replaces the frame buffer.
    DataUpdating,
}

impl ConversionState {
    /// Stable 2-bit encoding used by save states and traces.
    pub fn code(self) -> u8 {
        match self {
            ConversionState::Idle => 0,
            ConversionState::Settling => 1,
            ConversionState::DataReady => 2,
            ConversionState::DataUpdating => 3,
        }
    }

    /// Decode a [`code`](Self::code) value.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ConversionState::Idle),
            1 => Some(ConversionState::Settling),
            2 => Some(ConversionState::DataReady),
            3 => Some(ConversionState::DataUpdating),
            _ => None,
        }
    }
}

/// The four-state conversion engine for one daisy chain.
pub struct ConversionFsm {
    state: ConversionState,
    /// Ticks spent in the current phase (reset on every transition).
    phase_ticks: u32,
    /// Latched result of the most recently completed DataReady window.
    error: bool,
    settle_ticks: u32,
    ready_ticks: u32,
}

impl ConversionFsm {
    pub fn new(settle_ticks: u32, ready_ticks: u32) -> Self {
        ConversionFsm {
            state: ConversionState::Idle,
            phase_ticks: 0,
            error: false,
            settle_ticks,
            ready_ticks,
        }
    }

    /// Advance one internal-clock tick.
    ///
    /// `frame_complete` is the shift engine's status sampled at the top of
    /// the step; it is consulted only when this tick times out a DataReady
    /// window.
    pub fn tick(&mut self, start: bool, frame_complete: bool) {
        // Sample the registers once, commit once at the bottom: no
        // component may observe a half-updated step.
        let state = self.state;
        let ticks = self.phase_ticks;
        let error = self.error;

        let (next_state, next_ticks, next_error) = if !start {
            // Asynchronous reset: overrides any pending timed transition.
            (ConversionState::Idle, 0, false)
        } else {
            match state {
                ConversionState::Idle => (ConversionState::Settling, 0, error),
                ConversionState::Settling => {
                    if ticks + 1 >= self.settle_ticks {
                        (ConversionState::DataReady, 0, error)
                    } else {
                        (ConversionState::Settling, ticks + 1, error)
                    }
                }
                ConversionState::DataReady => {
                    if ticks + 1 >= self.ready_ticks {
                        (ConversionState::DataUpdating, 0, !frame_complete)
                    } else {
                        (ConversionState::DataReady, ticks + 1, error)
                    }
                }
                ConversionState::DataUpdating => {
                    if ticks + 1 >= UPDATE_TICKS {
                        (ConversionState::DataReady, 0, error)
                    } else {
                        (ConversionState::DataUpdating, ticks + 1, error)
                    }
                }
            }
        };

        self.state = next_state;
        self.phase_ticks = next_ticks;
        self.error = next_error;
    }

    /// Apply the asynchronous reset without waiting for a clock edge.
    pub fn force_idle(&mut self) {
        self.state = ConversionState::Idle;
        self.phase_ticks = 0;
        self.error = false;
    }

    /// The level that gates the serial shift engine.
    pub fn data_ready(&self) -> bool {
        self.state == ConversionState::DataReady
    }

    pub fn state(&self) -> ConversionState {
        self.state
    }

    pub fn error(&self) -> bool {
        self.error
    }

    pub fn phase_ticks(&self) -> u32 {
        self.phase_ticks
    }

    /// Capture state for save state.
    pub fn save_state(&self) -> crate::savestate::FsmState {
        crate::savestate::FsmState {
            state: self.state.code(),
            phase_ticks: self.phase_ticks,
            error: self.error,
        }
    }

    /// Restore state from save state (state code already validated).
    pub fn load_state(&mut self, state: ConversionState, phase_ticks: u32, error: bool) {
        self.state = state;
        self.phase_ticks = phase_ticks;
        self.error = error;
    }
}
