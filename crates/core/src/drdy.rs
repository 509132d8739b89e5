//! Read-start monitor for the data-ready output.
//!
//! On the real part DRDY returns high as soon as the host begins clocking
//! data out, well before the window's own timeout. This monitor reproduces
//! that: the first serial-clock falling edge inside a DataReady window sets
//! a sticky flag that the output composition ORs into the data-ready line.
//! The flag clears whenever the window ends (the gate drops).

pub struct DrdyMonitor {
    read_started: bool,
}

impl DrdyMonitor {
    pub fn new() -> Self {
        DrdyMonitor { read_started: false }
    }

    /// Serial-clock falling edge. Only the first one per window matters;
    /// later edges leave the flag set.
    pub fn sclk_falling(&mut self, gate: bool) {
        if gate {
            self.read_started = true;
        }
    }

    /// Same-step reaction to the gate dropping.
    pub fn clear(&mut self) {
        self.read_started = false;
    }

    pub fn read_started(&self) -> bool {
        self.read_started
    }

    /// Capture state for save state.
    pub fn save_state(&self) -> crate::savestate::MonitorState {
        crate::savestate::MonitorState { read_started: self.read_started }
    }

    /// Restore state from save state.
    pub fn load_state(&mut self, s: &crate::savestate::MonitorState) {
        self.read_started = s.read_started;
    }
}

impl Default for DrdyMonitor {
    fn default() -> Self {
        DrdyMonitor::new()
    }
}
