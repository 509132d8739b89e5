//! VCD waveform tracing of the chain's boundary signals.
//!
//! Records start, DRDY, DOUT, the error flag, and a 2-bit conversion-state
//! code as an IEEE 1364 Value Change Dump, viewable in GTKWave or Surfer.
//! Emission is change-only: calling [`VcdTrace::sample`] every scheduler
//! step costs nothing while the signals are static.
//!
//! Timestamps are supplied by the caller; the model itself has no notion
//! of wall time. The harness maps one scheduler step to one VCD time unit
//! (declared as 1 ns in the header).

use std::io::Write;

/// One observation of the boundary signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSample {
    pub start: bool,
    pub drdy_low: bool,
    pub dout: bool,
    pub error: bool,
    /// Conversion state code (see `ConversionState::code`)
    pub state: u8,
}

// VCD identifier codes, fixed since the signal set is fixed.
const ID_START: char = '!';
const ID_DRDY: char = '"';
const ID_DOUT: char = '#';
const ID_ERROR: char = '$';
const ID_STATE: char = '%';

/// Streaming VCD writer for the fixed chain signal set.
pub struct VcdTrace<W: Write> {
    writer: W,
    last_time: Option<u64>,
    prev: Option<TraceSample>,
}

impl<W: Write> VcdTrace<W> {
    /// Create a tracer and write the VCD header and variable definitions.
    pub fn new(mut writer: W) -> Result<Self, String> {
        let header = || -> std::io::Result<()> {
            writeln!(writer, "$date")?;
            writeln!(writer, "  Simulation date")?;
            writeln!(writer, "$end")?;
            writeln!(writer, "$version")?;
            writeln!(writer, "  ads129x-emu")?;
            writeln!(writer, "$end")?;
            writeln!(writer, "$timescale")?;
            writeln!(writer, "  1ns")?;
            writeln!(writer, "$end")?;
            writeln!(writer, "$scope module chain $end")?;
            writeln!(writer, "$var wire 1 {} start $end", ID_START)?;
            writeln!(writer, "$var wire 1 {} drdy_n $end", ID_DRDY)?;
            writeln!(writer, "$var wire 1 {} dout $end", ID_DOUT)?;
            writeln!(writer, "$var wire 1 {} error $end", ID_ERROR)?;
            writeln!(writer, "$var wire 2 {} state $end", ID_STATE)?;
            writeln!(writer, "$upscope $end")?;
            writeln!(writer, "$enddefinitions $end")?;
            Ok(())
        }();
        header.map_err(write_err)?;
        Ok(VcdTrace { writer, last_time: None, prev: None })
    }

    /// Record the signal values at `time` (monotonically non-decreasing).
    /// Only changed signals are written; the first call dumps everything.
    pub fn sample(&mut self, time: u64, s: TraceSample) -> Result<(), String> {
        if let Some(last) = self.last_time {
            if time < last {
                return Err(format!("VCD time went backwards: {} after {}", time, last));
            }
        }

        let prev = self.prev;
        if prev == Some(s) {
            return Ok(());
        }

        let out = || -> std::io::Result<()> {
            if prev.is_none() {
                writeln!(self.writer, "$dumpvars")?;
            }
            writeln!(self.writer, "#{}", time)?;
            let changed = |f: fn(&TraceSample) -> bool| prev.map_or(true, |p| f(&p) != f(&s));
            if changed(|x| x.start) {
                writeln!(self.writer, "{}{}", s.start as u8, ID_START)?;
            }
            if changed(|x| x.drdy_low) {
                writeln!(self.writer, "{}{}", s.drdy_low as u8, ID_DRDY)?;
            }
            if changed(|x| x.dout) {
                writeln!(self.writer, "{}{}", s.dout as u8, ID_DOUT)?;
            }
            if changed(|x| x.error) {
                writeln!(self.writer, "{}{}", s.error as u8, ID_ERROR)?;
            }
            if prev.map_or(true, |p| p.state != s.state) {
                writeln!(self.writer, "b{}{} {}", (s.state >> 1) & 1, s.state & 1, ID_STATE)?;
            }
            Ok(())
        }();
        out.map_err(write_err)?;

        self.last_time = Some(time);
        self.prev = Some(s);
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn finalize(&mut self) -> Result<(), String> {
        self.writer.flush().map_err(write_err)
    }
}

fn write_err(e: std::io::Error) -> String {
    format!("VCD write error: {}", e)
}
