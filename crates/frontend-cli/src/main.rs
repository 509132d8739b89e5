//! ads129x-emu — headless scenario harness for the chain timing model (v0.3.0).
//!
//! Builds a daisy-chain model, drives both clock domains through a scripted
//! read scenario, and reports the per-window outcome. Scenarios cover the
//! cases an acquisition pipeline needs to validate:
//!
//! - full-frame reads (the nominal case, no error flag)
//! - short reads (`--read-bytes`) and mid-byte stops (`--extra-bits`)
//! - unread windows (`--idle-windows`), observing the automatic
//!   ready/not-ready cadence
//!
//! Optional outputs: a VCD trace of the boundary signals (`--vcd`) and a
//! save state (`--save` / `--load`) to park and resume long scenarios.
//!
//! Examples:
//! ```text
//! ads129x-emu --devices 2 --rate 4000 --windows 8
//! ads129x-emu --devices 1 --read-bytes 26 --vcd short-read.vcd
//! ads129x-emu --devices 1 --extra-bits 3 --windows 2 --debug
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;

use ads129x_core::{savestate, AdsChain, ChainConfig, ConversionState, VcdTrace};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ads129x-emu", version, about = "ADS1298/ADS1299 daisy-chain timing harness")]
struct Args {
    /// Number of devices in the daisy chain.
    #[arg(long, default_value_t = ads129x_core::DEFAULT_DEVICES)]
    devices: u32,

    /// Data rate in samples per second.
    #[arg(long, default_value_t = ads129x_core::DEFAULT_SAMPLE_RATE)]
    rate: u32,

    /// Conversion windows to run.
    #[arg(long, default_value_t = 8)]
    windows: u64,

    /// Bytes to read per window (default: the full frame).
    #[arg(long)]
    read_bytes: Option<u64>,

    /// Extra serial-clock bits after the last whole byte (stops mid-byte).
    #[arg(long, default_value_t = 0)]
    extra_bits: u32,

    /// Leave the first K windows of the run unread.
    #[arg(long, default_value_t = 0)]
    idle_windows: u64,

    /// Write a VCD trace of the boundary signals to this path.
    #[arg(long)]
    vcd: Option<PathBuf>,

    /// Save the model state to this path after the run.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume from a previously saved state.
    #[arg(long)]
    load: Option<PathBuf>,

    /// Per-window diagnostics on stderr.
    #[arg(long)]
    debug: bool,
}

type Trace = VcdTrace<BufWriter<File>>;

fn main() {
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn record(trace: &mut Option<Trace>, t: u64, chain: &AdsChain) -> Result<(), String> {
    if let Some(tr) = trace {
        tr.sample(t, chain.trace_sample())?;
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), String> {
    let config = ChainConfig::new(args.devices, args.rate)?;
    let mut chain = AdsChain::new(config);
    chain.debug = args.debug;

    if let Some(path) = &args.load {
        let state = savestate::load_from_file(path, config)?;
        chain.load_state(&state)?;
        println!(
            "resumed at tick {} ({} windows done)",
            chain.mclk_ticks(),
            chain.dbg_windows
        );
    }

    let mut trace = match &args.vcd {
        Some(path) => {
            let file = File::create(path).map_err(|e| format!("Create error: {}", e))?;
            Some(Trace::new(BufWriter::new(file))?)
        }
        None => None,
    };

    let frame_bytes = config.frame_bytes();
    let read_bytes = args.read_bytes.unwrap_or(frame_bytes);
    let target_bits = read_bytes * 8 + args.extra_bits as u64;
    // Finish the read burst within the first three quarters of the window.
    let burst_ticks = (config.ready_ticks() as u64 * 3 / 4).max(1);
    let bits_per_tick = (target_bits + burst_ticks - 1) / burst_ticks;

    let mut t: u64 = 0; // one VCD time unit per scheduler step
    chain.set_start(true);
    record(&mut trace, t, &chain)?;
    t += 1;

    let first_window = chain.dbg_windows;
    let end_window = first_window + args.windows;
    let mut bits_sent: u64 = 0;

    while chain.dbg_windows < end_window {
        let window_index = chain.dbg_windows - first_window;
        let reading = chain.conversion_state() == ConversionState::DataReady
            && window_index >= args.idle_windows;

        if reading && bits_sent < target_bits {
            let burst = bits_per_tick.min(target_bits - bits_sent);
            for _ in 0..burst {
                chain.sclk_rising();
                chain.sclk_falling();
            }
            bits_sent += burst;
        }

        let closed_before = chain.dbg_windows;
        chain.tick_mclk();
        record(&mut trace, t, &chain)?;
        t += 1;

        if chain.dbg_windows > closed_before {
            println!(
                "window {:>3}: {:>5}/{} bytes (+{} bits), error={}",
                chain.dbg_windows,
                bits_sent / 8,
                frame_bytes,
                bits_sent % 8,
                chain.error()
            );
            bits_sent = 0;
        }
    }

    println!(
        "done: {} windows, {} with errors, {} serial bits, {} mclk ticks",
        chain.dbg_windows,
        chain.dbg_error_windows,
        chain.dbg_bits_shifted,
        chain.mclk_ticks()
    );

    if let Some(tr) = &mut trace {
        tr.finalize()?;
    }
    if let Some(path) = &args.save {
        savestate::save_to_file(&chain.save_state(), path)?;
        println!("state saved to {}", path.display());
    }

    Ok(())
}
