use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotmatrix_core::cartridge::Cartridge;
use dotmatrix_core::diagnostics::{self, Level, LogSink};
use dotmatrix_core::gameboy::GameBoy;
use dotmatrix_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use dotmatrix_core::scheduler::{FrameSink, Scheduler};

#[derive(Parser)]
#[command(name = "dotmatrix", about = "DMG emulator", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a ROM
    Run {
        /// Path to ROM file
        rom: PathBuf,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,

        /// Run unpaced (as fast as the host allows)
        #[arg(long)]
        turbo: bool,
    },
}

/// Forwards core diagnostics to the `log` facade.
struct LogBridge;

impl LogSink for LogBridge {
    fn log(&self, level: Level, target: &'static str, args: fmt::Arguments) {
        let level = match level {
            Level::Trace => log::Level::Trace,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
        };
        log::log!(target: target, level, "{args}");
    }
}

/// Counts frames and requests shutdown once the cap is reached.
struct FrameCounter {
    count: u64,
    limit: Option<u64>,
    shutdown: Arc<AtomicBool>,
}

impl FrameSink for FrameCounter {
    fn frame(&mut self, _pixels: &[u8; SCREEN_WIDTH * SCREEN_HEIGHT]) {
        self.count += 1;
        if let Some(limit) = self.limit {
            if self.count >= limit {
                self.shutdown.store(true, Ordering::Relaxed);
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let _ = diagnostics::try_set_log_sink(Box::new(LogBridge));

    let args = Args::parse();
    match args.command {
        Command::Run { rom, frames, turbo } => run(&rom, frames, turbo),
    }
}

fn run(rom_path: &PathBuf, frames: Option<u64>, turbo: bool) -> Result<()> {
    let cart = Cartridge::from_file(rom_path)
        .with_context(|| format!("failed to load ROM '{}'", rom_path.display()))?;
    log::info!("running {:?}", cart.title);

    let mut gb = GameBoy::new();
    gb.load_cart(cart);

    let mut scheduler = Scheduler::new(gb);
    scheduler.set_pace(!turbo);
    let mut sink = FrameCounter {
        count: 0,
        limit: frames,
        shutdown: scheduler.shutdown_handle(),
    };

    scheduler.run(&mut sink).context("emulation halted")?;
    log::info!("clean shutdown after {} frames", sink.count);
    Ok(())
}
