//! Real-time run loop.
//!
//! The scheduler owns the machine and is the only component that talks to
//! the wall clock. It drives CPU steps, hands the consumed cycle budget to
//! the clocked hardware, and sleeps at frame boundaries to hold the DMG
//! frame rate. The emulation itself stays fully deterministic; pacing only
//! affects when steps happen, never what they compute.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::cpu::CpuError;
use crate::gameboy::GameBoy;
use crate::ppu::{FRAME_CYCLES, SCREEN_HEIGHT, SCREEN_WIDTH};

/// Master clock rate in Hz.
pub const CLOCK_HZ: u32 = 4_194_304;

/// Wall time of one 70224-cycle frame.
pub const FRAME_TIME: Duration =
    Duration::from_nanos(FRAME_CYCLES as u64 * 1_000_000_000 / CLOCK_HZ as u64);

/// Sleep interval while the CPU is latched with no wake source.
const IDLE_SLEEP: Duration = Duration::from_millis(2);

/// Receives every completed frame.
///
/// Pixels are 2-bit shade indices, row-major 160x144; 0 is the lightest
/// shade.
pub trait FrameSink {
    fn frame(&mut self, pixels: &[u8; SCREEN_WIDTH * SCREEN_HEIGHT]);
}

/// Sink for frontends that only need the emulation to run.
pub struct NullSink;

impl FrameSink for NullSink {
    fn frame(&mut self, _pixels: &[u8; SCREEN_WIDTH * SCREEN_HEIGHT]) {}
}

pub struct Scheduler {
    pub gb: GameBoy,
    pace: bool,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(gb: GameBoy) -> Self {
        Self {
            gb,
            pace: true,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Disable wall-clock pacing (run as fast as the host allows).
    pub fn set_pace(&mut self, pace: bool) {
        self.pace = pace;
    }

    /// Flag the host can set from any thread to stop [`Scheduler::run`]
    /// between step pairs. In-flight instructions always complete.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Drive the machine until shutdown is requested or a fatal CPU fault
    /// surfaces.
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> Result<(), CpuError> {
        core_info!(target: "scheduler", "run loop started");
        let mut next_frame = Instant::now() + FRAME_TIME;
        while !self.shutdown.load(Ordering::Relaxed) {
            if self.gb.idle() {
                // Nothing can wake the CPU; don't spin the host.
                thread::sleep(IDLE_SLEEP);
                continue;
            }

            if let Err(err) = self.gb.step() {
                core_warn!(target: "scheduler", "halting: {err}");
                return Err(err);
            }

            if self.gb.mmu.ppu.take_frame_ready() {
                sink.frame(self.gb.framebuffer());
                if self.pace {
                    let now = Instant::now();
                    if now < next_frame {
                        thread::sleep(next_frame - now);
                        next_frame += FRAME_TIME;
                    } else {
                        // Fell behind; resync rather than sprinting to catch
                        // up.
                        next_frame = now + FRAME_TIME;
                    }
                }
            }
        }
        core_info!(target: "scheduler", "shutdown requested");
        Ok(())
    }
}
