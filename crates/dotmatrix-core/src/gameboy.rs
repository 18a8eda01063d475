//! High-level facade wiring the CPU and MMU into a single machine.

use crate::cartridge::Cartridge;
use crate::cpu::{Cpu, CpuError};
use crate::input::Button;
use crate::mmu::Mmu;
use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl GameBoy {
    /// Machine in the post-boot power-on state, with no cartridge inserted.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.mmu.load_cart(cart);
    }

    /// Reset to the power-on state, preserving the loaded cartridge.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::new();
        self.mmu = Mmu::new();
        self.mmu.cart = cart;
    }

    /// Run one CPU step and feed the consumed T-cycles to the clocked
    /// hardware. Returns the T-cycles.
    pub fn step(&mut self) -> Result<u32, CpuError> {
        let t = self.cpu.step(&mut self.mmu)?;
        self.mmu.tick(t);
        Ok(t)
    }

    /// Run until the PPU completes the current frame.
    pub fn step_frame(&mut self) -> Result<(), CpuError> {
        loop {
            self.step()?;
            if self.mmu.ppu.take_frame_ready() {
                return Ok(());
            }
        }
    }

    /// True while the CPU is latched in HALT/STOP with no interrupt armed
    /// that could ever wake it.
    pub fn idle(&self) -> bool {
        (self.cpu.halted || self.cpu.stopped) && self.mmu.ie_reg & 0x1F == 0
    }

    pub fn framebuffer(&self) -> &[u8; SCREEN_WIDTH * SCREEN_HEIGHT] {
        self.mmu.ppu.framebuffer()
    }

    /// Host-side joypad update; may only be called between step pairs.
    pub fn set_button(&mut self, button: Button, pressed: bool) {
        self.mmu.set_button(button, pressed);
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
