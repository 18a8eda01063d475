use dotmatrix_core::mmu::Bus;
use once_cell::sync::Lazy;

pub const ROM_BANK_SIZE: usize = 0x4000;

const HEADER_TITLE_START: usize = 0x0134;
const HEADER_CHECKSUM: usize = 0x014D;

/// Stamp a title and a valid header checksum into a ROM image.
#[allow(dead_code)]
pub fn patch_header(rom: &mut [u8]) {
    rom[HEADER_TITLE_START..HEADER_TITLE_START + 4].copy_from_slice(b"TEST");
    let mut checksum = 0u8;
    for &byte in &rom[HEADER_TITLE_START..HEADER_CHECKSUM] {
        checksum = checksum.wrapping_sub(byte).wrapping_sub(1);
    }
    rom[HEADER_CHECKSUM] = checksum;
}

/// Zero-filled ROM of `banks` 16 KiB banks with a valid header.
#[allow(dead_code)]
pub fn build_rom(banks: usize) -> Vec<u8> {
    let mut rom = vec![0u8; banks * ROM_BANK_SIZE];
    patch_header(&mut rom);
    rom
}

/// 32-bank image where byte 0x100 of each bank holds the bank number,
/// shared across tests that exercise bank switching.
#[allow(dead_code)]
pub static BANK_MARKER_ROM: Lazy<Vec<u8>> = Lazy::new(|| {
    let mut rom = vec![0u8; 32 * ROM_BANK_SIZE];
    for bank in 0..32 {
        rom[bank * ROM_BANK_SIZE + 0x100] = bank as u8;
    }
    patch_header(&mut rom);
    rom
});

/// Flat 64 KiB memory with no MBC1 and no hardware, for exercising
/// instruction semantics in isolation.
#[allow(dead_code)]
pub struct FlatBus {
    pub mem: Box<[u8; 0x10000]>,
}

#[allow(dead_code)]
impl FlatBus {
    pub fn new() -> Self {
        Self {
            mem: vec![0u8; 0x10000].into_boxed_slice().try_into().unwrap(),
        }
    }

    pub fn with_program(addr: u16, program: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.load(addr, program);
        bus
    }

    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        let addr = addr as usize;
        self.mem[addr..addr + bytes.len()].copy_from_slice(bytes);
    }
}

impl Bus for FlatBus {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write_byte(&mut self, addr: u16, val: u8) {
        self.mem[addr as usize] = val;
    }
}
