//! CPU and memory state.
use crate::{constants::*, stack::CallStack};

/// Pending wait-for-key registration.
///
/// Set by `Fx0A` (`LD Vx, K`). Execution is suspended until a key-down
/// resolves it by writing the key into the target register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyWait {
    /// Index of the register receiving the key.
    pub register: usize,
}

/// Core state for a chip8 interpreter.
#[derive(Debug, Clone)]
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the next instruction to fetch.
    pub(crate) pc: Address,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address. Since addresses are 12 bits, only the
    /// lowest (rightmost) bits are used.
    pub(crate) index: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    pub(crate) key_wait: Option<KeyWait>,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: CallStack,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: MEM_START as Address,
            registers: [0; REGISTER_COUNT],
            index: 0,
            delay_timer: 0,
            sound_timer: 0,
            key_wait: None,

            ram: Box::new([0; MEM_SIZE]),
            stack: CallStack::new(),
        };
        cpu.load_font();
        cpu
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Restore the power-on state.
    ///
    /// Memory is zeroed except for the font glyphs.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START as Address;
        self.registers.fill(0);
        self.index = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.key_wait = None;
        self.ram.fill(0);
        self.stack.clear();
        self.load_font();
    }

    fn load_font(&mut self) {
        self.ram[FONTSET_START..FONTSET_START + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    #[inline(always)]
    pub fn pc(&self) -> Address {
        self.pc
    }

    /// Address register `I`.
    #[inline(always)]
    pub fn index(&self) -> Address {
        self.index
    }

    #[inline(always)]
    pub fn register(&self, x: usize) -> u8 {
        self.registers[x & 0xF]
    }

    #[inline(always)]
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    #[inline(always)]
    pub fn memory(&self) -> &[u8; MEM_SIZE] {
        &self.ram
    }

    #[inline(always)]
    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    #[inline(always)]
    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    #[inline(always)]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    #[inline(always)]
    pub fn key_wait(&self) -> Option<KeyWait> {
        self.key_wait
    }

    /// Read a byte, wrapping the address around the 12-bit memory space.
    #[inline(always)]
    pub(crate) fn load(&self, address: usize) -> u8 {
        self.ram[address & MEM_MASK]
    }

    /// Write a byte, wrapping the address around the 12-bit memory space.
    ///
    /// The font glyphs are read-only. Writes into their region are dropped.
    pub(crate) fn store(&mut self, address: usize, value: u8) {
        let address = address & MEM_MASK;
        if address < FONTSET_START + FONTSET_DATA_LENGTH {
            log::warn!("dropped write of {value:02X} to font memory at {address:04X}");
            return;
        }
        self.ram[address] = value;
    }

    /// Count down both timers, stopping at zero.
    #[inline]
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}
