//! Chip-8 CPU interpreter.
//!
//! The [`Chip8Vm`](vm::Chip8Vm) fetches, decodes and executes instructions
//! against its own memory, registers and call stack. Pixels, keys and the
//! buzzer are reached through the [`Devices`](devices::Devices) trait, so
//! any presentation layer can be plugged in by the host.
mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod devices;
mod disasm;
mod display;
mod error;
mod stack;
mod vm;

pub use self::{
    bytecode::Opcode,
    clock::{Clock, Hz},
    devices::{Devices, HeadlessDevices, InvalidKeyCode, KeyCode, KeyState},
    display::Framebuffer,
    stack::CallStack,
    vm::check_program_size,
};

/// Version of this implementation.
pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::{Chip8Cpu, KeyWait},
        devices::{Devices, HeadlessDevices, KeyCode},
        disasm::Disassembler,
        error::{Chip8Error, Chip8Result},
        vm::{Chip8Conf, Chip8Vm, Flow},
    };
}
