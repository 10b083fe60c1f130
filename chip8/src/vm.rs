//! Virtual machine.
use std::fmt::{self, Write};

use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

use crate::{
    bytecode::Opcode,
    constants::*,
    cpu::{Chip8Cpu, KeyWait},
    devices::{Devices, KeyCode},
    error::{Chip8Error, Chip8Result},
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    /// Source of `Cxkk` (`RND Vx, byte`) values.
    rng: Box<dyn RngCore>,
    conf: Chip8Conf,
    has_program: bool,
    /// Fatal error the machine halted on.
    trap: Option<Chip8Error>,
}

impl Chip8Vm {
    /// Create a VM with a random source seeded from the configuration,
    /// or from system entropy when no seed is given.
    pub fn new(conf: Chip8Conf) -> Self {
        let rng: Box<dyn RngCore> = match conf.seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };

        Self::from_parts(conf, rng)
    }

    /// Create a VM drawing random bytes from the given generator.
    pub fn with_rng(conf: Chip8Conf, rng: impl RngCore + 'static) -> Self {
        Self::from_parts(conf, Box::new(rng))
    }

    fn from_parts(conf: Chip8Conf, rng: Box<dyn RngCore>) -> Self {
        Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng,
            conf,
            has_program: false,
            trap: None,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn has_program(&self) -> bool {
        self.has_program
    }

    /// Error the machine halted on, if any.
    pub fn trap(&self) -> Option<&Chip8Error> {
        self.trap.as_ref()
    }

    /// Load a program at `MEM_START`, resetting the machine.
    ///
    /// A rejected program leaves the machine untouched.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::InvalidProgram {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.cpu.reset();

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        self.has_program = true;
        self.trap = None;

        log::debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Check whether execution is suspended by `Fx0A` (`LD Vx, K`).
    pub fn is_waiting(&self) -> bool {
        self.cpu.key_wait.is_some()
    }

    /// Report a key-down event.
    ///
    /// If the machine is waiting for a key, the key value is loaded into
    /// the waiting register and execution resumes. Returns whether a wait
    /// was resolved.
    pub fn key_down(&mut self, key: KeyCode) -> bool {
        match self.cpu.key_wait.take() {
            Some(KeyWait { register }) => {
                log::debug!("key {key} resolved wait on V{register:X}");
                self.cpu.registers[register] = key.as_u8();
                true
            }
            None => false,
        }
    }

    /// Run one fetch-batch.
    ///
    /// Executes `speed` instructions, counts down the timers, then turns
    /// the buzzer on or off according to the sound timer. Steps taken
    /// while waiting for a key are no-ops, and the timers are held.
    pub fn cycle<D>(&mut self, devices: &mut D) -> Chip8Result<()>
    where
        D: Devices + ?Sized,
    {
        for _ in 0..self.conf.speed {
            self.step(devices)?;
        }

        if !self.is_waiting() {
            self.cpu.tick_timers();
        }

        // Buzzer should be on while sound timer counts down,
        // then turned off when the timer reaches zero.
        if self.cpu.sound_timer > 0 {
            devices.tone_on(self.conf.tone_frequency);
        } else {
            devices.tone_off();
        }

        Ok(())
    }

    /// Execute up to `step_count` instructions.
    ///
    /// Stops early when the machine starts waiting for a key.
    pub fn run_steps<D>(&mut self, step_count: usize, devices: &mut D) -> Chip8Result<Flow>
    where
        D: Devices + ?Sized,
    {
        let mut control_flow = Flow::Ok;

        for _ in 0..step_count {
            control_flow = self.step(devices)?;
            if control_flow == Flow::KeyWait {
                break;
            }
        }

        Ok(control_flow)
    }

    /// Fetch and execute the instruction at the program counter.
    pub fn step<D>(&mut self, devices: &mut D) -> Chip8Result<Flow>
    where
        D: Devices + ?Sized,
    {
        if let Some(err) = &self.trap {
            return Err(err.clone());
        }

        if !self.has_program {
            return Err(Chip8Error::InvalidProgram { size: 0 });
        }

        if self.is_waiting() {
            return Ok(Flow::KeyWait);
        }

        let op = Opcode::fetch(&self.cpu.ram, self.cpu.pc as usize);
        op_trace(self.cpu.pc, op);

        self.execute(op, devices).map_err(|err| {
            log::error!("machine halted: {err}");
            self.trap = Some(err.clone());
            err
        })
    }

    /// Execute a single instruction word.
    ///
    /// The program counter is advanced past the instruction before it is
    /// executed, so jumps and skips manipulate the next fetch directly.
    pub fn execute<D>(&mut self, op: Opcode, devices: &mut D) -> Chip8Result<Flow>
    where
        D: Devices + ?Sized,
    {
        let vx = op.x();
        let vy = op.y();
        let nn = op.kk();
        let nnn = op.nnn();

        self.cpu.pc = self.cpu.pc.wrapping_add(2);

        let mut control_flow = Flow::Ok;

        match op.family() {
            0x0 => control_flow = self.exec_system(op, devices)?,
            // 1nnn (JP addr)
            //
            // Jump to address.
            0x1 => {
                self.cpu.pc = nnn;
                control_flow = Flow::Jump;
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at nnn.
            0x2 => {
                self.cpu.stack.push(self.cpu.pc)?;
                self.cpu.pc = nnn;
                control_flow = Flow::Jump;
            }
            // 3xnn (SE Vx, byte)
            //
            // Skip the next instruction if register Vx equals value nn.
            0x3 => {
                if self.cpu.registers[vx] == nn {
                    self.skip();
                }
            }
            // 4xnn (SNE Vx, byte)
            //
            // Skip the next instruction if register Vx does not equal value nn.
            0x4 => {
                if self.cpu.registers[vx] != nn {
                    self.skip();
                }
            }
            // 5xy0 (SE Vx, Vy)
            //
            // Skip the next instruction if register Vx equals register Vy.
            0x5 => {
                if op.n() != 0 {
                    return Err(self.unknown(op));
                }
                if self.cpu.registers[vx] == self.cpu.registers[vy] {
                    self.skip();
                }
            }
            // 6xnn (LD Vx, byte)
            //
            // Set register Vx to value nn.
            0x6 => {
                self.cpu.registers[vx] = nn;
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value nn to register Vx. Carry flag is not set.
            0x7 => {
                self.cpu.registers[vx] = self.cpu.registers[vx].wrapping_add(nn);
            }
            // Arithmetic instructions identified by n
            0x8 => self.exec_math(op)?,
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            0x9 => {
                if op.n() != 0 {
                    return Err(self.unknown(op));
                }
                if self.cpu.registers[vx] != self.cpu.registers[vy] {
                    self.skip();
                }
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value nnn.
            0xA => {
                self.cpu.index = nnn;
            }
            // Bnnn (JP V0, addr)
            //
            // Jump to address nnn offset by V0, wrapping around the address space.
            0xB => {
                self.cpu.pc = (nnn + self.cpu.registers[0] as Address) & MEM_MASK as Address;
                control_flow = Flow::Jump;
            }
            // Cxnn (RND Vx, byte)
            //
            // Set register Vx to the result of bitwise AND between a random number and nn.
            0xC => {
                self.cpu.registers[vx] = nn & self.rng.gen::<u8>();
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Draw sprite at coordinate as per registers Vx and Vy.
            // Sprite is encoded as 8 pixels wide, n pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // If the drawing operation erases any pixel, register VF is set to
            // 1, and set to 0 if no pixels are unset. This is used for collision detection.
            0xD => {
                let (x, y) = (
                    self.cpu.registers[vx] as usize,
                    self.cpu.registers[vy] as usize,
                );
                let mut is_erased = false;

                for r in 0..op.n() as usize {
                    let row = self.cpu.load(self.cpu.index as usize + r);

                    // Each row is 8 bits representing the 8 pixels of the sprite.
                    for c in 0..SPRITE_WIDTH {
                        if row & (0x80 >> c) != 0 {
                            is_erased |= devices.toggle_pixel(x + c, y + r);
                        }
                    }
                }

                self.cpu.registers[FLAG_REGISTER] = is_erased as u8;
                control_flow = Flow::Draw;
            }
            0xE => self.exec_keys(op, devices)?,
            0xF => control_flow = self.exec_misc(op)?,
            _ => unreachable!("opcode family is a 4-bit nibble"),
        }

        Ok(control_flow)
    }

    /// Skip over the next instruction.
    #[inline(always)]
    fn skip(&mut self) {
        self.cpu.pc = self.cpu.pc.wrapping_add(2);
    }

    /// Error for the instruction that was just fetched.
    fn unknown(&self, op: Opcode) -> Chip8Error {
        Chip8Error::UnknownOpcode {
            opcode: op.0,
            address: self.cpu.pc.wrapping_sub(2),
        }
    }

    /// Execute a display or subroutine instruction
    #[inline]
    fn exec_system<D>(&mut self, op: Opcode, devices: &mut D) -> Chip8Result<Flow>
    where
        D: Devices + ?Sized,
    {
        match op.0 {
            // 00E0 (CLS)
            //
            // Clear display
            0x00E0 => {
                devices.clear_display();
                Ok(Flow::Clear)
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Set the program counter to the value at the top of the stack.
            0x00EE => {
                self.cpu.pc = self.cpu.stack.pop()?;
                Ok(Flow::Jump)
            }
            _ => Err(self.unknown(op)),
        }
    }

    /// Execute an arithmetic instruction
    ///
    /// The flag register is always written before Vx, so when Vx is VF
    /// the result of the operation wins.
    #[inline]
    fn exec_math(&mut self, op: Opcode) -> Chip8Result<()> {
        let (vx, vy) = (op.x(), op.y());
        let (x, y) = (self.cpu.registers[vx], self.cpu.registers[vy]);

        let (flag, result) = match op.n() {
            // 8xy0 (LD Vx, Vy)
            0x0 => (None, y),
            // 8xy1 (OR Vx, Vy)
            0x1 => (None, x | y),
            // 8xy2 (AND Vx, Vy)
            0x2 => (None, x & y),
            // 8xy3 (XOR Vx, Vy)
            0x3 => (None, x ^ y),
            // 8xy4 (ADD Vx, Vy)
            //
            // Overflow is wrapped. If overflow, set VF to 1, else 0.
            0x4 => {
                let (sum, carry) = x.overflowing_add(y);
                (Some(carry as u8), sum)
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // VF is set to 1 when Vx is strictly greater than Vy.
            0x5 => (Some((x > y) as u8), x.wrapping_sub(y)),
            // 8xy6 (SHR Vx)
            //
            // VF receives the least-significant bit before shifting.
            // Vy is unused.
            0x6 => (Some(x & 0x1), x >> 1),
            // 8xy7 (SUBN Vx, Vy)
            //
            // Subtracts Vx from Vy, and stores the result in Vx.
            // VF is set to 1 when Vy is strictly greater than Vx.
            0x7 => (Some((y > x) as u8), y.wrapping_sub(x)),
            // 8xyE (SHL Vx)
            //
            // VF receives the most-significant bit in place (0x80 or 0),
            // masked from the unshifted value. Vy is unused.
            0xE => (Some(x & 0x80), x << 1),
            _ => return Err(self.unknown(op)),
        };

        if let Some(flag) = flag {
            self.cpu.registers[FLAG_REGISTER] = flag;
        }
        self.cpu.registers[vx] = result;

        Ok(())
    }

    /// Execute a keyboard instruction
    #[inline]
    fn exec_keys<D>(&mut self, op: Opcode, devices: &D) -> Chip8Result<()>
    where
        D: Devices + ?Sized,
    {
        // Values outside the keypad are never pressed.
        let key = KeyCode::try_from(self.cpu.registers[op.x()]).ok();
        let pressed = key.map(|key| devices.is_pressed(key)).unwrap_or(false);

        match op.kk() {
            // Ex9E (SKP Vx)
            0x9E => {
                if pressed {
                    self.skip();
                }
            }
            // ExA1 (SKNP Vx)
            0xA1 => {
                if !pressed {
                    self.skip();
                }
            }
            _ => return Err(self.unknown(op)),
        }

        Ok(())
    }

    /// Execute a miscellaneous instruction
    #[inline]
    fn exec_misc(&mut self, op: Opcode) -> Chip8Result<Flow> {
        let vx = op.x();
        let mut control_flow = Flow::Ok;

        match op.kk() {
            // Fx07 (LD Vx, DT)
            //
            // Set Vx = delay timer value.
            0x07 => {
                self.cpu.registers[vx] = self.cpu.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // All execution stops until a key is pressed.
            0x0A => {
                log::debug!("waiting for key into V{vx:X}");
                self.cpu.key_wait = Some(KeyWait { register: vx });
                control_flow = Flow::KeyWait;
            }
            // Fx15 (LD DT, Vx)
            //
            // Set delay timer = Vx.
            0x15 => {
                self.cpu.delay_timer = self.cpu.registers[vx];
            }
            // Fx18 (LD ST, Vx)
            //
            // Set sound timer = Vx.
            0x18 => {
                self.cpu.sound_timer = self.cpu.registers[vx];
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I
            0x1E => {
                let x = self.cpu.registers[vx] as Address;
                self.cpu.index = self.cpu.index.wrapping_add(x);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            0x29 => {
                let x = self.cpu.registers[vx] as Address;
                self.cpu.index = FONTSET_START as Address + x * FONTSET_HEIGHT as Address;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            #[rustfmt::skip]
            0x33 => {
                let addr = self.cpu.index as usize;
                let x = self.cpu.registers[vx];
                self.cpu.store(addr,     x / 100);
                self.cpu.store(addr + 1, x / 10 % 10);
                self.cpu.store(addr + 2, x % 10);
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            0x55 => {
                let addr = self.cpu.index as usize;
                for v in 0..=vx {
                    self.cpu.store(addr + v, self.cpu.registers[v]);
                }
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            0x65 => {
                let addr = self.cpu.index as usize;
                for v in 0..=vx {
                    self.cpu.registers[v] = self.cpu.load(addr + v);
                }
            }
            _ => return Err(self.unknown(op)),
        }

        Ok(control_flow)
    }
}

/// Check that the program fits between `MEM_START` and the end of memory.
#[inline]
pub fn check_program_size(bytecode: &[u8]) -> bool {
    (1..=MAX_PROGRAM_SIZE).contains(&bytecode.len())
}

/// Outcome of a single step, reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display was cleared.
    Clear,
    /// A sprite was drawn.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct Chip8Conf {
    /// Number of instructions executed per fetch-batch.
    pub speed: usize,
    /// Seed for the random number generator. Entropy is used when not set.
    pub seed: Option<u64>,
    /// Pitch of the buzzer, in hertz.
    pub tone_frequency: f64,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            seed: None,
            tone_frequency: DEFAULT_TONE_FREQUENCY,
        }
    }
}

/// Troubleshooting
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the register file as a human readable string.
    pub fn dump_registers(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for (i, v) in self.cpu.registers.iter().enumerate() {
            write!(buf, "V{i:X}={v:02X} ")?;
        }
        writeln!(buf)?;
        write!(
            buf,
            "I={:04X} PC={:04X} DT={:02X} ST={:02X} SP={}",
            self.cpu.index,
            self.cpu.pc,
            self.cpu.delay_timer,
            self.cpu.sound_timer,
            self.cpu.stack.len()
        )?;

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(address: Address, op: Opcode) {
    log::trace!("{address:04X}: {op}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: Opcode) {}
