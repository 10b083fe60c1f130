//! Subroutine call stack.
use crate::{
    constants::{Address, STACK_SIZE},
    error::{Chip8Error, Chip8Result},
};

/// Fixed depth stack of return addresses.
#[derive(Debug, Clone)]
pub struct CallStack {
    slots: [Address; STACK_SIZE],
    /// Number of occupied slots, which is also the index of the next free slot.
    len: usize,
}

impl Default for CallStack {
    fn default() -> Self {
        Self {
            slots: [0; STACK_SIZE],
            len: 0,
        }
    }
}

impl CallStack {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, address: Address) -> Chip8Result<()> {
        if self.is_full() {
            return Err(Chip8Error::StackOverflow);
        }

        self.slots[self.len] = address;
        self.len += 1;

        Ok(())
    }

    pub fn pop(&mut self) -> Chip8Result<Address> {
        if self.is_empty() {
            return Err(Chip8Error::StackUnderflow);
        }

        self.len -= 1;

        Ok(self.slots[self.len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == STACK_SIZE
    }

    pub fn clear(&mut self) {
        self.slots.fill(0);
        self.len = 0;
    }
}
