//! CPU and memory state.
use crate::{
    bytecode::Opcode,
    constants::*,
    display::DisplayBuffer,
    error::{Chip8Error, Chip8Result, Fault},
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: usize,
    /// Stack pointer, indicating the number of return addresses on the stack.
    pub(crate) sp: usize,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. A beep is played when it runs out.
    pub(crate) sound_timer: u8,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Stack of return pointers used for jumping when a routine call finishes.
    pub(crate) stack: Box<[Address; STACK_SIZE]>,
    /// Screen buffer that is drawn too.
    pub(crate) display: DisplayBuffer,

    // ------------------------------------------------------------------------
    // Control
    /// Cleared to stop the cycle driver.
    pub(crate) running: bool,
    /// Fault that stopped the VM, if any.
    pub(crate) error: Option<Fault>,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        Self {
            pc: MEM_START,
            sp: 0,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,

            ram: Box::new([0; MEM_SIZE]),
            stack: Box::new([0; STACK_SIZE]),
            display: DisplayBuffer::new(),

            running: true,
            error: None,
        }
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Zero all registers, memory, timers and the display, and prepare to
    /// run from the program entry point.
    pub fn reset(&mut self) {
        self.pc = MEM_START;
        self.sp = 0;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;

        self.ram.fill(0);
        self.stack.fill(0);
        self.display.reset();

        self.running = true;
        self.error = None;
    }

    /// Copy bytes into memory starting at `offset`.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) -> Chip8Result<()> {
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= MEM_SIZE)
            .ok_or(Chip8Error::LargeProgram {
                offset,
                len: bytes.len(),
            })?;

        self.ram[offset..end].copy_from_slice(bytes);

        Ok(())
    }

    /// Stop the VM at the top of the next cycle.
    pub fn interrupt(&mut self) {
        self.running = false;
    }

    /// Stop the VM and remember why.
    pub(crate) fn set_error(&mut self, fault: Fault) {
        self.running = false;
        self.error = Some(fault);
    }

    pub fn error(&self) -> Option<Fault> {
        self.error
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn ram(&self) -> &[u8; MEM_SIZE] {
        &self.ram
    }

    pub fn display(&self) -> &DisplayBuffer {
        &self.display
    }

    // ------------------------------------------------------------------------
    // Memory access

    /// Borrow `len` bytes of memory starting at `address`.
    #[inline]
    pub fn mem(&self, address: usize, len: usize) -> Result<&[u8], Fault> {
        mem_slice(&*self.ram, address, len)
    }

    /// Mutably borrow `len` bytes of memory starting at `address`.
    #[inline]
    pub fn mem_mut(&mut self, address: usize, len: usize) -> Result<&mut [u8], Fault> {
        match address.checked_add(len) {
            Some(end) if end <= MEM_SIZE => Ok(&mut self.ram[address..end]),
            _ => Err(Fault::Memory { address, len }),
        }
    }

    /// Extract the instruction at the current program counter.
    #[inline]
    pub fn fetch(&self) -> Result<Opcode, Fault> {
        let bytes = self.mem(self.pc, 2)?;
        Ok(Opcode::from_bytes([bytes[0], bytes[1]]))
    }

    /// Draw `n` rows of the sprite pointed to by the address register.
    pub(crate) fn draw_sprite(&mut self, x: usize, y: usize, n: usize) -> Result<bool, Fault> {
        let rows = mem_slice(&*self.ram, self.address as usize, n)?;
        self.display.draw_sprite(x, y, rows)
    }

    // ------------------------------------------------------------------------
    // Call stack

    #[inline]
    pub(crate) fn push(&mut self, address: Address) -> Result<(), Fault> {
        let slot = self.stack.get_mut(self.sp).ok_or(Fault::StackOverflow)?;
        *slot = address;
        self.sp += 1;
        Ok(())
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Result<Address, Fault> {
        let sp = self.sp.checked_sub(1).ok_or(Fault::StackUnderflow)?;
        self.sp = sp;
        Ok(self.stack[sp])
    }

    // ------------------------------------------------------------------------
    // Timers

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer.
    ///
    /// Returns `true` when the timer runs out on this tick.
    #[inline]
    pub fn tick_sound(&mut self) -> bool {
        let beep = self.sound_timer == 1;
        self.sound_timer = self.sound_timer.saturating_sub(1);
        beep
    }
}

#[inline]
fn mem_slice(ram: &[u8], address: usize, len: usize) -> Result<&[u8], Fault> {
    match address.checked_add(len) {
        Some(end) if end <= ram.len() => Ok(&ram[address..end]),
        _ => Err(Fault::Memory { address, len }),
    }
}
