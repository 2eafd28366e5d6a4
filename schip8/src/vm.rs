//! Virtual machine.
use std::{
    fmt::{self, Write},
    time::Duration,
};

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    clock::{Clock, Pacer},
    constants::*,
    cpu::Chip8Cpu,
    devices::{Devices, KeyCode, KeyState, Keypad},
    display::{Chip8DisplayBuffer, DisplayBuffer},
    error::{Chip8Error, Chip8Result, Fault},
    interp,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    keys: KeyState,
    rng: StdRng,
    cycle_count: u64,
    /// Control flow of the most recent instruction.
    last_flow: Flow,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            keys: KeyState::new(),
            rng,
            cycle_count: 0,
            last_flow: Flow::Ok,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    /// Real-time clock ticking at the configured frequency.
    pub fn clock(&self) -> Clock {
        Clock::new(self.conf.cycle_interval())
    }

    /// Zero registers, memory, timers and display, and get ready to run from `0x200`.
    pub fn reset(&mut self) {
        log::debug!("reset");
        self.cpu.reset();
        self.cycle_count = 0;
        self.last_flow = Flow::Ok;
    }

    /// Copy raw bytes into memory at `offset`.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) -> Chip8Result<()> {
        self.cpu.load(offset, bytes)
    }

    pub fn load_builtin_font(&mut self) -> Chip8Result<()> {
        self.load_font(&FONTSET)
    }

    pub fn load_font(&mut self, fontset: &[u8]) -> Chip8Result<()> {
        if fontset.len() != FONTSET_DATA_LENGTH {
            return Err(Chip8Error::Font(fontset.len()));
        }

        self.cpu.load(FONTSET_START, fontset)
    }

    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::LargeProgram {
                offset: MEM_START,
                len: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        self.reset();

        // Reset fonts
        self.load_builtin_font()?;

        // Load program into virtual RAM
        self.cpu.load(MEM_START, bytecode)?;
        log::debug!("loaded {} byte program", bytecode.len());

        Ok(())
    }

    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn display(&self) -> &DisplayBuffer {
        &self.cpu.display
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer {
        self.cpu.display.pixels()
    }

    pub fn is_running(&self) -> bool {
        self.cpu.running
    }

    /// Number of cycles executed since the last reset.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }
}

/// Check whether the program fits between the program start and the end of memory.
#[inline]
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= MEM_SIZE - MEM_START
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// The VM is not running, or was asked to stop.
    Interrupt,
    /// Program counter has jumped to a new address.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer was drawn to, cleared or scrolled.
    Draw,
    /// The sound timer was set.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
    /// The program executed `00FD` (`EXIT`).
    Exit,
}

/// Outcome of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub flow: Flow,
    /// The sound timer ran out during this cycle.
    pub beep: bool,
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Cycles per second. Defaults to [`CYCLE_FREQUENCY`].
    ///
    /// Zero runs the interpreter as quickly as possible.
    pub clock_frequency: Option<Hz>,
    /// Seed for the `CXNN` random number generator.
    pub seed: Option<u64>,
    pub quirks: Quirks,
}

impl Chip8Conf {
    pub fn cycle_interval(&self) -> Duration {
        self.clock_frequency
            .unwrap_or(Hz(CYCLE_FREQUENCY))
            .into()
    }
}

/// Instruction behaviours that differ between interpreters.
///
/// The defaults reproduce the behaviour existing programs were written against.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Quirks {
    /// `8XY6` stores the shifted value in VY instead of VX.
    pub shift_into_vy: bool,
    /// `BNNN` jumps forward from the current program counter instead of from zero.
    pub jump_relative: bool,
    /// `FX1E` wraps the address register modulo this value. Zero disables wrapping.
    pub index_modulus: u16,
    /// `EX9E`, `EXA1` and `FX0A` read the keyboard. Otherwise they do nothing.
    pub keypad: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            shift_into_vy: true,
            jump_relative: true,
            index_modulus: INDEX_WRAP_MODULUS,
            keypad: false,
        }
    }
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.keys.set(key, pressed);
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.keys.clear()
    }

    pub fn keys(&self) -> &KeyState {
        &self.keys
    }

    /// Ask the VM to stop. Takes effect at the top of the next cycle.
    pub fn interrupt(&mut self) {
        self.cpu.interrupt();
    }

    /// Run the fixed-rate cycle loop until the VM halts.
    ///
    /// Each cycle polls the keyboard, executes one instruction, counts down
    /// the timers, then hands beeps and repaints to the devices. The pacer
    /// paces each cycle to its budget.
    ///
    /// Returns [`Flow::Exit`] when the program exits, [`Flow::Interrupt`]
    /// when stopped from outside, and the fault when an instruction fails.
    pub fn run<D, P>(&mut self, devices: &mut D, pacer: &mut P) -> Chip8Result<Flow>
    where
        D: Devices + ?Sized,
        P: Pacer + ?Sized,
    {
        log::debug!("running at {:?} per cycle", self.conf.cycle_interval());

        loop {
            if devices.stop_requested() {
                self.interrupt();
            }

            if !self.cpu.running {
                let flow = match self.cpu.error {
                    Some(fault) => return Err(fault.into()),
                    None if self.last_flow == Flow::Exit => Flow::Exit,
                    None => Flow::Interrupt,
                };
                log::debug!("halted after {} cycles: {flow:?}", self.cycle_count);
                return Ok(flow);
            }

            pacer.start();

            devices.poll_keys(&mut self.keys);

            let cycle = self.step()?;

            if cycle.beep {
                devices.beep();
            }

            if self.cpu.display.take_repaint() {
                devices.draw(&self.cpu.display);
            }

            pacer.finish();
        }
    }

    /// Step the VM a fixed number of cycles without any pacing or devices.
    ///
    /// Stops early when the VM halts.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?.flow;
            if !self.cpu.running {
                break;
            }
        }

        Ok(flow)
    }

    /// Execute exactly one cycle.
    ///
    /// Fetch the instruction at the program counter, advance the counter,
    /// execute, then count down the timers.
    pub fn step(&mut self) -> Chip8Result<Cycle> {
        if !self.cpu.running {
            return Ok(Cycle {
                flow: Flow::Interrupt,
                beep: false,
            });
        }

        let op = match self.cpu.fetch() {
            Ok(op) => op,
            Err(fault) => return Err(self.fault(fault)),
        };
        self.cpu.pc += 2;

        let flow = match interp::execute(
            &mut self.cpu,
            op,
            &self.conf.quirks,
            &self.keys,
            &mut self.rng,
        ) {
            Ok(flow) => flow,
            Err(fault) => return Err(self.fault(fault)),
        };

        self.cycle_count += 1;
        self.last_flow = flow;

        // Count down timers
        self.cpu.tick_delay();
        let beep = self.cpu.tick_sound();

        Ok(Cycle { flow, beep })
    }

    /// Halt on a fault, keeping the state for inspection.
    fn fault(&mut self, fault: Fault) -> Chip8Error {
        log::error!("halting after {} cycles: {fault}", self.cycle_count);
        self.cpu.set_error(fault);
        fault.into()
    }
}

/// Troubleshooting
#[allow(dead_code)]
#[doc(hidden)]
impl Chip8Vm {
    /// Returns the contents of the memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();

        for (i, op) in self
            .cpu
            .ram
            .chunks_exact(2)
            .enumerate()
            .skip(MEM_START / 2)
            .take(count / 2)
        {
            writeln!(buf, "{:04X}: {:02X}{:02X}", i * 2, op[0], op[1])?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        write!(buf, "{}", self.cpu.display)?;
        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.keys.any() {
            write!(buf, "keys: ")?;
            for i in 0..KEY_COUNT {
                if let Ok(key) = KeyCode::try_from(i) {
                    if self.keys.is_pressed(key) {
                        write!(buf, "{key}")?;
                    }
                }
            }
        }

        Ok(buf)
    }
}
