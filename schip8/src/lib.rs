mod bytecode;
mod clock;
pub mod constants;
mod cpu;
mod devices;
mod display;
mod error;
mod interp;
mod vm;

pub use self::{
    bytecode::Opcode,
    clock::{Clock, CycleBudget, Pacer, Unpaced},
    devices::{Devices, InvalidKeyCode, KeyCode, KeyState, Keypad, NullDevices},
    display::{Chip8DisplayBuffer, DisplayBuffer},
    error::{Chip8Error, Chip8Result, Fault},
    interp::execute,
    vm::{check_program_size, Cycle, Flow, Hz, Quirks},
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        cpu::Chip8Cpu,
        devices::{Devices, KeyCode, Keypad},
        error::{Chip8Error, Chip8Result, Fault},
        vm::{Chip8Conf, Chip8Vm, Flow, Quirks},
    };
}
