//! Instruction decoder and executor.
use rand::Rng;

use crate::{
    bytecode::Opcode,
    constants::*,
    cpu::Chip8Cpu,
    devices::{KeyCode, Keypad},
    error::Fault,
    vm::{Flow, Quirks},
};

/// Execute one instruction against the CPU state.
///
/// The program counter must already point past `op`, so jumps replace it
/// with an absolute address and skips simply add another 2.
///
/// Nothing is written back when a fault is returned.
pub fn execute<K, R>(
    cpu: &mut Chip8Cpu,
    op: Opcode,
    quirks: &Quirks,
    keypad: &K,
    rng: &mut R,
) -> Result<Flow, Fault>
where
    K: Keypad + ?Sized,
    R: Rng,
{
    let (vx, vy, nn, nnn) = (op.x(), op.y(), op.nn(), op.nnn());

    let mut control_flow = Flow::Ok;

    match op.family() {
        // Machine instructions identified by nn
        0x0 => control_flow = exec_sys(cpu, op)?,
        // 1NNN (JP addr)
        //
        // Jump to address.
        0x1 => {
            op_trace("JP", op, cpu);

            cpu.pc = nnn as usize;

            control_flow = Flow::Jump;
        }
        // 2NNN (CALL addr)
        //
        // Call subroutine at NNN.
        // The return address is the instruction after the call.
        0x2 => {
            op_trace("CALL", op, cpu);

            cpu.push(cpu.pc as Address)?;
            cpu.pc = nnn as usize;

            control_flow = Flow::Jump;
        }
        // 3XNN (SE Vx, byte)
        //
        // Skip the next instruction if register VX equals value NN.
        0x3 => {
            op_trace("SE", op, cpu);

            if cpu.registers[vx] == nn {
                cpu.pc += 2;
            }
        }
        // 4XNN (SNE Vx, byte)
        //
        // Skip the next instruction if register VX does not equal value NN.
        0x4 => {
            op_trace("SNE", op, cpu);

            if cpu.registers[vx] != nn {
                cpu.pc += 2;
            }
        }
        // 5XY0 (SE Vx, Vy)
        //
        // Skip the next instruction if register VX equals value VY.
        0x5 => {
            op_trace("SE", op, cpu);

            if cpu.registers[vx] == cpu.registers[vy] {
                cpu.pc += 2;
            }
        }
        // 6XNN (LD Vx, byte)
        //
        // Set register VX to value NN.
        0x6 => {
            op_trace("LD", op, cpu);

            cpu.registers[vx] = nn;
        }
        // 7XNN (ADD Vx, byte)
        //
        // Add value NN to register VX. Carry flag is not set.
        0x7 => {
            op_trace("ADD", op, cpu);

            cpu.registers[vx] = cpu.registers[vx].wrapping_add(nn);
        }
        // Arithmetic instructions identified by n
        0x8 => exec_math(cpu, op, quirks)?,
        // 9XY0 (SNE Vx, Vy)
        //
        // Skip next instruction if Vx != Vy.
        0x9 => {
            op_trace("SNE", op, cpu);

            if cpu.registers[vx] != cpu.registers[vy] {
                cpu.pc += 2;
            }
        }
        // ANNN (LD I, addr)
        //
        // Set address register I to value NNN.
        0xA => {
            op_trace("LD I", op, cpu);

            cpu.address = nnn;
        }
        // BNNN (JP V0, addr)
        //
        // Jump by NNN plus V0, either from the current position or from zero.
        0xB => {
            op_trace("JP V0", op, cpu);

            let offset = cpu.registers[0] as usize + nnn as usize;
            if quirks.jump_relative {
                cpu.pc += offset;
            } else {
                cpu.pc = offset;
            }

            control_flow = Flow::Jump;
        }
        // CXNN (RND Vx, byte)
        //
        // Set register VX to the result of bitwise AND between a random number and NN.
        0xC => {
            op_trace("RND", op, cpu);

            cpu.registers[vx] = nn & rng.gen::<u8>();
        }
        // DXYN (DRW Vx, Vy, nibble)
        //
        // Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
        // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
        // memory pointed to by address register I.
        //
        // If the drawing operation erases existing pixels in the display buffer, register VF is set to
        // 1, and set to 0 if no display bits are unset. This is used for collision detection.
        0xD => {
            op_trace("DRW", op, cpu);

            let (x, y) = (cpu.registers[vx] as usize, cpu.registers[vy] as usize);
            let is_erased = cpu.draw_sprite(x, y, op.n() as usize)?;

            cpu.registers[FLAG_REGISTER] = is_erased as u8;
            control_flow = Flow::Draw;
        }
        // Keyboard and miscellaneous instructions identified by nn
        0xE | 0xF => control_flow = exec_misc(cpu, op, quirks, keypad)?,
        _ => unreachable!("opcode family is a nibble"),
    }

    Ok(control_flow)
}

/// Execute a machine instruction from the `0x0***` range.
#[inline]
fn exec_sys(cpu: &mut Chip8Cpu, op: Opcode) -> Result<Flow, Fault> {
    let mut control_flow = Flow::Ok;

    match op.0 {
        // 00CN (SCD nibble)
        //
        // Scroll the display down by N rows.
        0x00C0..=0x00CF => {
            op_trace("SCD", op, cpu);

            cpu.display.scroll_down(op.n() as usize);
            control_flow = Flow::Draw;
        }
        // 00E0 (CLS)
        //
        // Clear display
        0x00E0 => {
            op_trace("CLS", op, cpu);

            cpu.display.clear();
            control_flow = Flow::Draw;
        }
        // 00EE (RET)
        //
        // Return from a subroutine.
        // Set the program counter to the value at the top of the stack.
        0x00EE => {
            op_trace("RET", op, cpu);

            cpu.pc = cpu.pop()? as usize;
            control_flow = Flow::Jump;
        }
        // 00FB (SCR)
        //
        // Scroll the display right by 4 columns.
        0x00FB => {
            op_trace("SCR", op, cpu);

            cpu.display.scroll_right(SCROLL_COLUMNS);
            control_flow = Flow::Draw;
        }
        // 00FC (SCL)
        //
        // Scroll the display left by 4 columns.
        0x00FC => {
            op_trace("SCL", op, cpu);

            cpu.display.scroll_left(SCROLL_COLUMNS);
            control_flow = Flow::Draw;
        }
        // 00FD (EXIT)
        //
        // Stop the interpreter.
        0x00FD => {
            op_trace("EXIT", op, cpu);

            cpu.running = false;
            control_flow = Flow::Exit;
        }
        // 00FE (LOW), 00FF (HIGH)
        //
        // Extended screen mode is not supported.
        0x00FE | 0x00FF => {
            log::debug!("ignoring extended mode toggle {op} at 0x{:03X}", cpu.pc - 2);
        }
        // 0NNN (SYS addr)
        //
        // Machine code routines of the original hardware can't be run.
        _ => {
            op_trace("SYS", op, cpu);
        }
    }

    Ok(control_flow)
}

/// Execute an arithmetic instruction
#[inline]
fn exec_math(cpu: &mut Chip8Cpu, op: Opcode, quirks: &Quirks) -> Result<(), Fault> {
    debug_assert_eq!(op.family(), 0x8);

    let (vx, vy) = (op.x(), op.y());
    let (x, y) = (cpu.registers[vx], cpu.registers[vy]);

    match op.n() {
        // 8XY0 (LD Vx, Vy)
        //
        // Store the value of register VY in register VX.
        0x0 => {
            op_trace("LD", op, cpu);

            cpu.registers[vx] = y;
        }
        // 8XY1 (OR Vx, Vy)
        0x1 => {
            op_trace("OR", op, cpu);

            cpu.registers[vx] = x | y;
        }
        // 8XY2 (AND Vx, Vy)
        0x2 => {
            op_trace("AND", op, cpu);

            cpu.registers[vx] = x & y;
        }
        // 8XY3 (XOR Vx, Vy)
        0x3 => {
            op_trace("XOR", op, cpu);

            cpu.registers[vx] = x ^ y;
        }
        // 8XY4 (ADD Vx, Vy)
        //
        // ADDs VY to VX, and stores the result in VX.
        // Overflow is wrapped.
        // If overflow, set VF to 1, else 0.
        0x4 => {
            op_trace("ADD", op, cpu);

            let (result, carry) = x.overflowing_add(y);
            cpu.registers[vx] = result;
            cpu.registers[FLAG_REGISTER] = carry as u8;
        }
        // 8XY5 (SUB Vx, Vy)
        //
        // Subtracts VY from VX, and stores the result in VX.
        // VF is set to 0 when there is a borrow, set to 1 when there isn't.
        // The flag is written first, and the operands are read again after it.
        0x5 => {
            op_trace("SUB", op, cpu);

            cpu.registers[FLAG_REGISTER] = (x >= y) as u8;
            cpu.registers[vx] = cpu.registers[vx].wrapping_sub(cpu.registers[vy]);
        }
        // 8XY6 (SHR Vx)
        //
        // Store the least-significant bit of Vx in VF, and shift Vx right by 1.
        // Depending on the quirk, the result is stored in VY or VX.
        0x6 => {
            op_trace("SHR", op, cpu);

            cpu.registers[FLAG_REGISTER] = x & 1;
            let target = if quirks.shift_into_vy { vy } else { vx };
            cpu.registers[target] = cpu.registers[vx] >> 1;
        }
        // 8XY7 (SUBN Vx, Vy)
        //
        // Subtracts VX from VY, and stores the result in VX.
        // VF is set to 0 when there is a borrow, set to 1 when there isn't.
        0x7 => {
            op_trace("SUBN", op, cpu);

            cpu.registers[vx] = y.wrapping_sub(x);
            cpu.registers[FLAG_REGISTER] = (y >= x) as u8;
        }
        // 8XYE (SHL Vx)
        //
        // Store the most-significant bit of Vx in VF, and shift Vx left by 1.
        0xE => {
            op_trace("SHL", op, cpu);

            cpu.registers[FLAG_REGISTER] = x >> 7;
            cpu.registers[vx] <<= 1;
        }
        // ----------------------------------------------------------------
        // Unsupported operation.
        _ => return Err(decode_error(cpu, op)),
    }

    Ok(())
}

/// Execute a keyboard or miscellaneous instruction
#[inline]
fn exec_misc<K>(cpu: &mut Chip8Cpu, op: Opcode, quirks: &Quirks, keypad: &K) -> Result<Flow, Fault>
where
    K: Keypad + ?Sized,
{
    let vx = op.x();

    let mut control_flow = Flow::Ok;

    match (op.family(), op.nn()) {
        // ----------------------------------------------------------------
        // EX9E (SKP Vx)
        //
        // Skip the next instruction if the key in VX is pressed.
        (0xE, 0x9E) => {
            op_trace("SKP", op, cpu);

            if quirks.keypad && keypad.is_pressed(key_in(cpu.registers[vx])) {
                cpu.pc += 2;
            }
        }
        // EXA1 (SKNP Vx)
        //
        // Skip the next instruction if the key in VX is not pressed.
        (0xE, 0xA1) => {
            op_trace("SKNP", op, cpu);

            if quirks.keypad && !keypad.is_pressed(key_in(cpu.registers[vx])) {
                cpu.pc += 2;
            }
        }
        // ----------------------------------------------------------------
        // FX07 (LD Vx, DT)
        //
        // Set Vx = delay timer value.
        (0xF, 0x07) => {
            op_trace("LD DT", op, cpu);

            cpu.registers[vx] = cpu.delay_timer;
        }
        // FX0A (LD Vx, K)
        //
        // Wait for a key press, store the value of the key in Vx.
        // All execution stops until a key is pressed, then the value of that key is stored in Vx.
        (0xF, 0x0A) => {
            op_trace("LD K", op, cpu);

            if quirks.keypad {
                if let Some(k) = keypad.first_pressed() {
                    cpu.registers[vx] = k.as_u8();
                } else {
                    // rewind the program counter to stall the machine
                    cpu.pc -= 2;
                    control_flow = Flow::KeyWait;
                }
            }
        }
        // FX15 (LD DT, Vx)
        //
        // Set delay timer = Vx.
        (0xF, 0x15) => {
            op_trace("LD DT", op, cpu);

            cpu.delay_timer = cpu.registers[vx];
        }
        // FX18 (LD ST, Vx)
        //
        // Set sound timer = Vx.
        (0xF, 0x18) => {
            op_trace("LD ST", op, cpu);

            cpu.sound_timer = cpu.registers[vx];
            control_flow = Flow::Sound;
        }
        // FX1E (ADD I, Vx)
        //
        // Add Vx to I, wrapped by the configured modulus.
        (0xF, 0x1E) => {
            op_trace("ADD I", op, cpu);

            let sum = cpu.address.wrapping_add(cpu.registers[vx] as u16);
            cpu.address = sum.checked_rem(quirks.index_modulus).unwrap_or(sum);
        }
        // FX29 (LD F, Vx)
        //
        // Set I = location of sprite for digit Vx.
        (0xF, 0x29) => {
            op_trace("LD F", op, cpu);

            let x = cpu.registers[vx] as usize;
            cpu.address = (FONTSET_START + x * FONTSET_HEIGHT) as Address;
        }
        // FX33 (LD B, Vx)
        //
        // Store the binary-coded decimal representation of Vx
        // in the memory locations I, I+1, and I+2.
        (0xF, 0x33) => {
            op_trace("LD B", op, cpu);

            let x = cpu.registers[vx];
            let digits = cpu.mem_mut(cpu.address as usize, 3)?;
            digits.copy_from_slice(&[x / 100, x / 10 % 10, x % 10]);
        }
        // FX55 (LD [I], Vx)
        //
        // Store registers V0 through Vx in memory starting at location I.
        // I itself is left unmodified.
        (0xF, 0x55) => {
            op_trace("LD [I]", op, cpu);

            let registers = cpu.registers;
            let dest = cpu.mem_mut(cpu.address as usize, vx + 1)?;
            dest.copy_from_slice(&registers[..=vx]);
        }
        // FX65 (LD Vx, [I])
        //
        // Read registers V0 through Vx from memory starting at location I.
        (0xF, 0x65) => {
            op_trace("LD Vx [I]", op, cpu);

            let mut values = [0; REGISTER_COUNT];
            values[..=vx].copy_from_slice(cpu.mem(cpu.address as usize, vx + 1)?);
            cpu.registers[..=vx].copy_from_slice(&values[..=vx]);
        }
        // ----------------------------------------------------------------
        // Unsupported operation.
        _ => return Err(decode_error(cpu, op)),
    }

    Ok(control_flow)
}

/// Key held in a register. Only the low nibble is used.
#[inline(always)]
fn key_in(register: u8) -> KeyCode {
    KeyCode::try_from(register & 0xF).unwrap_or(KeyCode::Key0)
}

#[inline]
fn decode_error(cpu: &Chip8Cpu, op: Opcode) -> Fault {
    Fault::Decode {
        opcode: op.0,
        address: cpu.pc.saturating_sub(2) as Address,
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(name: &str, op: Opcode, cpu: &Chip8Cpu) {
    log::trace!("{:04X}: {:4} {}", cpu.pc.saturating_sub(2), name, op);
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: &str, _: Opcode, _: &Chip8Cpu) {}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::devices::KeyState;

    struct Harness {
        cpu: Chip8Cpu,
        quirks: Quirks,
        keys: KeyState,
        rng: StdRng,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                cpu: Chip8Cpu::new(),
                quirks: Quirks::default(),
                keys: KeyState::new(),
                rng: StdRng::seed_from_u64(7),
            }
        }

        /// Fetch-side program counter advance, then execute.
        fn exec(&mut self, word: u16) -> Result<Flow, Fault> {
            self.cpu.pc += 2;
            execute(
                &mut self.cpu,
                Opcode(word),
                &self.quirks,
                &self.keys,
                &mut self.rng,
            )
        }

        fn v(&self, index: usize) -> u8 {
            self.cpu.registers[index]
        }
    }

    #[test]
    fn test_load_then_add_wraps() {
        let mut h = Harness::new();

        for (a, b) in [(0x00, 0x00), (0x10, 0x20), (0xFF, 0x01), (0x80, 0x80), (0xFE, 0xFF)] {
            h.exec(0x6300 | a).unwrap();
            h.exec(0x7300 | b).unwrap();
            assert_eq!(h.v(3), (a as u8).wrapping_add(b as u8));
        }
        // The carry flag is not touched by 7XNN.
        assert_eq!(h.v(0xF), 0);
    }

    #[test]
    fn test_add_carry() {
        let mut h = Harness::new();
        h.cpu.registers[1] = 255;
        h.cpu.registers[2] = 1;

        h.exec(0x8124).unwrap();
        assert_eq!(h.v(1), 0);
        assert_eq!(h.v(0xF), 1);

        h.exec(0x8124).unwrap();
        assert_eq!(h.v(1), 1);
        assert_eq!(h.v(0xF), 0);
    }

    #[test]
    fn test_sub_borrow() {
        let mut h = Harness::new();
        h.cpu.registers[1] = 0;
        h.cpu.registers[2] = 1;

        h.exec(0x8125).unwrap();
        assert_eq!(h.v(1), 255);
        assert_eq!(h.v(0xF), 0);

        // Equal operands do not borrow.
        h.cpu.registers[2] = 255;
        h.exec(0x8125).unwrap();
        assert_eq!(h.v(1), 0);
        assert_eq!(h.v(0xF), 1);
    }

    #[test]
    fn test_subn_borrow() {
        let mut h = Harness::new();
        h.cpu.registers[1] = 5;
        h.cpu.registers[2] = 3;

        h.exec(0x8127).unwrap();
        assert_eq!(h.v(1), 254);
        assert_eq!(h.v(0xF), 0);

        h.cpu.registers[1] = 3;
        h.cpu.registers[2] = 5;
        h.exec(0x8127).unwrap();
        assert_eq!(h.v(1), 2);
        assert_eq!(h.v(0xF), 1);
    }

    #[test]
    fn test_bitwise() {
        let mut h = Harness::new();
        h.cpu.registers[4] = 0b1100;
        h.cpu.registers[5] = 0b1010;

        h.exec(0x8451).unwrap();
        assert_eq!(h.v(4), 0b1110);
        h.exec(0x8452).unwrap();
        assert_eq!(h.v(4), 0b1010);
        h.exec(0x8453).unwrap();
        assert_eq!(h.v(4), 0);
        h.exec(0x8450).unwrap();
        assert_eq!(h.v(4), 0b1010);
    }

    #[test]
    fn test_shift_right_into_vy() {
        let mut h = Harness::new();
        h.cpu.registers[1] = 0b0000_0101;

        h.exec(0x8126).unwrap();
        assert_eq!(h.v(1), 0b0000_0101);
        assert_eq!(h.v(2), 0b0000_0010);
        assert_eq!(h.v(0xF), 1);
    }

    #[test]
    fn test_shift_right_into_vx() {
        let mut h = Harness::new();
        h.quirks.shift_into_vy = false;
        h.cpu.registers[1] = 0b0000_0100;
        h.cpu.registers[2] = 0x77;

        h.exec(0x8126).unwrap();
        assert_eq!(h.v(1), 0b0000_0010);
        assert_eq!(h.v(2), 0x77);
        assert_eq!(h.v(0xF), 0);
    }

    #[test]
    fn test_shift_left() {
        let mut h = Harness::new();
        h.cpu.registers[1] = 0b1000_0001;

        h.exec(0x812E).unwrap();
        assert_eq!(h.v(1), 0b0000_0010);
        assert_eq!(h.v(0xF), 1);

        h.exec(0x812E).unwrap();
        assert_eq!(h.v(1), 0b0000_0100);
        assert_eq!(h.v(0xF), 0);
    }

    #[test]
    fn test_sub_into_flag_register() {
        let mut h = Harness::new();
        h.cpu.registers[0xF] = 10;
        h.cpu.registers[1] = 3;

        // No borrow sets VF to 1, then the difference is taken from the new VF.
        h.exec(0x8F15).unwrap();
        assert_eq!(h.v(0xF), 254);

        h.cpu.registers[2] = 7;
        h.cpu.registers[0xF] = 1;
        h.exec(0x82F5).unwrap();
        assert_eq!(h.v(2), 7 - 1);
        assert_eq!(h.v(0xF), 1);
    }

    #[test]
    fn test_shift_with_flag_register() {
        let mut h = Harness::new();
        h.cpu.registers[0xF] = 0x03;

        h.exec(0x8F1E).unwrap();
        assert_eq!(h.v(0xF), 0);

        // VY is the flag register, so the shifted value replaces the flag.
        h.cpu.registers[1] = 0b0000_0111;
        h.exec(0x81F6).unwrap();
        assert_eq!(h.v(0xF), 0b0000_0011);

        // VX is the flag register, so the freshly written flag is shifted.
        h.cpu.registers[0xF] = 0b0000_0101;
        h.exec(0x8F26).unwrap();
        assert_eq!(h.v(2), 0);
        assert_eq!(h.v(0xF), 1);
    }

    #[test]
    fn test_extended_mode_toggles_are_ignored() {
        let mut h = Harness::new();

        for _ in 0..100 {
            assert_eq!(h.exec(0x00FF), Ok(Flow::Ok));
            assert_eq!(h.exec(0x00FE), Ok(Flow::Ok));
        }
        assert!(h.cpu.display.pixels().iter().all(|px| !px));
    }

    #[test]
    fn test_unknown_math_opcode() {
        let mut h = Harness::new();

        assert_eq!(
            h.exec(0x8129),
            Err(Fault::Decode {
                opcode: 0x8129,
                address: MEM_START as Address
            })
        );
    }

    #[test]
    fn test_skips() {
        let mut h = Harness::new();
        h.cpu.registers[0] = 0x42;
        h.cpu.registers[1] = 0x42;

        let start = h.cpu.pc;
        h.exec(0x3042).unwrap(); // SE taken
        assert_eq!(h.cpu.pc, start + 4);
        h.exec(0x3043).unwrap(); // SE not taken
        assert_eq!(h.cpu.pc, start + 6);
        h.exec(0x4043).unwrap(); // SNE taken
        assert_eq!(h.cpu.pc, start + 10);
        h.exec(0x5010).unwrap(); // SE Vx, Vy taken
        assert_eq!(h.cpu.pc, start + 14);
        h.exec(0x9010).unwrap(); // SNE Vx, Vy not taken
        assert_eq!(h.cpu.pc, start + 16);
    }

    #[test]
    fn test_jump() {
        let mut h = Harness::new();

        assert_eq!(h.exec(0x1ABC), Ok(Flow::Jump));
        assert_eq!(h.cpu.pc, 0xABC);
    }

    #[test]
    fn test_jump_v0_relative() {
        let mut h = Harness::new();
        h.cpu.registers[0] = 0x04;

        h.exec(0xB010).unwrap();
        assert_eq!(h.cpu.pc, MEM_START + 2 + 0x14);
    }

    #[test]
    fn test_jump_v0_absolute() {
        let mut h = Harness::new();
        h.quirks.jump_relative = false;
        h.cpu.registers[0] = 0x04;

        h.exec(0xB300).unwrap();
        assert_eq!(h.cpu.pc, 0x304);
    }

    #[test]
    fn test_call_return() {
        let mut h = Harness::new();
        let sp = h.cpu.sp;

        assert_eq!(h.exec(0x2400), Ok(Flow::Jump));
        assert_eq!(h.cpu.pc, 0x400);
        assert_eq!(h.cpu.sp, sp + 1);

        assert_eq!(h.exec(0x00EE), Ok(Flow::Jump));
        assert_eq!(h.cpu.pc, MEM_START + 2);
        assert_eq!(h.cpu.sp, sp);
    }

    #[test]
    fn test_return_underflow() {
        let mut h = Harness::new();

        assert_eq!(h.exec(0x00EE), Err(Fault::StackUnderflow));
    }

    #[test]
    fn test_call_overflow() {
        let mut h = Harness::new();

        for _ in 0..STACK_SIZE {
            h.exec(0x2200).unwrap();
        }
        assert_eq!(h.exec(0x2200), Err(Fault::StackOverflow));
    }

    #[test]
    fn test_random_masked() {
        let mut h = Harness::new();

        for _ in 0..32 {
            h.exec(0xC50F).unwrap();
            assert_eq!(h.v(5) & 0xF0, 0);
        }
        h.exec(0xC500).unwrap();
        assert_eq!(h.v(5), 0);
    }

    #[test]
    fn test_draw_sets_collision() {
        let mut h = Harness::new();
        h.cpu.load(0x300, &[0xC0]).unwrap();
        h.exec(0xA300).unwrap();
        h.cpu.registers[0] = 10;
        h.cpu.registers[1] = 4;

        assert_eq!(h.exec(0xD011), Ok(Flow::Draw));
        assert_eq!(h.v(0xF), 0);
        assert!(h.cpu.display.pixel(10, 4));
        assert!(h.cpu.display.pixel(11, 4));

        h.exec(0xD011).unwrap();
        assert_eq!(h.v(0xF), 1);
        assert!(!h.cpu.display.pixel(10, 4));
    }

    #[test]
    fn test_draw_out_of_bounds() {
        let mut h = Harness::new();
        h.cpu.load(0x300, &[0xFF]).unwrap();
        h.exec(0xA300).unwrap();
        h.cpu.registers[0] = 60;
        h.cpu.registers[0xF] = 0x33;

        assert_eq!(h.exec(0xD011), Err(Fault::Sprite { x: 60, y: 0 }));
        assert_eq!(h.v(0xF), 0x33);
    }

    #[test]
    fn test_clear_and_scroll() {
        let mut h = Harness::new();
        h.cpu.display.draw_sprite(0, 0, &[0x80]).unwrap();

        assert_eq!(h.exec(0x00C2), Ok(Flow::Draw));
        assert!(h.cpu.display.pixel(0, 2));

        h.exec(0x00FB).unwrap();
        assert!(h.cpu.display.pixel(4, 2));

        h.exec(0x00FC).unwrap();
        h.exec(0x00FC).unwrap();
        assert!(!h.cpu.display.pixel(0, 2));
        assert!(!h.cpu.display.pixel(4, 2));

        h.cpu.display.draw_sprite(8, 8, &[0xFF]).unwrap();
        h.exec(0x00E0).unwrap();
        assert!(h.cpu.display.pixels().iter().all(|px| !px));
    }

    #[test]
    fn test_exit() {
        let mut h = Harness::new();

        assert_eq!(h.exec(0x00FD), Ok(Flow::Exit));
        assert!(!h.cpu.running);
    }

    #[test]
    fn test_inert_opcodes() {
        let mut h = Harness::new();

        for word in [0x00FE, 0x00FF, 0x0123, 0x0000, 0xE09E, 0xE0A1, 0xF00A] {
            let pc = h.cpu.pc;
            assert_eq!(h.exec(word), Ok(Flow::Ok), "{word:04X}");
            assert_eq!(h.cpu.pc, pc + 2);
        }
        assert!(h.cpu.running);
    }

    #[test]
    fn test_unknown_key_and_misc_opcodes() {
        let mut h = Harness::new();

        assert!(matches!(h.exec(0xE0FF), Err(Fault::Decode { opcode: 0xE0FF, .. })));
        assert!(matches!(h.exec(0xF0FF), Err(Fault::Decode { opcode: 0xF0FF, .. })));
    }

    #[test]
    fn test_key_skips() {
        let mut h = Harness::new();
        h.quirks.keypad = true;
        h.cpu.registers[2] = 0x0B;
        h.keys.set(KeyCode::KeyB, true);

        let pc = h.cpu.pc;
        h.exec(0xE29E).unwrap();
        assert_eq!(h.cpu.pc, pc + 4);
        h.exec(0xE2A1).unwrap();
        assert_eq!(h.cpu.pc, pc + 6);

        h.keys.set(KeyCode::KeyB, false);
        h.exec(0xE2A1).unwrap();
        assert_eq!(h.cpu.pc, pc + 10);
    }

    #[test]
    fn test_key_wait() {
        let mut h = Harness::new();
        h.quirks.keypad = true;

        let pc = h.cpu.pc;
        assert_eq!(h.exec(0xF30A), Ok(Flow::KeyWait));
        assert_eq!(h.cpu.pc, pc);
        assert_eq!(h.v(3), 0);

        h.keys.set(KeyCode::Key9, true);
        assert_eq!(h.exec(0xF30A), Ok(Flow::Ok));
        assert_eq!(h.cpu.pc, pc + 2);
        assert_eq!(h.v(3), 9);
    }

    #[test]
    fn test_timers() {
        let mut h = Harness::new();
        h.cpu.registers[6] = 30;

        h.exec(0xF615).unwrap();
        assert_eq!(h.cpu.delay_timer, 30);
        assert_eq!(h.exec(0xF618), Ok(Flow::Sound));
        assert_eq!(h.cpu.sound_timer, 30);

        h.cpu.delay_timer = 12;
        h.exec(0xF707).unwrap();
        assert_eq!(h.v(7), 12);
    }

    #[test]
    fn test_add_index_wraps() {
        let mut h = Harness::new();
        h.cpu.registers[1] = 0x10;

        h.exec(0xA0F8).unwrap();
        h.exec(0xF11E).unwrap();
        assert_eq!(h.cpu.address, (0xF8 + 0x10) % INDEX_WRAP_MODULUS);

        h.quirks.index_modulus = MEM_SIZE as u16;
        h.exec(0xAFF8).unwrap();
        h.exec(0xF11E).unwrap();
        assert_eq!(h.cpu.address, 0x008);

        h.quirks.index_modulus = 0;
        h.exec(0xAFF8).unwrap();
        h.exec(0xF11E).unwrap();
        assert_eq!(h.cpu.address, 0x1008);
    }

    #[test]
    fn test_font_address() {
        let mut h = Harness::new();
        h.cpu.load(FONTSET_START, &FONTSET).unwrap();
        h.cpu.registers[0] = 0xA;

        h.exec(0xF029).unwrap();
        assert_eq!(h.cpu.address, 50);
        assert_eq!(h.cpu.mem(50, 5).unwrap(), &FONTSET[50..55]);
    }

    #[test]
    fn test_bcd() {
        let mut h = Harness::new();
        h.cpu.registers[4] = 123;

        h.exec(0xA300).unwrap();
        h.exec(0xF433).unwrap();
        assert_eq!(h.cpu.mem(0x300, 3).unwrap(), &[1, 2, 3]);

        h.cpu.registers[4] = 7;
        h.exec(0xF433).unwrap();
        assert_eq!(h.cpu.mem(0x300, 3).unwrap(), &[0, 0, 7]);
    }

    #[test]
    fn test_bcd_out_of_bounds() {
        let mut h = Harness::new();

        h.exec(0xAFFE).unwrap();
        assert_eq!(
            h.exec(0xF033),
            Err(Fault::Memory {
                address: 0xFFE,
                len: 3
            })
        );
    }

    #[test]
    fn test_store_and_load_registers() {
        let mut h = Harness::new();
        for i in 0..REGISTER_COUNT {
            h.cpu.registers[i] = i as u8 * 3;
        }

        h.exec(0xA400).unwrap();
        h.exec(0xF355).unwrap();
        assert_eq!(h.cpu.mem(0x400, 5).unwrap(), &[0, 3, 6, 9, 0]);
        assert_eq!(h.cpu.address, 0x400);

        h.cpu.load(0x500, &[0xAA, 0xBB]).unwrap();
        h.exec(0xA500).unwrap();
        h.exec(0xF165).unwrap();
        assert_eq!(h.v(0), 0xAA);
        assert_eq!(h.v(1), 0xBB);
        assert_eq!(h.v(2), 6);
    }
}
