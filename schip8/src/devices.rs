//! IO device interface
use crate::{constants::*, display::DisplayBuffer};

/// Hooks to provide IO devices to the virtual machine.
///
/// The cycle driver calls these between instructions. None of them
/// are allowed to block for longer than a cycle.
pub trait Devices {
    /// Update the keyboard state before the next instruction.
    fn poll_keys(&mut self, _keys: &mut KeyState) {}

    /// Blit the display buffer to screen output.
    fn draw(&mut self, display: &DisplayBuffer);

    /// Emit one beep. Called when the sound timer runs out.
    fn beep(&mut self);

    /// Checked at the top of every cycle. Returning `true` stops the driver.
    fn stop_requested(&self) -> bool {
        false
    }
}

/// Devices that ignore all output and never press a key.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDevices;

impl Devices for NullDevices {
    fn draw(&mut self, _display: &DisplayBuffer) {}

    fn beep(&mut self) {}
}

/// Source of keyboard state for the key dependent instructions.
pub trait Keypad {
    /// Checks immediately whether the given key is currently pressed.
    fn is_pressed(&self, key: KeyCode) -> bool;

    /// The lowest key that is pressed down, if any.
    fn first_pressed(&self) -> Option<KeyCode> {
        KeyCode::ALL.into_iter().find(|k| self.is_pressed(*k))
    }
}

/// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyState(u16);

impl KeyState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.0 |= 1 << key.as_u8();
        } else {
            self.0 &= !(1 << key.as_u8());
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any(&self) -> bool {
        self.0 > 0
    }

    /// Set all keys to up.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    #[inline(always)]
    pub fn bits(&self) -> u16 {
        self.0
    }
}

impl Keypad for KeyState {
    fn is_pressed(&self, key: KeyCode) -> bool {
        self.0 & (1 << key.as_u8()) > 0
    }

    #[inline]
    fn first_pressed(&self) -> Option<KeyCode> {
        if self.any() {
            KeyCode::try_from(self.0.trailing_zeros() as u8).ok()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyCode {
    Key0 = 0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF = 0xF,
}

impl KeyCode {
    /// Every key, indexed by its hex value.
    #[rustfmt::skip]
    pub const ALL: [KeyCode; KEY_COUNT as usize] = [
        Self::Key0, Self::Key1, Self::Key2, Self::Key3,
        Self::Key4, Self::Key5, Self::Key6, Self::Key7,
        Self::Key8, Self::Key9, Self::KeyA, Self::KeyB,
        Self::KeyC, Self::KeyD, Self::KeyE, Self::KeyF,
    ];

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let key_id = self.as_u8();
        write!(f, "k{key_id:x}")
    }
}

impl From<KeyCode> for u8 {
    fn from(keycode: KeyCode) -> Self {
        keycode.as_u8()
    }
}

impl TryFrom<u8> for KeyCode {
    type Error = InvalidKeyCode;

    fn try_from(key_id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(key_id as usize)
            .copied()
            .ok_or(InvalidKeyCode)
    }
}

#[derive(Debug)]
pub struct InvalidKeyCode;

impl std::error::Error for InvalidKeyCode {}

impl std::fmt::Display for InvalidKeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "keycode must be in range 0 <= keycode < 16")
    }
}
