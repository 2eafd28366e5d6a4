//! Terminal output devices.
use std::io::{self, Write};

use schip8::{Devices, DisplayBuffer};

/// ASCII escape to clear the screen and move the cursor home.
const CLEAR: &str = "\x1B[2J\x1B[H";
/// ASCII bell.
const BELL: &[u8] = b"\x07";

/// Draws the display as text on standard output, and rings the terminal bell.
///
/// There is no keyboard input.
pub struct Terminal<W: Write> {
    out: W,
}

impl Terminal<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write_frame(&mut self, display: &DisplayBuffer) -> io::Result<()> {
        write!(self.out, "{CLEAR}{display}")?;
        self.out.flush()
    }
}

impl<W: Write> Devices for Terminal<W> {
    fn draw(&mut self, display: &DisplayBuffer) {
        if let Err(err) = self.write_frame(display) {
            log::warn!("failed to draw frame: {err}");
        }
    }

    fn beep(&mut self) {
        if let Err(err) = self.out.write_all(BELL).and_then(|_| self.out.flush()) {
            log::warn!("failed to ring bell: {err}");
        }
    }
}
