//! Monochrome display buffer.
use std::fmt;

use crate::{constants::*, error::Fault};

/// Read-only view of the pixel grid, row-major.
pub type Chip8DisplayBuffer<'a> = &'a [bool; DISPLAY_BUFFER_SIZE];

/// Pixel grid that instructions draw to.
///
/// The buffer keeps a repaint flag that is raised on every mutation,
/// and lowered when the renderer consumes it with [`DisplayBuffer::take_repaint`].
pub struct DisplayBuffer {
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
    repaint: bool,
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
            repaint: false,
        }
    }
}

impl DisplayBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn pixels(&self) -> Chip8DisplayBuffer {
        &self.pixels
    }

    /// Pixel state at the given coordinate. Coordinates outside the grid are off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT && self.pixels[x + y * DISPLAY_WIDTH]
    }

    /// Whether the buffer changed since the renderer last looked.
    pub fn needs_repaint(&self) -> bool {
        self.repaint
    }

    /// Consume the repaint flag.
    pub fn take_repaint(&mut self) -> bool {
        std::mem::take(&mut self.repaint)
    }

    /// Turn every pixel off.
    pub fn clear(&mut self) {
        self.pixels.fill(false);
        self.repaint = true;
    }

    /// Erase the buffer without signalling the renderer.
    pub(crate) fn reset(&mut self) {
        self.pixels.fill(false);
        self.repaint = false;
    }

    /// Shift the contents down by `n` rows. Vacated rows at the top are cleared.
    pub fn scroll_down(&mut self, n: usize) {
        let n = n.min(DISPLAY_HEIGHT);
        let shift = n * DISPLAY_WIDTH;

        self.pixels.copy_within(0..DISPLAY_BUFFER_SIZE - shift, shift);
        self.pixels[..shift].fill(false);
        self.repaint = true;
    }

    /// Shift the contents left by `n` columns. Vacated columns on the right are cleared.
    pub fn scroll_left(&mut self, n: usize) {
        let n = n.min(DISPLAY_WIDTH);

        for row in self.pixels.chunks_exact_mut(DISPLAY_WIDTH) {
            row.copy_within(n.., 0);
            row[DISPLAY_WIDTH - n..].fill(false);
        }
        self.repaint = true;
    }

    /// Shift the contents right by `n` columns. Vacated columns on the left are cleared.
    pub fn scroll_right(&mut self, n: usize) {
        let n = n.min(DISPLAY_WIDTH);

        for row in self.pixels.chunks_exact_mut(DISPLAY_WIDTH) {
            row.copy_within(..DISPLAY_WIDTH - n, n);
            row[..n].fill(false);
        }
        self.repaint = true;
    }

    /// XOR an 8 pixel wide sprite onto the buffer, one byte per row.
    ///
    /// Returns `true` when a pixel that was on is turned off.
    ///
    /// Sprites are not clipped or wrapped. Every set bit must land inside the
    /// grid, otherwise nothing is drawn and a [`Fault::Sprite`] is returned.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> Result<bool, Fault> {
        let set_bits = || {
            rows.iter().enumerate().flat_map(move |(r, row)| {
                (0..SPRITE_WIDTH)
                    .filter(move |c| (row >> (7 - c)) & 1 != 0)
                    .map(move |c| (x + c, y + r))
            })
        };

        if set_bits().any(|(px, py)| px >= DISPLAY_WIDTH || py >= DISPLAY_HEIGHT) {
            return Err(Fault::Sprite { x, y });
        }

        let mut is_erased = false;
        for (px, py) in set_bits() {
            let d = px + py * DISPLAY_WIDTH;
            // XOR erases a pixel when both the old and new values are both 1.
            is_erased |= self.pixels[d];
            self.pixels[d] = !self.pixels[d];
        }

        self.repaint = true;
        Ok(is_erased)
    }
}

impl fmt::Display for DisplayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.pixels.chunks_exact(DISPLAY_WIDTH) {
            for px in row {
                f.write_str(if *px { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
