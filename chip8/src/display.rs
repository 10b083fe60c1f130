//! Logical display canvas.
use std::fmt::{self, Write};

use crate::constants::*;

/// Monochrome 64x32 pixel bitmap.
///
/// This is the logical canvas the VM draws to. Scaling and presenting
/// it to a screen is left to the host.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
        }
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline(always)]
    fn index(x: usize, y: usize) -> usize {
        (x & DISPLAY_WIDTH_MASK) + (y & DISPLAY_HEIGHT_MASK) * DISPLAY_WIDTH
    }

    /// XOR a single pixel, wrapping coordinates around the edges.
    ///
    /// Returns `true` if the pixel was erased.
    pub fn toggle_pixel(&mut self, x: usize, y: usize) -> bool {
        let d = Self::index(x, y);
        let old_px = self.pixels[d];
        self.pixels[d] = !old_px;
        old_px
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[Self::index(x, y)]
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// Check whether no pixel is set.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|px| !px)
    }

    pub fn pixels(&self) -> &[bool; DISPLAY_BUFFER_SIZE] {
        &self.pixels
    }

    /// Returns the canvas as a human readable string.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT);

        for row in self.pixels.chunks(DISPLAY_WIDTH) {
            for px in row {
                buf.write_char(if *px { '#' } else { '.' })?;
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_toggle_reports_erase() {
        let mut fb = Framebuffer::new();

        assert!(!fb.toggle_pixel(3, 4));
        assert!(fb.pixel(3, 4));
        assert!(fb.toggle_pixel(3, 4));
        assert!(!fb.pixel(3, 4));
        assert!(fb.is_blank());
    }

    #[test]
    fn test_toggle_wraps() {
        let mut fb = Framebuffer::new();

        fb.toggle_pixel(DISPLAY_WIDTH + 1, DISPLAY_HEIGHT + 2);
        assert!(fb.pixel(1, 2));

        fb.toggle_pixel(DISPLAY_WIDTH - 1, 0);
        assert!(fb.pixels()[DISPLAY_WIDTH - 1]);
    }

    #[test]
    fn test_dump() {
        let mut fb = Framebuffer::new();
        fb.toggle_pixel(0, 0);
        fb.toggle_pixel(2, 0);

        let dump = fb.dump().unwrap();
        let first = dump.lines().next().unwrap();
        assert_eq!(&first[..4], "#.#.");
        assert_eq!(dump.lines().count(), DISPLAY_HEIGHT);
    }
}
