use crate::render::{
    Frame, Renderer, TrueColorPen, begin_frame, draw_overlay_popup, end_frame, write_hud, write_size_mismatch,
};
use std::io::Write;

/// Braille dot bit for each position of a 2x4 block, row-major.
const DOT_BITS: [u8; 8] = [0x01, 0x08, 0x02, 0x10, 0x04, 0x20, 0x40, 0x80];

/// One terminal cell per 2x4 canvas pixels. Pixels brighter than the block's
/// mid luma become raised dots in the averaged "on" color.
pub struct BrailleRenderer {
    pen: TrueColorPen,
}

impl BrailleRenderer {
    pub fn new() -> Self {
        Self {
            pen: TrueColorPen::default(),
        }
    }
}

impl Default for BrailleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct ColorSum {
    r: u32,
    g: u32,
    b: u32,
    n: u32,
}

impl ColorSum {
    fn add(&mut self, (r, g, b): (u8, u8, u8)) {
        self.r += r as u32;
        self.g += g as u32;
        self.b += b as u32;
        self.n += 1;
    }

    fn mean(&self) -> Option<(u8, u8, u8)> {
        (self.n > 0).then(|| ((self.r / self.n) as u8, (self.g / self.n) as u8, (self.b / self.n) as u8))
    }
}

/// Glyph plus foreground and background for one 2x4 block.
fn encode_block(rgb: &[(u8, u8, u8); 8]) -> (char, (u8, u8, u8), (u8, u8, u8)) {
    let lum = rgb.map(|(r, g, b)| luma(r, g, b));
    let lo = lum.iter().copied().min().unwrap_or(0);
    let hi = lum.iter().copied().max().unwrap_or(0);
    let thr = (lo + hi) / 2;

    let mut bits = 0u8;
    let (mut on, mut off) = (ColorSum::default(), ColorSum::default());
    for i in 0..8 {
        if lum[i] > thr {
            bits |= DOT_BITS[i];
            on.add(rgb[i]);
        } else {
            off.add(rgb[i]);
        }
    }

    let bg = off.mean().unwrap_or((0, 0, 0));
    if bits == 0 {
        return (' ', bg, bg);
    }
    let fg = on.mean().unwrap_or(bg);
    let bg = off.mean().unwrap_or(fg);
    (char::from_u32(0x2800 + bits as u32).unwrap_or(' '), fg, bg)
}

impl Renderer for BrailleRenderer {
    fn name(&self) -> &'static str {
        "braille"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let visual_rows = frame.visual_rows as usize;
        let (w, h) = (frame.pixel_width, frame.pixel_height);

        if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
            return Ok(());
        }
        if w != cols.saturating_mul(2) || h != visual_rows.saturating_mul(4) {
            return Ok(());
        }
        let need = w.saturating_mul(h).saturating_mul(4);
        if frame.pixels_rgba.len() < need {
            write_size_mismatch(out, frame, need)?;
            return Ok(());
        }

        begin_frame(out, frame.sync_updates)?;
        out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")?;
        self.pen.reset();

        for row in 0..visual_rows {
            for col in 0..cols {
                let mut rgb = [(0u8, 0u8, 0u8); 8];
                for (i, px) in rgb.iter_mut().enumerate() {
                    let idx = ((row * 4 + i / 2) * w + col * 2 + i % 2) * 4;
                    *px = (frame.pixels_rgba[idx], frame.pixels_rgba[idx + 1], frame.pixels_rgba[idx + 2]);
                }
                let (ch, fg, bg) = encode_block(&rgb);
                self.pen.paint(out, fg, bg, ch)?;
            }
            out.write_all(b"\r\n")?;
        }

        write_hud(out, frame)?;
        if let Some(text) = frame.overlay {
            draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
        }
        out.write_all(b"\x1b[?7h")?;
        end_frame(out, frame.sync_updates)?;
        Ok(())
    }
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u16 {
    // Rec.709 weights in 8-bit fixed point.
    ((r as u32 * 54 + g as u32 * 183 + b as u32 * 19) >> 8) as u16
}
