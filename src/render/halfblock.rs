use crate::render::{
    Frame, Renderer, TrueColorPen, begin_frame, draw_overlay_popup, end_frame, write_hud, write_size_mismatch,
};
use std::io::Write;

/// One terminal cell per 1x2 canvas pixels: `▀` with the top pixel as
/// foreground and the bottom pixel as background.
pub struct HalfBlockRenderer {
    pen: TrueColorPen,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            pen: TrueColorPen::default(),
        }
    }
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "half-block"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let visual_rows = frame.visual_rows as usize;
        let (w, h) = (frame.pixel_width, frame.pixel_height);

        if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
            return Ok(());
        }
        if w != cols || h != visual_rows.saturating_mul(2) {
            // Canvas and terminal disagree mid-resize; the next frame catches up.
            return Ok(());
        }
        let need = w.saturating_mul(h).saturating_mul(4);
        if frame.pixels_rgba.len() < need {
            write_size_mismatch(out, frame, need)?;
            return Ok(());
        }

        begin_frame(out, frame.sync_updates)?;
        // Home, reset, autowrap off while painting full-width rows.
        out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")?;
        self.pen.reset();

        let px = |x: usize, y: usize| {
            let i = (y * w + x) * 4;
            (frame.pixels_rgba[i], frame.pixels_rgba[i + 1], frame.pixels_rgba[i + 2])
        };
        for row in 0..visual_rows {
            for x in 0..cols {
                self.pen.paint(out, px(x, row * 2), px(x, row * 2 + 1), '\u{2580}')?;
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
