//! Terminal presenters: turn a finished RGBA canvas into escape sequences.

mod braille;
mod halfblock;
mod kitty;

pub use braille::BrailleRenderer;
pub use halfblock::HalfBlockRenderer;
pub use kitty::KittyRenderer;

use crate::config::RendererMode;
use std::io::Write;

pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    /// Terminal rows covered by the image; the HUD sits below.
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    pub hud: &'a str,
    pub hud_rows: u16,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

/// Canvas pixels per terminal cell for a presenter.
pub fn pixels_per_cell(mode: RendererMode) -> (usize, usize) {
    match mode {
        RendererMode::HalfBlock => (1, 2),
        RendererMode::Braille | RendererMode::Kitty => (2, 4),
    }
}

pub fn make_renderer(mode: RendererMode) -> Box<dyn Renderer> {
    match mode {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Braille => Box::new(BrailleRenderer::new()),
        RendererMode::Kitty => Box::new(KittyRenderer::new()),
    }
}

pub(crate) fn begin_frame(out: &mut dyn Write, sync_updates: bool) -> std::io::Result<()> {
    if sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    Ok(())
}

pub(crate) fn end_frame(out: &mut dyn Write, sync_updates: bool) -> std::io::Result<()> {
    if sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()
}

/// Replace the whole screen with a one-line diagnostic.
pub(crate) fn write_size_mismatch(out: &mut dyn Write, frame: &Frame<'_>, need: usize) -> std::io::Result<()> {
    begin_frame(out, frame.sync_updates)?;
    out.write_all(b"\x1b[H\x1b[0m\x1b[2J")?;
    write!(out, "pixel buffer too small (need {}, got {})", need, frame.pixels_rgba.len())?;
    end_frame(out, frame.sync_updates)
}

/// Clear terminal row `row` (1-based) and print `line` clipped to `cols` characters.
pub fn write_hud_line(out: &mut dyn Write, row: usize, cols: usize, line: Option<&str>) -> std::io::Result<()> {
    write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", row)?;
    if let Some(line) = line {
        let end = line.char_indices().nth(cols).map(|(i, _)| i).unwrap_or(line.len());
        out.write_all(line[..end].as_bytes())?;
    }
    Ok(())
}

pub(crate) fn write_hud(out: &mut dyn Write, frame: &Frame<'_>) -> std::io::Result<()> {
    let mut lines = frame.hud.lines();
    for i in 0..frame.hud_rows as usize {
        write_hud_line(out, frame.visual_rows as usize + i + 1, frame.term_cols as usize, lines.next())?;
    }
    Ok(())
}

/// Truecolor SGR writer that skips redundant color changes within a frame.
#[derive(Default)]
pub(crate) struct TrueColorPen {
    fg: Option<(u8, u8, u8)>,
    bg: Option<(u8, u8, u8)>,
}

impl TrueColorPen {
    pub(crate) fn reset(&mut self) {
        self.fg = None;
        self.bg = None;
    }

    pub(crate) fn paint(
        &mut self,
        out: &mut dyn Write,
        fg: (u8, u8, u8),
        bg: (u8, u8, u8),
        ch: char,
    ) -> std::io::Result<()> {
        if self.fg != Some(fg) {
            write!(out, "\x1b[38;2;{};{};{}m", fg.0, fg.1, fg.2)?;
            self.fg = Some(fg);
        }
        if self.bg != Some(bg) {
            write!(out, "\x1b[48;2;{};{};{}m", bg.0, bg.1, bg.2)?;
            self.bg = Some(bg);
        }
        let mut buf = [0u8; 4];
        out.write_all(ch.encode_utf8(&mut buf).as_bytes())
    }
}

/// Centered help box over a dark backdrop. The first line is the title.
pub fn draw_overlay_popup(out: &mut dyn Write, term_cols: u16, term_rows: u16, text: &str) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let max_inner_w = cols.saturating_sub(6).max(1);
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let chars: Vec<char> = raw.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(max_inner_w) {
            lines.push(chunk.iter().collect());
        }
    }

    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let box_w = (widest.clamp(1, max_inner_w) + 4).min(cols.saturating_sub(2)).max(4);
    let inner_w = box_w.saturating_sub(4);
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = (body_h + 2).min(rows.saturating_sub(1)).max(3);

    let start_col = cols.saturating_sub(box_w) / 2 + 1;
    let start_row = rows.saturating_sub(box_h) / 2 + 1;
    let horiz = "-".repeat(box_w.saturating_sub(2));
    let blank = " ".repeat(inner_w);

    out.write_all(b"\x1b[0m\x1b[38;2;220;228;242m\x1b[48;2;2;4;10m")?;
    for row in 1..=rows {
        write!(out, "\x1b[{};1H\x1b[2K", row)?;
    }

    out.write_all(b"\x1b[0m\x1b[38;2;236;242;255m\x1b[48;2;10;14;24m")?;
    write!(out, "\x1b[{};{}H+{}+", start_row, start_col, horiz)?;
    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = start_row + 1 + i;
        write!(out, "\x1b[{};{}H| {} |", row, start_col, blank)?;
        if i == 0 {
            write!(
                out,
                "\x1b[{};{}H\x1b[1m\x1b[38;2;160;255;160m{}\x1b[22m\x1b[38;2;236;242;255m",
                row,
                start_col + 2,
                line
            )?;
        } else {
            write!(out, "\x1b[{};{}H{}", row, start_col + 2, line)?;
        }
    }
    write!(out, "\x1b[{};{}H+{}+", start_row + box_h - 1, start_col, horiz)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}
