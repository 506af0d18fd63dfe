use crate::color::{Rgb, Rgba};
use crate::surface::{Path, RectF, Surface};
use embedded_graphics::Drawable;
use embedded_graphics::Pixel;
use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{OriginDimensions, Point, Size};
use embedded_graphics::mono_font::ascii::{
    FONT_4X6, FONT_5X8, FONT_6X10, FONT_6X12, FONT_8X13, FONT_9X15, FONT_9X18, FONT_10X20,
};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::text::{Baseline, Text};
use std::convert::Infallible;

/// Software RGBA raster. Pixels stay opaque; drawing blends source-over.
pub struct PixelCanvas {
    width: usize,
    height: usize,
    background: Rgb,
    pixels: Vec<u8>,
}

impl PixelCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_background(width, height, Rgb::new(0, 0, 0))
    }

    pub fn with_background(width: usize, height: usize, background: Rgb) -> Self {
        let mut canvas = Self {
            width,
            height,
            background,
            pixels: vec![0u8; width.saturating_mul(height).saturating_mul(4)],
        };
        canvas.clear();
        canvas
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0u8; width.saturating_mul(height).saturating_mul(4)];
        self.clear();
    }

    pub fn pixels_rgba(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    #[inline]
    fn blend(&mut self, x: usize, y: usize, color: Rgba, coverage: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let a = (color.a * coverage).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let i = (y * self.width + x) * 4;
        for (k, src) in [color.r, color.g, color.b].into_iter().enumerate() {
            let dst = self.pixels[i + k] as f32;
            self.pixels[i + k] = (dst + (src as f32 - dst) * a).round().clamp(0.0, 255.0) as u8;
        }
        self.pixels[i + 3] = 255;
    }

    /// Pixel range covered by `[lo, hi)` on an axis of length `len`.
    fn span(lo: f32, hi: f32, len: usize) -> std::ops::Range<usize> {
        let a = lo.max(0.0).floor() as usize;
        let b = (hi.min(len as f32).ceil().max(0.0) as usize).min(len);
        a.min(b)..b
    }

    fn fill_polygon(&mut self, pts: &[(f32, f32)], color: Rgba) {
        const SUB: usize = 4;
        if pts.len() < 3 || pts.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return;
        }
        let (mut min_x, mut max_x) = (f32::MAX, f32::MIN);
        let (mut min_y, mut max_y) = (f32::MAX, f32::MIN);
        for &(x, y) in pts {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        let cols = Self::span(min_x, max_x, self.width);
        let rows = Self::span(min_y, max_y, self.height);
        if cols.is_empty() || rows.is_empty() {
            return;
        }

        let x0 = cols.start;
        let mut cov = vec![0.0f32; cols.len()];
        let mut xs: Vec<f32> = Vec::with_capacity(pts.len());
        let n = pts.len();
        for py in rows {
            cov.fill(0.0);
            for s in 0..SUB {
                let sy = py as f32 + (s as f32 + 0.5) / SUB as f32;
                xs.clear();
                for i in 0..n {
                    let (ax, ay) = pts[i];
                    let (bx, by) = pts[(i + 1) % n];
                    if (ay <= sy && by > sy) || (by <= sy && ay > sy) {
                        let t = (sy - ay) / (by - ay);
                        xs.push(ax + t * (bx - ax));
                    }
                }
                xs.sort_by(|a, b| a.total_cmp(b));
                for pair in xs.chunks_exact(2) {
                    let l = pair[0].max(cols.start as f32);
                    let r = pair[1].min(cols.end as f32);
                    if r <= l {
                        continue;
                    }
                    let first = l.floor() as usize;
                    let last = (r.ceil() as usize).min(cols.end);
                    for px in first..last {
                        let c = ((px + 1) as f32).min(r) - (px as f32).max(l);
                        cov[px - x0] += c.clamp(0.0, 1.0) / SUB as f32;
                    }
                }
            }
            for (i, c) in cov.iter().enumerate() {
                if *c > 0.0 {
                    self.blend(x0 + i, py, color, c.min(1.0));
                }
            }
        }
    }

    fn draw_block_glyph(&mut self, glyph: BlockGlyph, cell: RectF, color: Rgba) {
        match glyph {
            BlockGlyph::Full => self.fill_rect(cell, color),
            BlockGlyph::Lower(eighths) => {
                let h = cell.h * eighths as f32 / 8.0;
                self.fill_rect(RectF::new(cell.x, cell.y + cell.h - h, cell.w, h), color);
            }
            BlockGlyph::Shade(density) => {
                if cell.w < 3.0 || cell.h < 3.0 {
                    self.fill_rect(cell, color.scale_alpha(density));
                    return;
                }
                // Ordered 2x2 stipple.
                const BAYER: [f32; 4] = [0.0, 0.5, 0.75, 0.25];
                let cols = Self::span(cell.x, cell.x + cell.w, self.width);
                for py in Self::span(cell.y, cell.y + cell.h, self.height) {
                    for px in cols.clone() {
                        if density > BAYER[(py % 2) * 2 + px % 2] {
                            self.blend(px, py, color, 1.0);
                        }
                    }
                }
            }
        }
    }
}

impl Surface for PixelCanvas {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn clear(&mut self) {
        let bg = self.background;
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = bg.r;
            px[1] = bg.g;
            px[2] = bg.b;
            px[3] = 255;
        }
    }

    fn clear_rect(&mut self, rect: RectF) {
        if rect.is_empty() {
            return;
        }
        let bg = self.background;
        let cols = Self::span(rect.x.round(), (rect.x + rect.w).round(), self.width);
        for py in Self::span(rect.y.round(), (rect.y + rect.h).round(), self.height) {
            for px in cols.clone() {
                let i = (py * self.width + px) * 4;
                self.pixels[i..i + 4].copy_from_slice(&[bg.r, bg.g, bg.b, 255]);
            }
        }
    }

    fn fill_rect(&mut self, rect: RectF, color: Rgba) {
        if rect.is_empty() || !rect.x.is_finite() || !rect.y.is_finite() {
            return;
        }
        let (x1, y1) = (rect.x + rect.w, rect.y + rect.h);
        let cols = Self::span(rect.x, x1, self.width);
        for py in Self::span(rect.y, y1, self.height) {
            let cy = ((py + 1) as f32).min(y1) - (py as f32).max(rect.y);
            for px in cols.clone() {
                let cx = ((px + 1) as f32).min(x1) - (px as f32).max(rect.x);
                self.blend(px, py, color, cx.clamp(0.0, 1.0) * cy.clamp(0.0, 1.0));
            }
        }
    }

    fn fill_path(&mut self, path: &Path, color: Rgba) {
        self.fill_polygon(path.points(), color);
    }

    fn stroke_path(&mut self, path: &Path, color: Rgba, line_width: f32) {
        let hw = (line_width * 0.5).max(0.25);
        for ((ax, ay), (bx, by)) in path.segments() {
            let (dx, dy) = (bx - ax, by - ay);
            let len = (dx * dx + dy * dy).sqrt();
            if !(len > 1e-4) {
                continue;
            }
            let (nx, ny) = (-dy / len * hw, dx / len * hw);
            self.fill_polygon(
                &[(ax + nx, ay + ny), (bx + nx, by + ny), (bx - nx, by - ny), (ax - nx, ay - ny)],
                color,
            );
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y_mid: f32, font_px: f32, color: Rgba) {
        if !(font_px > 0.0) || !x.is_finite() || !y_mid.is_finite() {
            return;
        }
        let font = font_for_px(font_px);
        let advance = font_px * 0.6;
        let mut pen_x = x;
        for ch in text.chars() {
            if ch == ' ' {
                pen_x += advance;
                continue;
            }
            let cell = RectF::new(pen_x, y_mid - font_px * 0.5, advance, font_px);
            if let Some(glyph) = BlockGlyph::for_char(ch) {
                self.draw_block_glyph(glyph, cell, color);
            } else if let (Some(font), true) = (font, ch.is_ascii_graphic()) {
                let mut buf = [0u8; 4];
                let style = MonoTextStyle::new(font, Rgb888::new(color.r, color.g, color.b));
                let mut pen = PenTarget { canvas: self, alpha: color.a };
                let _ = Text::with_baseline(
                    ch.encode_utf8(&mut buf),
                    Point::new(pen_x.round() as i32, y_mid.round() as i32),
                    style,
                    Baseline::Middle,
                )
                .draw(&mut pen);
            } else {
                // Too small for a bitmap font: tint by how much ink the glyph carries.
                self.fill_rect(cell, color.scale_alpha(ink_coverage(ch)));
            }
            pen_x += advance;
        }
    }

    fn fill_radial_gradient(&mut self, cx: f32, cy: f32, radius: f32, inner: Rgba, clip: RectF) {
        if !(radius > 0.0) || clip.is_empty() || !cx.is_finite() || !cy.is_finite() {
            return;
        }
        let (x1, y1) = (clip.x + clip.w, clip.y + clip.h);
        let cols = Self::span(clip.x, x1, self.width);
        for py in Self::span(clip.y, y1, self.height) {
            let cov_y = (((py + 1) as f32).min(y1) - (py as f32).max(clip.y)).clamp(0.0, 1.0);
            let dy = py as f32 + 0.5 - cy;
            for px in cols.clone() {
                let cov_x = (((px + 1) as f32).min(x1) - (px as f32).max(clip.x)).clamp(0.0, 1.0);
                let dx = px as f32 + 0.5 - cx;
                let d = (dx * dx + dy * dy).sqrt() / radius;
                if d < 1.0 {
                    self.blend(px, py, inner, (1.0 - d) * cov_x * cov_y);
                }
            }
        }
    }
}

/// embedded-graphics target that blends glyph pixels with a fixed pen alpha.
struct PenTarget<'a> {
    canvas: &'a mut PixelCanvas,
    alpha: f32,
}

impl OriginDimensions for PenTarget<'_> {
    fn size(&self) -> Size {
        Size::new(self.canvas.width as u32, self.canvas.height as u32)
    }
}

impl DrawTarget for PenTarget<'_> {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let rgba = Rgba {
                r: color.r(),
                g: color.g(),
                b: color.b(),
                a: self.alpha,
            };
            self.canvas.blend(point.x as usize, point.y as usize, rgba, 1.0);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum BlockGlyph {
    Full,
    Lower(u8),
    Shade(f32),
}

impl BlockGlyph {
    fn for_char(ch: char) -> Option<Self> {
        match ch {
            '█' => Some(Self::Full),
            '▁'..='▇' => Some(Self::Lower((ch as u32 - 0x2580) as u8)),
            '░' => Some(Self::Shade(0.25)),
            '▒' => Some(Self::Shade(0.5)),
            '▓' => Some(Self::Shade(0.75)),
            _ => None,
        }
    }
}

/// Largest bitmap font whose cell height fits in `px`.
fn font_for_px(px: f32) -> Option<&'static MonoFont<'static>> {
    let fonts: [&'static MonoFont<'static>; 8] = [
        &FONT_10X20,
        &FONT_9X18,
        &FONT_9X15,
        &FONT_8X13,
        &FONT_6X12,
        &FONT_6X10,
        &FONT_5X8,
        &FONT_4X6,
    ];
    fonts
        .into_iter()
        .find(|f| f.character_size.height as f32 <= px)
}

fn ink_coverage(ch: char) -> f32 {
    match ch {
        '.' | '\'' | '`' => 0.12,
        ',' | '-' => 0.16,
        ':' => 0.22,
        ';' | '!' | 'i' => 0.28,
        '1' | 'l' | '|' => 0.32,
        '=' | '+' | 'r' | '~' => 0.38,
        '*' | 'x' | 'o' => 0.46,
        '0' | 'O' | 'X' => 0.56,
        '#' | '%' | '&' => 0.72,
        '@' | 'M' | 'W' => 0.82,
        _ => 0.5,
    }
}
