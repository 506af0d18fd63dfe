//! Render style catalog: one draw strategy per visual encoding.

use crate::color::{ColorScheme, Rgba, color_for};
use crate::error::ConfigError;
use crate::surface::{Path, RectF, Surface};
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderStyle {
    Ascii,
    Pixels,
    Dots,
    Lines,
    Matrix,
    Circles,
    Triangles,
    Hexagons,
    Gradient,
    Wireframe,
    AsciiDense,
    AsciiBlocks,
    AsciiShades,
    PixelBlocks,
    PixelDithering,
    PixelScanlines,
}

/// Pixel placement of one grid cell on the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellRect {
    pub col: usize,
    pub row: usize,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl CellRect {
    pub fn rect(&self) -> RectF {
        RectF::new(self.x, self.y, self.w, self.h)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Edge length used for size-proportional primitives.
    pub fn size(&self) -> f32 {
        self.w.min(self.h)
    }
}

const DENSE_RAMP: [char; 10] = [' ', '.', ',', ':', ';', '=', '+', '*', '#', '@'];
const BLOCK_RAMP: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SHADE_RAMP: [char; 4] = ['░', '▒', '▓', '█'];
const DITHER_PATTERNS: [[bool; 4]; 5] = [
    [false, false, false, false],
    [true, false, false, false],
    [true, false, false, true],
    [true, false, true, true],
    [true, true, true, true],
];

impl RenderStyle {
    pub const fn all() -> [Self; 16] {
        [
            Self::Ascii,
            Self::Pixels,
            Self::Dots,
            Self::Lines,
            Self::Matrix,
            Self::Circles,
            Self::Triangles,
            Self::Hexagons,
            Self::Gradient,
            Self::Wireframe,
            Self::AsciiDense,
            Self::AsciiBlocks,
            Self::AsciiShades,
            Self::PixelBlocks,
            Self::PixelDithering,
            Self::PixelScanlines,
        ]
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Ascii => "ascii",
            Self::Pixels => "pixels",
            Self::Dots => "dots",
            Self::Lines => "lines",
            Self::Matrix => "matrix",
            Self::Circles => "circles",
            Self::Triangles => "triangles",
            Self::Hexagons => "hexagons",
            Self::Gradient => "gradient",
            Self::Wireframe => "wireframe",
            Self::AsciiDense => "ascii-dense",
            Self::AsciiBlocks => "ascii-blocks",
            Self::AsciiShades => "ascii-shades",
            Self::PixelBlocks => "pixel-blocks",
            Self::PixelDithering => "pixel-dithering",
            Self::PixelScanlines => "pixel-scanlines",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ascii => "ASCII",
            Self::Pixels => "Pixels",
            Self::Dots => "Dots",
            Self::Lines => "Lines",
            Self::Matrix => "Matrix",
            Self::Circles => "Circles",
            Self::Triangles => "Triangles",
            Self::Hexagons => "Hexagons",
            Self::Gradient => "Gradient",
            Self::Wireframe => "Wireframe",
            Self::AsciiDense => "ASCII Dense",
            Self::AsciiBlocks => "ASCII Blocks",
            Self::AsciiShades => "ASCII Shades",
            Self::PixelBlocks => "Pixel Blocks",
            Self::PixelDithering => "Pixel Dithering",
            Self::PixelScanlines => "Pixel Scanlines",
        }
    }

    /// Styles skipped by randomization above the large-grid threshold.
    pub fn is_heavy_at_large_grid(self) -> bool {
        matches!(self, Self::AsciiDense | Self::PixelDithering)
    }

    pub fn next(self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|s| *s == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    pub fn prev(self) -> Self {
        let all = Self::all();
        let idx = all.iter().position(|s| *s == self).unwrap_or(0);
        all[(idx + all.len() - 1) % all.len()]
    }

    pub fn catalog_names() -> String {
        Self::all()
            .iter()
            .map(|s| s.key())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Draw one cell. `value` is clamped to `[-1, 1]`; non-finite values draw as 0.
    pub fn draw(self, surface: &mut dyn Surface, cell: &CellRect, value: f32, scheme: &ColorScheme) {
        let v = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
        let color = color_for(v, scheme);
        let intensity = (v + 1.0) * 0.5;
        let size = cell.size();
        let (cx, cy) = cell.center();

        match self {
            Self::Ascii => {
                let glyph = if v > 0.3 {
                    Some('█')
                } else if v > 0.1 {
                    Some('▓')
                } else if v > -0.1 {
                    Some('▒')
                } else if v > -0.3 {
                    Some('░')
                } else {
                    None
                };
                if let Some(ch) = glyph {
                    draw_glyph(surface, cell, ch, color);
                }
            }
            Self::Matrix => {
                let ch = if (v + 1.0).floor() >= 1.0 { '1' } else { '0' };
                draw_glyph(surface, cell, ch, color);
            }
            Self::AsciiDense => draw_glyph(surface, cell, DENSE_RAMP[ramp_index(intensity, DENSE_RAMP.len())], color),
            Self::AsciiBlocks => draw_glyph(surface, cell, BLOCK_RAMP[ramp_index(intensity, BLOCK_RAMP.len())], color),
            Self::AsciiShades => draw_glyph(surface, cell, SHADE_RAMP[ramp_index(intensity, SHADE_RAMP.len())], color),
            Self::Pixels => surface.fill_rect(cell.rect(), color),
            Self::PixelBlocks => {
                let (bw, bh) = (cell.w / 3.0, cell.h / 3.0);
                let gap = (bw.min(bh) * 0.25).min(1.0);
                for i in 0..3 {
                    for j in 0..3 {
                        if intensity > (i * 3 + j) as f32 / 9.0 {
                            let r = RectF::new(cell.x + i as f32 * bw, cell.y + j as f32 * bh, bw - gap, bh - gap);
                            surface.fill_rect(r, color);
                        }
                    }
                }
            }
            Self::PixelDithering => {
                let level = ramp_index(intensity, DITHER_PATTERNS.len());
                let (dw, dh) = (cell.w / 2.0, cell.h / 2.0);
                let gap = (dw.min(dh) * 0.25).min(1.0);
                for (i, on) in DITHER_PATTERNS[level].iter().enumerate() {
                    if *on {
                        let r = RectF::new(
                            cell.x + (i % 2) as f32 * dw,
                            cell.y + (i / 2) as f32 * dh,
                            dw - gap,
                            dh - gap,
                        );
                        surface.fill_rect(r, color);
                    }
                }
            }
            Self::PixelScanlines => {
                surface.fill_rect(cell.rect(), color);
                if cell.row % 2 == 0 {
                    let shade = Rgba { r: 0, g: 0, b: 0, a: 0.5 };
                    surface.fill_rect(RectF::new(cell.x, cell.y, cell.w, cell.h * 0.5), shade);
                }
            }
            Self::Dots => {
                let r = v.abs() * size * 0.5;
                if r > 0.0 {
                    surface.fill_path(&Path::circle(cx, cy, r), color);
                }
            }
            Self::Lines => {
                let angle = (v + 1.0) * PI;
                let half = size * v.abs() * 0.5;
                let (dx, dy) = (angle.cos() * half, angle.sin() * half);
                let path = Path::new().move_to(cx - dx, cy - dy).line_to(cx + dx, cy + dy);
                surface.stroke_path(&path, color, 2.0);
            }
            Self::Wireframe => {
                let angle = (v + 1.0) * PI;
                let len = size * v.abs();
                let path = Path::new()
                    .move_to(cx, cy)
                    .line_to(cx + angle.sin() * len, cy - angle.cos() * len);
                surface.stroke_path(&path, color, 1.0);
            }
            Self::Circles => {
                let r = size * 0.4 * v.abs();
                if r > 0.0 {
                    surface.stroke_path(&Path::circle(cx, cy, r), color, 2.0);
                }
            }
            Self::Triangles => {
                let s = size * 0.4 * v.abs();
                if s > 0.0 {
                    let path = Path::polygon([(cx, cy - s), (cx + s, cy + s), (cx - s, cy + s)]);
                    surface.fill_path(&path, color);
                }
            }
            Self::Hexagons => {
                let s = size * 0.4 * v.abs();
                if s > 0.0 {
                    let path = Path::polygon((0..6).map(|i| {
                        let a = i as f32 * PI / 3.0;
                        (cx + s * a.cos(), cy + s * a.sin())
                    }));
                    surface.stroke_path(&path, color, 2.0);
                }
            }
            Self::Gradient => surface.fill_radial_gradient(cx, cy, size * 0.5, color, cell.rect()),
        }
    }
}

/// Index into an ordered ramp of `len` entries for a normalized `[0, 1]` intensity.
fn ramp_index(intensity: f32, len: usize) -> usize {
    let last = len.saturating_sub(1);
    ((intensity.clamp(0.0, 1.0) * last as f32).floor() as usize).min(last)
}

fn draw_glyph(surface: &mut dyn Surface, cell: &CellRect, ch: char, color: Rgba) {
    let mut buf = [0u8; 4];
    let font_px = cell.h.min(cell.w / 0.6);
    surface.fill_text(ch.encode_utf8(&mut buf), cell.x, cell.y + cell.h * 0.5, font_px, color);
}

impl fmt::Display for RenderStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for RenderStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let want = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::all()
            .into_iter()
            .find(|style| style.key() == want)
            .ok_or_else(|| ConfigError::UnknownStyle(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_index_covers_both_ends() {
        assert_eq!(ramp_index(0.0, 10), 0);
        assert_eq!(ramp_index(1.0, 10), 9);
        assert_eq!(ramp_index(0.5, 4), 1);
        assert_eq!(ramp_index(f32::NAN, 4), 0);
    }

    #[test]
    fn parses_kebab_snake_and_label_forms() {
        assert_eq!("ascii-dense".parse::<RenderStyle>().unwrap(), RenderStyle::AsciiDense);
        assert_eq!("pixel_dithering".parse::<RenderStyle>().unwrap(), RenderStyle::PixelDithering);
        assert_eq!("Pixel Scanlines".parse::<RenderStyle>().unwrap(), RenderStyle::PixelScanlines);
        assert!(matches!("sparkles".parse::<RenderStyle>(), Err(ConfigError::UnknownStyle(_))));
    }

    #[test]
    fn cycling_visits_every_style() {
        let mut s = RenderStyle::Ascii;
        for _ in 0..RenderStyle::all().len() {
            s = s.next();
        }
        assert_eq!(s, RenderStyle::Ascii);
        assert_eq!(RenderStyle::Ascii.prev(), RenderStyle::PixelScanlines);
    }
}
