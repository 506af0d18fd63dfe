//! Drawing contract consumed by the grid renderer.

use crate::color::Rgba;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn is_empty(&self) -> bool {
        !(self.w > 0.0 && self.h > 0.0)
    }
}

/// A single polyline, optionally closed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    points: Vec<(f32, f32)>,
    closed: bool,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, x: f32, y: f32) -> Self {
        self.points.clear();
        self.points.push((x, y));
        self
    }

    pub fn line_to(mut self, x: f32, y: f32) -> Self {
        self.points.push((x, y));
        self
    }

    pub fn polygon(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        Self {
            points: points.into_iter().collect(),
            closed: true,
        }
    }

    /// Closed polygon approximating a circle; segment count grows with radius.
    pub fn circle(cx: f32, cy: f32, r: f32) -> Self {
        let segments = ((r * 2.0).ceil() as usize).clamp(12, 64);
        Self::polygon((0..segments).map(|i| {
            let a = i as f32 / segments as f32 * std::f32::consts::TAU;
            (cx + r * a.cos(), cy + r * a.sin())
        }))
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Segments in drawing order, including the closing edge.
    pub fn segments(&self) -> impl Iterator<Item = ((f32, f32), (f32, f32))> + '_ {
        let n = self.points.len();
        let count = match (n, self.closed) {
            (0 | 1, _) => 0,
            (_, true) => n,
            (_, false) => n - 1,
        };
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

/// 2D raster drawing operations with known pixel dimensions.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Reset the whole surface to its background.
    fn clear(&mut self);
    fn clear_rect(&mut self, rect: RectF);
    fn fill_rect(&mut self, rect: RectF, color: Rgba);
    fn fill_path(&mut self, path: &Path, color: Rgba);
    fn stroke_path(&mut self, path: &Path, color: Rgba, line_width: f32);
    /// Draw `text` starting at `x`, vertically centered on `y_mid`.
    fn fill_text(&mut self, text: &str, x: f32, y_mid: f32, font_px: f32, color: Rgba);
    /// Radial fade from `inner` at `(cx, cy)` to transparent at `radius`, limited to `clip`.
    fn fill_radial_gradient(&mut self, cx: f32, cy: f32, radius: f32, inner: Rgba, clip: RectF);
}
