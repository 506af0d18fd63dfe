//! Scalar field catalog.
//!
//! Every field maps a grid cell, a time value and a shape exponent to a
//! signed value of roughly `[-1, 1]`. Fields are pure: identical inputs
//! give bit-identical outputs, so stepping time backwards replays frames.

use crate::error::ConfigError;
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PatternId {
    Wave = 0,
    Spiral = 1,
    Checkerboard = 2,
    Ripple = 3,
    Maze = 4,
    Cellular = 5,
    Interference = 6,
    Fractal = 7,
    Vortex = 8,
    Noise = 9,
    Mandelbrot = 10,
    Voronoi = 11,
    Kaleidoscope = 12,
}

impl PatternId {
    pub const fn all() -> [Self; 13] {
        [
            Self::Wave,
            Self::Spiral,
            Self::Checkerboard,
            Self::Ripple,
            Self::Maze,
            Self::Cellular,
            Self::Interference,
            Self::Fractal,
            Self::Vortex,
            Self::Noise,
            Self::Mandelbrot,
            Self::Voronoi,
            Self::Kaleidoscope,
        ]
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self, ConfigError> {
        Self::all()
            .get(id as usize)
            .copied()
            .ok_or_else(|| ConfigError::UnknownPattern(id.to_string()))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Wave => "Wave Pattern",
            Self::Spiral => "Spiral",
            Self::Checkerboard => "Checkerboard",
            Self::Ripple => "Ripple",
            Self::Maze => "Maze",
            Self::Cellular => "Cellular",
            Self::Interference => "Interference",
            Self::Fractal => "Fractal",
            Self::Vortex => "Vortex",
            Self::Noise => "Noise",
            Self::Mandelbrot => "Mandelbrot",
            Self::Voronoi => "Voronoi",
            Self::Kaleidoscope => "Kaleidoscope",
        }
    }

    /// Stable machine name used on the command line and in exported settings.
    pub fn key(self) -> &'static str {
        match self {
            Self::Wave => "wave",
            Self::Spiral => "spiral",
            Self::Checkerboard => "checkerboard",
            Self::Ripple => "ripple",
            Self::Maze => "maze",
            Self::Cellular => "cellular",
            Self::Interference => "interference",
            Self::Fractal => "fractal",
            Self::Vortex => "vortex",
            Self::Noise => "noise",
            Self::Mandelbrot => "mandelbrot",
            Self::Voronoi => "voronoi",
            Self::Kaleidoscope => "kaleidoscope",
        }
    }

    /// Patterns whose per-cell cost grows with nested or iterated evaluation.
    pub fn is_iterative(self) -> bool {
        matches!(self, Self::Fractal | Self::Mandelbrot)
    }

    pub fn next(self) -> Self {
        let all = Self::all();
        all[(self as usize + 1) % all.len()]
    }

    pub fn prev(self) -> Self {
        let all = Self::all();
        all[(self as usize + all.len() - 1) % all.len()]
    }

    pub fn catalog_names() -> String {
        Self::all()
            .iter()
            .map(|p| p.key())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PatternId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let want = s.trim().to_ascii_lowercase();
        if let Ok(id) = want.parse::<u8>() {
            return Self::from_id(id);
        }
        Self::all()
            .into_iter()
            .find(|p| p.key() == want || p.label().to_ascii_lowercase() == want)
            .ok_or_else(|| ConfigError::UnknownPattern(s.trim().to_string()))
    }
}

/// Minkowski order `p`. `Infinite` selects the Chebyshev metric.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeExponent {
    Finite(f32),
    Infinite,
}

impl ShapeExponent {
    pub const MIN: f32 = 1.0;
    pub const MAX: f32 = 8.0;

    /// Values offered when stepping through exponents interactively.
    pub const CATALOG: [ShapeExponent; 9] = [
        ShapeExponent::Finite(2.0),
        ShapeExponent::Finite(2.5),
        ShapeExponent::Finite(3.0),
        ShapeExponent::Finite(3.5),
        ShapeExponent::Finite(4.0),
        ShapeExponent::Finite(4.5),
        ShapeExponent::Finite(5.0),
        ShapeExponent::Finite(6.0),
        ShapeExponent::Infinite,
    ];

    pub fn new(p: f32) -> Result<Self, ConfigError> {
        if p == f32::INFINITY {
            return Ok(Self::Infinite);
        }
        if !p.is_finite() || !(Self::MIN..=Self::MAX).contains(&p) {
            return Err(ConfigError::InvalidShapeExponent {
                value: p,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self::Finite(p))
    }

    /// Finite order used where `p` acts as a frequency or multiplier rather than a metric.
    pub fn order(self) -> f32 {
        match self {
            Self::Finite(p) => p,
            Self::Infinite => Self::MAX,
        }
    }

    pub fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }

    /// Generalized Minkowski norm of `(dx, dy)`.
    pub fn distance(self, dx: f32, dy: f32) -> f32 {
        let (ax, ay) = (dx.abs(), dy.abs());
        match self {
            Self::Infinite => ax.max(ay),
            Self::Finite(p) if p == 1.0 => ax + ay,
            Self::Finite(p) if p == 2.0 => (ax * ax + ay * ay).sqrt(),
            Self::Finite(p) => {
                // Factor out the larger component so `|c|^p` cannot overflow for wide grids.
                let m = ax.max(ay);
                if m <= 0.0 {
                    return 0.0;
                }
                let (u, v) = (ax / m, ay / m);
                m * (u.powf(p) + v.powf(p)).powf(1.0 / p)
            }
        }
    }

    pub fn step(self, forward: bool) -> Self {
        let cat = Self::CATALOG;
        if let Some(idx) = cat.iter().position(|c| *c == self) {
            return if forward {
                cat[(idx + 1).min(cat.len() - 1)]
            } else {
                cat[idx.saturating_sub(1)]
            };
        }
        // Off-catalog values snap to the nearest slot in the stepping direction.
        let v = self.order();
        if forward {
            cat.iter().copied().find(|c| c.order() > v).unwrap_or(Self::Infinite)
        } else {
            cat.iter().rev().copied().find(|c| c.order() < v).unwrap_or(cat[0])
        }
    }
}

impl Default for ShapeExponent {
    fn default() -> Self {
        Self::Finite(2.0)
    }
}

impl fmt::Display for ShapeExponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(p) => write!(f, "{p}"),
            Self::Infinite => f.write_str("inf"),
        }
    }
}

impl FromStr for ShapeExponent {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        if matches!(raw.as_str(), "inf" | "infinity" | "∞" | "max" | "chebyshev") {
            return Ok(Self::Infinite);
        }
        let p = raw
            .parse::<f32>()
            .map_err(|_| ConfigError::UnparsableShapeExponent(s.trim().to_string()))?;
        Self::new(p)
    }
}

/// Side length `N` of the evaluated grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct GridSize(usize);

impl GridSize {
    pub const ALLOWED: [usize; 7] = [20, 30, 40, 50, 60, 70, 80];

    pub fn new(n: usize) -> Result<Self, ConfigError> {
        if Self::ALLOWED.contains(&n) {
            Ok(Self(n))
        } else {
            Err(ConfigError::InvalidGridSize(n))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn step(self, larger: bool) -> Self {
        let idx = Self::ALLOWED.iter().position(|&n| n == self.0).unwrap_or(0);
        let next = if larger {
            (idx + 1).min(Self::ALLOWED.len() - 1)
        } else {
            idx.saturating_sub(1)
        };
        Self(Self::ALLOWED[next])
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self(50)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GridSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = s
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidGridSize(0))?;
        Self::new(n)
    }
}

/// Grid geometry shared by every field: centering and aspect correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub grid: usize,
    /// Width / height of the pixel area one grid spans.
    pub aspect: f32,
}

impl Viewport {
    pub fn square(grid: usize) -> Self {
        Self { grid, aspect: 1.0 }
    }

    pub fn stretched(grid: usize, width: usize, height: usize) -> Self {
        let aspect = if width == 0 || height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        Self { grid, aspect }
    }

    /// Cell coordinate relative to the grid center, with the minor axis
    /// scaled so shapes stay round on non-square surfaces.
    pub fn center(&self, x: usize, y: usize) -> (f32, f32) {
        let mid = (self.grid.max(1) as f32 - 1.0) * 0.5;
        let cx = x as f32 - mid;
        let cy = y as f32 - mid;
        if self.aspect > 1.0 {
            (cx, cy / self.aspect)
        } else if self.aspect > 0.0 && self.aspect < 1.0 {
            (cx * self.aspect, cy)
        } else {
            (cx, cy)
        }
    }
}

/// Evaluate `pattern` for cell `(x, y)` on a square surface.
pub fn evaluate(pattern: PatternId, x: usize, y: usize, t: f32, p: ShapeExponent, grid_size: usize) -> f32 {
    evaluate_on(pattern, x, y, t, p, &Viewport::square(grid_size))
}

pub fn evaluate_on(pattern: PatternId, x: usize, y: usize, t: f32, p: ShapeExponent, view: &Viewport) -> f32 {
    let n = view.grid.max(1) as f32;
    let (cx, cy) = view.center(x, y);
    let (xf, yf) = (x as f32, y as f32);
    let v = match pattern {
        PatternId::Wave => wave(cx, cy, t, p, n),
        PatternId::Spiral => spiral(cx, cy, t, p),
        PatternId::Checkerboard => checkerboard(xf, yf, t, p),
        PatternId::Ripple => ripple(cx, cy, t, p),
        PatternId::Maze => maze(xf, yf, t, p),
        PatternId::Cellular => cellular(xf, yf, t, p),
        PatternId::Interference => interference(xf, yf, t, p),
        PatternId::Fractal => nested_sines(xf, yf, t, p),
        PatternId::Vortex => vortex(cx, cy, t, p),
        PatternId::Noise => noise(xf, yf, t, p),
        PatternId::Mandelbrot => mandelbrot(cx, cy, t),
        PatternId::Voronoi => voronoi(cx, cy, t, p, n),
        PatternId::Kaleidoscope => kaleidoscope(cx, cy, t, p),
    };
    finite_or_zero(v)
}

#[inline]
fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() { v } else { 0.0 }
}

fn wave(cx: f32, cy: f32, t: f32, p: ShapeExponent, n: f32) -> f32 {
    let dist = p.distance(cx, cy) / (n / 4.0).max(0.25);
    let wave = (cx / 5.0 + t / 10.0).cos() * (cy / 5.0 + t / 8.0).cos();
    let radial = (polar_angle(cx, cy) * p.order() + t / 10.0).sin();
    (wave + radial - dist) / 3.0
}

fn spiral(cx: f32, cy: f32, t: f32, p: ShapeExponent) -> f32 {
    let dist = (cx * cx + cy * cy).sqrt();
    (dist / 5.0 - polar_angle(cx, cy) * p.order() + t / 10.0).sin()
}

fn checkerboard(x: f32, y: f32, t: f32, p: ShapeExponent) -> f32 {
    (x / 2.0 + t / 10.0).sin() * (y / 2.0 + t / 8.0).sin() * ((x + y) / 10.0).powf(p.order() / 2.0).sin()
}

fn ripple(cx: f32, cy: f32, t: f32, p: ShapeExponent) -> f32 {
    let dist = p.distance(cx, cy);
    (dist / 3.0 - t / 5.0).sin() * (1.0 / (dist + 1.0)).powf(p.order() / 5.0)
}

fn maze(x: f32, y: f32, t: f32, p: ShapeExponent) -> f32 {
    let k = p.order();
    (x * k + (y * k + t / 10.0).sin()).sin() * (y * k + (x * k + t / 8.0).cos()).cos()
}

fn cellular(x: f32, y: f32, t: f32, p: ShapeExponent) -> f32 {
    let k = p.order();
    ((x / k).floor() * k + (y / k).floor() * k + t / 10.0).sin()
}

fn interference(x: f32, y: f32, t: f32, p: ShapeExponent) -> f32 {
    let k = p.order();
    let a = ((x + y) * k / 10.0 + t / 10.0).sin();
    let b = ((x - y) * k / 10.0 + t / 8.0).cos();
    (a + b) / 2.0
}

fn nested_sines(x: f32, y: f32, t: f32, p: ShapeExponent) -> f32 {
    let scale = p.order() * 2.0;
    (x / scale + (y / scale + (x / scale + t / 10.0).sin()).sin()).sin()
}

fn vortex(cx: f32, cy: f32, t: f32, p: ShapeExponent) -> f32 {
    let dist = match p {
        ShapeExponent::Infinite => 1.0,
        ShapeExponent::Finite(k) => (cx * cx + cy * cy).powf(1.0 / k),
    };
    (polar_angle(cx, cy) * p.order() + dist / 5.0 - t / 10.0).sin()
}

fn noise(x: f32, y: f32, t: f32, p: ShapeExponent) -> f32 {
    let k = p.order();
    (x * k + y * k + t / 10.0).sin() * (x * k - y * k + t / 8.0).cos() * ((x * x + y * y).sqrt() / 10.0).sin()
}

fn mandelbrot(cx: f32, cy: f32, t: f32) -> f32 {
    const MAX_ITER: u32 = 10;
    let (c_re, c_im) = (cx / 20.0, cy / 20.0);
    let (mut zx, mut zy) = (c_re, c_im);
    let mut i = 0u32;
    while i < MAX_ITER && zx * zx + zy * zy < 4.0 {
        let xt = zx * zx - zy * zy + c_re;
        zy = 2.0 * zx * zy + c_im;
        zx = xt;
        i += 1;
    }
    (i as f32 / 2.0 + t / 10.0).sin()
}

fn voronoi(cx: f32, cy: f32, t: f32, p: ShapeExponent, n: f32) -> f32 {
    const SITES: usize = 5;
    let orbit = n / 3.0;
    let mut best = f32::MAX;
    for i in 0..SITES {
        let phase = i as f32 * 2.4;
        let sx = (t / 10.0 + phase).sin() * orbit;
        let sy = (t / 8.0 + phase).cos() * orbit;
        best = best.min(p.distance(cx - sx, cy - sy));
    }
    (best / 2.0).sin()
}

fn kaleidoscope(cx: f32, cy: f32, t: f32, p: ShapeExponent) -> f32 {
    const SEGMENTS: f32 = 8.0;
    let dist = (cx * cx + cy * cy).sqrt();
    let seg = (polar_angle(cx, cy) + PI).rem_euclid(2.0 * PI / SEGMENTS);
    (seg * p.order() + dist / 5.0 + t / 10.0).sin()
}

/// `atan2` with the singular center cell pinned to angle 0.
#[inline]
fn polar_angle(cx: f32, cy: f32) -> f32 {
    if cx == 0.0 && cy == 0.0 { 0.0 } else { cy.atan2(cx) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chebyshev_is_the_limit_of_large_p() {
        let inf = ShapeExponent::Infinite.distance(3.0, -4.0);
        let big = ShapeExponent::Finite(8.0).distance(3.0, -4.0);
        assert_eq!(inf, 4.0);
        assert!((big - inf).abs() < 0.1, "p=8 distance {big} should approach {inf}");
    }

    #[test]
    fn distance_matches_closed_forms() {
        assert_eq!(ShapeExponent::Finite(1.0).distance(3.0, -4.0), 7.0);
        assert_eq!(ShapeExponent::Finite(2.0).distance(3.0, -4.0), 5.0);
        assert_eq!(ShapeExponent::Finite(3.0).distance(0.0, 0.0), 0.0);
    }

    #[test]
    fn viewport_scales_minor_axis() {
        let wide = Viewport::stretched(4, 200, 100);
        let (cx, cy) = wide.center(0, 0);
        assert_eq!(cx, -1.5);
        assert_eq!(cy, -0.75);

        let tall = Viewport::stretched(4, 100, 200);
        let (cx, cy) = tall.center(3, 3);
        assert_eq!(cx, 0.75);
        assert_eq!(cy, 1.5);
    }

    #[test]
    fn shape_exponent_steps_through_catalog() {
        let p = ShapeExponent::Finite(2.0);
        assert_eq!(p.step(true), ShapeExponent::Finite(2.5));
        assert_eq!(p.step(false), ShapeExponent::Finite(2.0));
        assert_eq!(ShapeExponent::Finite(6.0).step(true), ShapeExponent::Infinite);
        assert_eq!(ShapeExponent::Infinite.step(true), ShapeExponent::Infinite);
        assert_eq!(ShapeExponent::Finite(1.0).step(true), ShapeExponent::Finite(2.0));
        assert_eq!(ShapeExponent::Finite(7.0).step(false), ShapeExponent::Finite(6.0));
    }
}
