//! Two-color gradient schemes and the value -> RGBA mapping.

use crate::error::ConfigError;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(raw: &str) -> Result<Self, ConfigError> {
        let s = raw.trim();
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ConfigError::MalformedHex(raw.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| ConfigError::MalformedHex(raw.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn with_alpha(self, a: f32) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a: a.clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in `[0, 1]`.
    pub a: f32,
}

impl Rgba {
    pub fn rgb(self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a: a.clamp(0.0, 1.0), ..self }
    }

    pub fn scale_alpha(self, k: f32) -> Self {
        self.with_alpha(self.a * k)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorScheme {
    pub name: String,
    pub primary: Rgb,
    pub secondary: Rgb,
    pub glow: Rgba,
}

impl ColorScheme {
    pub fn new(name: impl Into<String>, primary: Rgb, secondary: Rgb) -> Self {
        Self {
            name: name.into(),
            primary,
            secondary,
            glow: primary.with_alpha(0.2),
        }
    }

    pub fn custom(primary_hex: &str, secondary_hex: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(
            CUSTOM_SCHEME_NAME,
            Rgb::parse_hex(primary_hex)?,
            Rgb::parse_hex(secondary_hex)?,
        ))
    }

    /// Scheme for a cycling hue: saturated primary, darker complementary secondary.
    pub fn animated(hue: f32) -> Self {
        let h = hue.rem_euclid(1.0);
        Self::new(
            ANIMATED_SCHEME_NAME,
            hsl_to_rgb(h, 1.0, 0.5),
            hsl_to_rgb((h + 0.5).rem_euclid(1.0), 1.0, 0.3),
        )
    }

    pub fn is_custom(&self) -> bool {
        self.name == CUSTOM_SCHEME_NAME
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        NAMED_SCHEMES[0].scheme()
    }
}

pub const CUSTOM_SCHEME_NAME: &str = "Custom";
pub const ANIMATED_SCHEME_NAME: &str = "Animated";

#[derive(Clone, Copy, Debug)]
pub struct NamedScheme {
    pub name: &'static str,
    pub primary: Rgb,
    pub secondary: Rgb,
}

impl NamedScheme {
    pub fn scheme(&self) -> ColorScheme {
        ColorScheme::new(self.name, self.primary, self.secondary)
    }
}

pub static NAMED_SCHEMES: [NamedScheme; 8] = [
    NamedScheme { name: "Matrix", primary: Rgb::new(0x00, 0xff, 0x00), secondary: Rgb::new(0x00, 0x33, 0x00) },
    NamedScheme { name: "Cyberpunk", primary: Rgb::new(0xff, 0x00, 0xff), secondary: Rgb::new(0x00, 0xff, 0xff) },
    NamedScheme { name: "Fire", primary: Rgb::new(0xff, 0x44, 0x00), secondary: Rgb::new(0xff, 0xaa, 0x00) },
    NamedScheme { name: "Ocean", primary: Rgb::new(0x00, 0xff, 0xff), secondary: Rgb::new(0x00, 0x77, 0xff) },
    NamedScheme { name: "Sunset", primary: Rgb::new(0xff, 0x6b, 0x6b), secondary: Rgb::new(0x4e, 0xcd, 0xc4) },
    NamedScheme { name: "Neon", primary: Rgb::new(0x7f, 0xff, 0x00), secondary: Rgb::new(0xff, 0x00, 0xff) },
    NamedScheme { name: "Retro", primary: Rgb::new(0xff, 0xcc, 0x00), secondary: Rgb::new(0xff, 0x66, 0x00) },
    NamedScheme { name: "Aurora", primary: Rgb::new(0x80, 0xff, 0x80), secondary: Rgb::new(0x80, 0x80, 0xff) },
];

pub fn named_scheme(name: &str) -> Result<ColorScheme, ConfigError> {
    let want = name.trim();
    NAMED_SCHEMES
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(want))
        .map(NamedScheme::scheme)
        .ok_or_else(|| ConfigError::UnknownScheme(want.to_string()))
}

/// Neighbor of `current` in the named catalog, wrapping. Custom and
/// animated schemes step to the first (or last) entry.
pub fn step_named_scheme(current: &str, forward: bool) -> ColorScheme {
    let n = NAMED_SCHEMES.len();
    let idx = match NAMED_SCHEMES.iter().position(|s| s.name.eq_ignore_ascii_case(current)) {
        Some(i) if forward => (i + 1) % n,
        Some(i) => (i + n - 1) % n,
        None if forward => 0,
        None => n - 1,
    };
    NAMED_SCHEMES[idx].scheme()
}

/// Map a field value onto the scheme gradient.
///
/// `-1` lands on the secondary color, `1` on the primary. Alpha follows
/// `|value|` but never drops below 0.2 so quiet cells stay visible.
pub fn color_for(value: f32, scheme: &ColorScheme) -> Rgba {
    let v = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
    let t = (v + 1.0) * 0.5;
    let lerp = |from: u8, to: u8| -> u8 {
        let (a, b) = (from as f32, to as f32);
        (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
    };
    Rgba {
        r: lerp(scheme.secondary.r, scheme.primary.r),
        g: lerp(scheme.secondary.g, scheme.primary.g),
        b: lerp(scheme.secondary.b, scheme.primary.b),
        a: v.abs().max(0.2),
    }
}

/// Hue advance driven by wall time: 0.001 per 16 ms, wrapping at 1.0.
#[derive(Clone, Copy, Debug)]
pub struct HueCycle {
    hue: f32,
}

impl HueCycle {
    pub const RATE_PER_SEC: f32 = 0.001 / 0.016;

    pub fn new(hue: f32) -> Self {
        Self { hue: hue.rem_euclid(1.0) }
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn advance(&mut self, dt: std::time::Duration) {
        self.hue = (self.hue + dt.as_secs_f32() * Self::RATE_PER_SEC).rem_euclid(1.0);
    }

    pub fn scheme(&self) -> ColorScheme {
        ColorScheme::animated(self.hue)
    }
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    if s <= 0.0 {
        let v = (l.clamp(0.0, 1.0) * 255.0).round() as u8;
        return Rgb::new(v, v, v);
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    Rgb::new(channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn hex_round_trips_and_rejects_garbage() {
        assert_eq!(Rgb::parse_hex("#4ecdc4").unwrap(), Rgb::new(0x4e, 0xcd, 0xc4));
        assert_eq!(Rgb::parse_hex("FF6600").unwrap().to_hex(), "#ff6600");
        for bad in ["", "#", "#12345", "#1234567", "#gg0000", "red", "#ff 000"] {
            assert!(
                matches!(Rgb::parse_hex(bad), Err(ConfigError::MalformedHex(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn animated_scheme_uses_complementary_secondary() {
        let s = ColorScheme::animated(0.0);
        assert_eq!(s.name, ANIMATED_SCHEME_NAME);
        assert_eq!(s.primary, Rgb::new(255, 0, 0));
        // Hue 0.5 at 30% lightness.
        assert_eq!(s.secondary, Rgb::new(0, 153, 153));
        assert_eq!(s.glow, Rgb::new(255, 0, 0).with_alpha(0.2));
    }

    #[test]
    fn hue_cycle_wraps() {
        let mut c = HueCycle::new(0.99);
        c.advance(Duration::from_millis(320));
        assert!((c.hue() - 0.01).abs() < 1e-4, "hue {}", c.hue());
    }

    #[test]
    fn named_lookup_is_case_insensitive() {
        assert_eq!(named_scheme("ocean").unwrap().primary, Rgb::new(0, 255, 255));
        assert!(matches!(named_scheme("Custom"), Err(ConfigError::UnknownScheme(_))));
    }

    #[test]
    fn scheme_stepping_wraps_both_ways() {
        assert_eq!(step_named_scheme("Aurora", true).name, "Matrix");
        assert_eq!(step_named_scheme("Matrix", false).name, "Aurora");
        assert_eq!(step_named_scheme(CUSTOM_SCHEME_NAME, true).name, "Matrix");
        assert_eq!(step_named_scheme(ANIMATED_SCHEME_NAME, false).name, "Aurora");
    }
}
