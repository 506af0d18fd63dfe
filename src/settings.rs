//! Flat settings record for export/import, stored as `key=value` text.

use crate::color::{CUSTOM_SCHEME_NAME, ColorScheme, Rgb, named_scheme};
use crate::error::ConfigError;
use crate::field::{GridSize, PatternId, ShapeExponent};
use crate::style::RenderStyle;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedSettings {
    pub p: ShapeExponent,
    pub grid_size: GridSize,
    pub pattern: PatternId,
    pub render_style: RenderStyle,
    pub color_scheme: ColorScheme,
    pub audio_enabled: bool,
    pub cycle_colors: bool,
}

impl Default for ExportedSettings {
    fn default() -> Self {
        Self {
            p: ShapeExponent::default(),
            grid_size: GridSize::default(),
            pattern: PatternId::Wave,
            render_style: RenderStyle::Ascii,
            color_scheme: ColorScheme::default(),
            audio_enabled: false,
            cycle_colors: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> SettingsError + '_ {
    move |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_err(line: usize, err: impl fmt::Display) -> SettingsError {
    SettingsError::Parse {
        line,
        message: err.to_string(),
    }
}

impl ExportedSettings {
    pub fn to_text(&self) -> String {
        let mut out = String::from("# minkowski_grid settings v1\n");
        let lines = [
            ("p", self.p.to_string()),
            ("grid_size", self.grid_size.to_string()),
            ("pattern", self.pattern.key().to_string()),
            ("render_style", self.render_style.key().to_string()),
            ("color_scheme.name", self.color_scheme.name.clone()),
            ("color_scheme.primary", self.color_scheme.primary.to_hex()),
            ("color_scheme.secondary", self.color_scheme.secondary.to_hex()),
            ("audio_enabled", self.audio_enabled.to_string()),
            ("cycle_colors", self.cycle_colors.to_string()),
        ];
        for (key, value) in lines {
            out.push_str(key);
            out.push('=');
            out.push_str(&value);
            out.push('\n');
        }
        out
    }

    /// Parse settings text. Missing keys keep their defaults; unknown keys are ignored.
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        let mut scheme_name: Option<(usize, String)> = None;
        let mut primary: Option<Rgb> = None;
        let mut secondary: Option<Rgb> = None;

        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key_raw, value_raw)) = line.split_once('=') else {
                return Err(parse_err(line_no, "expected <key>=<value>"));
            };
            let value = value_raw.trim();
            match key_raw.trim() {
                "p" => settings.p = value.parse().map_err(|e: ConfigError| parse_err(line_no, e))?,
                "grid_size" => {
                    settings.grid_size = value.parse().map_err(|e: ConfigError| parse_err(line_no, e))?
                }
                "pattern" => settings.pattern = value.parse().map_err(|e: ConfigError| parse_err(line_no, e))?,
                "render_style" => {
                    settings.render_style = value.parse().map_err(|e: ConfigError| parse_err(line_no, e))?
                }
                "color_scheme.name" => scheme_name = Some((line_no, value.to_string())),
                "color_scheme.primary" => {
                    primary = Some(Rgb::parse_hex(value).map_err(|e| parse_err(line_no, e))?)
                }
                "color_scheme.secondary" => {
                    secondary = Some(Rgb::parse_hex(value).map_err(|e| parse_err(line_no, e))?)
                }
                "audio_enabled" => {
                    settings.audio_enabled = parse_bool(value)
                        .ok_or_else(|| parse_err(line_no, "audio_enabled must be true/false"))?
                }
                "cycle_colors" => {
                    settings.cycle_colors = parse_bool(value)
                        .ok_or_else(|| parse_err(line_no, "cycle_colors must be true/false"))?
                }
                _ => {}
            }
        }

        settings.color_scheme = match (scheme_name, primary, secondary) {
            (name, Some(p), Some(s)) => {
                let name = name.map(|(_, n)| n).unwrap_or_else(|| CUSTOM_SCHEME_NAME.to_string());
                ColorScheme::new(name, p, s)
            }
            (Some((line_no, name)), _, _) => named_scheme(&name).map_err(|e| parse_err(line_no, e))?,
            (None, _, _) => settings.color_scheme,
        };
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(io_err(path))?;
        Self::parse(&text)
    }

    /// Write atomically via a sibling temp file.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.to_text()).map_err(io_err(&tmp))?;
        std::fs::rename(&tmp, path).map_err(io_err(path))
    }
}

pub fn settings_storage_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("minkowski_grid").join("settings.txt"));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("minkowski_grid")
            .join("settings.txt"),
    )
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
