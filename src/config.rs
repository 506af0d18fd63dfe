use crate::color::{ColorScheme, Rgb, named_scheme};
use crate::field::{GridSize, PatternId, ShapeExponent};
use crate::grid::PatternParams;
use crate::randomize::RandomDimensions;
use crate::style::RenderStyle;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "minkowski-grid",
    version,
    about = "Real-time Minkowski-metric pattern generator for the terminal"
)]
pub struct Config {
    /// Field to evaluate (name or numeric id).
    #[arg(long, default_value_t = PatternId::Wave)]
    pub pattern: PatternId,

    /// Minkowski order: a number in [1, 8] or `inf`.
    #[arg(long = "p", value_name = "P", default_value_t = ShapeExponent::default())]
    pub p: ShapeExponent,

    #[arg(long, default_value_t = GridSize::default())]
    pub grid_size: GridSize,

    #[arg(long, default_value_t = RenderStyle::Ascii)]
    pub style: RenderStyle,

    /// Named color scheme.
    #[arg(long, value_parser = named_scheme, default_value = "Matrix")]
    pub scheme: ColorScheme,

    /// Custom primary color (#rrggbb); requires --secondary.
    #[arg(long, value_parser = Rgb::parse_hex, requires = "secondary")]
    pub primary: Option<Rgb>,

    /// Custom secondary color (#rrggbb); requires --primary.
    #[arg(long, value_parser = Rgb::parse_hex, requires = "primary")]
    pub secondary: Option<Rgb>,

    /// Drive animation speed from microphone energy.
    #[arg(long, default_value_t = false)]
    pub audio: bool,

    #[arg(long, default_value_t = false)]
    pub cycle_colors: bool,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    /// Stretch cells over the whole terminal instead of a centered square.
    #[arg(long, default_value_t = false)]
    pub fullscreen: bool,

    #[arg(long, default_value_t = false)]
    pub paused: bool,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Input device name substring.
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_probe: bool,

    /// Where `e` writes settings (default: XDG config dir).
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Settings file to apply at startup.
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Append rendered frames as raw RGBA video.
    #[arg(long, value_name = "PATH")]
    pub record: Option<PathBuf>,

    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Seed for randomization.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Randomize once the debounce window passes after startup.
    #[arg(long, default_value_t = false)]
    pub randomize_on_start: bool,

    /// Parameters `r` may change, comma separated (default: all).
    #[arg(long, value_enum, value_delimiter = ',', num_args = 1.., value_name = "DIMS")]
    pub randomize_dims: Vec<RandomDimension>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RandomDimension {
    #[value(alias = "grid-size")]
    Grid,
    Pattern,
    #[value(alias = "shape")]
    P,
    Style,
    #[value(alias = "color")]
    Scheme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    #[value(alias = "hires")]
    Braille,
    Kitty,
}

impl Config {
    pub fn color_scheme(&self) -> ColorScheme {
        match (self.primary, self.secondary) {
            (Some(p), Some(s)) => ColorScheme::new(crate::color::CUSTOM_SCHEME_NAME, p, s),
            _ => self.scheme.clone(),
        }
    }

    pub fn random_dimensions(&self) -> RandomDimensions {
        if self.randomize_dims.is_empty() {
            return RandomDimensions::default();
        }
        let on = |dim: RandomDimension| self.randomize_dims.contains(&dim);
        RandomDimensions {
            grid_size: on(RandomDimension::Grid),
            pattern: on(RandomDimension::Pattern),
            shape_exponent: on(RandomDimension::P),
            style: on(RandomDimension::Style),
            scheme: on(RandomDimension::Scheme),
        }
    }

    pub fn initial_params(&self) -> PatternParams {
        PatternParams {
            pattern: self.pattern,
            p: self.p,
            grid_size: self.grid_size,
            style: self.style,
            scheme: self.color_scheme(),
            audio_enabled: self.audio,
            cycle_colors: self.cycle_colors,
            fullscreen: self.fullscreen,
        }
    }
}
