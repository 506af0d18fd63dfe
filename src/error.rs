use thiserror::Error;

/// Rejected parameter assignments. Raised when a value is set, never mid-frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown pattern '{0}' (try one of: {names})", names = crate::field::PatternId::catalog_names())]
    UnknownPattern(String),
    #[error("unknown render style '{0}' (try one of: {names})", names = crate::style::RenderStyle::catalog_names())]
    UnknownStyle(String),
    #[error("unknown color scheme '{0}'")]
    UnknownScheme(String),
    #[error("shape exponent must be finite and within [{min}, {max}] or 'inf', got {value}")]
    InvalidShapeExponent { value: f32, min: f32, max: f32 },
    #[error("shape exponent '{0}' is not a number")]
    UnparsableShapeExponent(String),
    #[error("grid size {0} is not supported (allowed: 20, 30, 40, 50, 60, 70, 80)")]
    InvalidGridSize(usize),
    #[error("malformed hex color '{0}' (expected #rrggbb)")]
    MalformedHex(String),
}
