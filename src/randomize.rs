//! Constrained random parameter selection.

use crate::color::{ColorScheme, NAMED_SCHEMES, NamedScheme};
use crate::field::{GridSize, PatternId, ShapeExponent};
use crate::style::RenderStyle;

/// Grids strictly larger than this skip the expensive patterns and styles.
pub const LARGE_GRID_THRESHOLD: usize = 40;
/// Largest grid size randomization will choose.
pub const MAX_RANDOM_GRID: usize = 50;

/// Which parameters a randomize request may change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomDimensions {
    pub grid_size: bool,
    pub pattern: bool,
    pub shape_exponent: bool,
    pub style: bool,
    pub scheme: bool,
}

impl Default for RandomDimensions {
    fn default() -> Self {
        Self {
            grid_size: true,
            pattern: true,
            shape_exponent: true,
            style: true,
            scheme: true,
        }
    }
}

/// Partial parameter set; `None` leaves the current value untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RandomPick {
    pub grid_size: Option<GridSize>,
    pub pattern: Option<PatternId>,
    pub p: Option<ShapeExponent>,
    pub style: Option<RenderStyle>,
    pub scheme: Option<ColorScheme>,
}

fn is_large(grid: usize) -> bool {
    grid > LARGE_GRID_THRESHOLD
}

pub fn candidate_grid_sizes() -> Vec<GridSize> {
    GridSize::ALLOWED
        .iter()
        .filter(|&&n| n <= MAX_RANDOM_GRID)
        .filter_map(|&n| GridSize::new(n).ok())
        .collect()
}

pub fn candidate_patterns(grid: usize) -> Vec<PatternId> {
    PatternId::all()
        .into_iter()
        .filter(|p| !(is_large(grid) && p.is_iterative()))
        .collect()
}

/// Finite catalog exponents up to 4 on large grids, 6 otherwise.
pub fn candidate_exponents(grid: usize) -> Vec<ShapeExponent> {
    let max_p = if is_large(grid) { 4.0 } else { 6.0 };
    ShapeExponent::CATALOG
        .into_iter()
        .filter(|p| !p.is_infinite() && p.order() <= max_p)
        .collect()
}

pub fn candidate_styles(grid: usize) -> Vec<RenderStyle> {
    RenderStyle::all()
        .into_iter()
        .filter(|s| !(is_large(grid) && s.is_heavy_at_large_grid()))
        .collect()
}

fn choose<T: Clone>(rng: &mut fastrand::Rng, items: &[T]) -> Option<T> {
    if items.is_empty() {
        return None;
    }
    Some(items[rng.usize(..items.len())].clone())
}

/// Draw a coherent random combination for the enabled dimensions.
///
/// Exclusions are judged against the grid the frame will actually use: the
/// newly drawn size when grid size is enabled, the current one otherwise.
pub fn pick_random(current: GridSize, dims: RandomDimensions, rng: &mut fastrand::Rng) -> RandomPick {
    let grid_size = if dims.grid_size {
        choose(rng, &candidate_grid_sizes())
    } else {
        None
    };
    let effective = grid_size.unwrap_or(current).get();

    let pattern = if dims.pattern {
        choose(rng, &candidate_patterns(effective))
    } else {
        None
    };
    let p = if dims.shape_exponent {
        choose(rng, &candidate_exponents(effective))
    } else {
        None
    };
    let style = if dims.style {
        choose(rng, &candidate_styles(effective))
    } else {
        None
    };
    let scheme = if dims.scheme {
        choose(rng, &NAMED_SCHEMES).map(|s: NamedScheme| s.scheme())
    } else {
        None
    };

    RandomPick {
        grid_size,
        pattern,
        p,
        style,
        scheme,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_grid_caps_exponent_at_four() {
        let ps = candidate_exponents(50);
        assert_eq!(ps.len(), 5);
        assert!(ps.iter().all(|p| p.order() <= 4.0));
        assert_eq!(candidate_exponents(30).len(), 8);
    }

    #[test]
    fn disabled_dimensions_stay_unset() {
        let mut rng = fastrand::Rng::with_seed(7);
        let dims = RandomDimensions {
            grid_size: false,
            pattern: true,
            shape_exponent: false,
            style: false,
            scheme: false,
        };
        let pick = pick_random(GridSize::default(), dims, &mut rng);
        assert!(pick.pattern.is_some());
        assert!(pick.grid_size.is_none() && pick.p.is_none() && pick.style.is_none() && pick.scheme.is_none());
    }
}
