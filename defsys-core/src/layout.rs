//! Plot layout parameters.
//!
//! The circular tree has to stay legible from a handful of tips up to the
//! full collection, so text size, legend spacing, ring offsets and output
//! size are fitted as simple functions of the number of displayed strains.
//! A count of zero means the full tree and uses fixed values.

/// Above this many strains the first ring uses the flat offset.
pub const FIRST_LAYER_CUTOFF: usize = 1100;

/// Legend text size.
pub fn font_size(n: usize) -> f64 {
    if n == 0 {
        return 100.0;
    }
    0.06 * n as f64 + 15.958
}

/// Legend spacing in centimetres.
pub fn spacing(n: usize) -> f64 {
    if n == 0 {
        return 2.0;
    }
    0.001162 * n as f64 + 0.311
}

/// Offset between consecutive defense-system rings.
pub fn layer_offset(n: usize) -> f64 {
    if n == 0 {
        return 0.03;
    }
    -0.0001 * n as f64 + 0.15
}

/// Offset of the innermost ring from the tree tips.
pub fn first_layer_offset(n: usize) -> f64 {
    if n == 0 || n > FIRST_LAYER_CUTOFF {
        return 0.08;
    }
    let x = n as f64;
    0.000_000_38 * x * x - 0.000_971_75 * x + 0.679_648_47
}

/// Output width and height in centimetres.
pub fn resolution(n: usize) -> f64 {
    if n == 0 {
        return 300.0;
    }
    0.183 * n as f64 + 23.672
}

/// All layout parameters for one render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    pub font_size: f64,
    pub spacing: f64,
    pub layer_offset: f64,
    pub first_layer_offset: f64,
    pub resolution: f64,
}

impl LayoutParams {
    pub fn for_count(n: usize) -> Self {
        Self {
            font_size: font_size(n),
            spacing: spacing(n),
            layer_offset: layer_offset(n),
            first_layer_offset: first_layer_offset(n),
            resolution: resolution(n),
        }
    }
}
