//! Optional rescaling of raw touch-panel readings onto a fixed grid.
//!
//! The parser and rasterizer never rescale anything. When the caller knows
//! the panel's calibration it can run samples through a [`DeviceRange`]
//! first, so that every session lands on the same grid no matter where on
//! the panel it was drawn.

use crate::sample::Sample;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A [`DeviceRange`] that cannot map anything.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The raw range of an axis is empty or inverted
    #[error("raw {axis} range {min}..{max} is empty")]
    EmptyRange {
        /// `"x"` or `"y"`
        axis: &'static str,
        /// Lowest raw reading
        min: i32,
        /// Highest raw reading
        max: i32,
    },

    /// The grid has no cells along an axis
    #[error("{axis} grid limit must be greater than zero")]
    ZeroLimit {
        /// `"x"` or `"y"`
        axis: &'static str,
    },
}

/// Calibration of the touch panel: the raw reading range on each axis, and
/// the size of the grid those readings map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceRange {
    /// Lowest raw x reading
    pub x_min: i32,
    /// Highest raw x reading
    pub x_max: i32,
    /// Lowest raw y reading
    pub y_min: i32,
    /// Highest raw y reading
    pub y_max: i32,
    /// Grid cells along x
    pub x_limit: u32,
    /// Grid cells along y
    pub y_limit: u32,
}

impl Default for DeviceRange {
    /// The calibration the firmware ships with.
    fn default() -> Self {
        Self {
            x_min: 1490,
            x_max: 2150,
            y_min: 1400,
            y_max: 2115,
            x_limit: 330,
            y_limit: 357,
        }
    }
}

impl DeviceRange {
    /// Check that both axes can be mapped.
    pub fn validate(&self) -> Result<(), NormalizeError> {
        for (axis, min, max, limit) in [
            ("x", self.x_min, self.x_max, self.x_limit),
            ("y", self.y_min, self.y_max, self.y_limit),
        ] {
            if min >= max {
                return Err(NormalizeError::EmptyRange { axis, min, max });
            }
            if limit == 0 {
                return Err(NormalizeError::ZeroLimit { axis });
            }
        }
        Ok(())
    }

    /// Map every sample onto the grid, keeping order. Readings outside the
    /// calibrated range are pinned to the nearest edge.
    pub fn normalize(&self, samples: &[Sample]) -> Result<Vec<Sample>, NormalizeError> {
        self.validate()?;
        Ok(samples
            .iter()
            .map(|s| {
                Sample::new(
                    map_axis(s.x, self.x_min, self.x_max, self.x_limit),
                    map_axis(s.y, self.y_min, self.y_max, self.y_limit),
                )
            })
            .collect())
    }
}

fn map_axis(value: i32, min: i32, max: i32, limit: u32) -> i32 {
    let value = i64::from(value.clamp(min, max));
    let (min, max) = (i64::from(min), i64::from(max));
    let cells = i64::from(limit) - 1;
    ((value - min) * cells / (max - min)) as i32
}
