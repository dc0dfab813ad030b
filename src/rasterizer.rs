//! Draws a session's samples onto a [`Bitmap`].
//!
//! Each sample becomes a filled black mark on a white canvas, drawn in
//! sample order with later marks simply overwriting earlier ones. The
//! canvas is either sized to fit the samples ([`Dimension::Auto`]) or fixed
//! by the caller. The output depends only on the samples and the
//! [`RasterConfig`], so the same input always produces the same bytes.

use crate::bitmap::{Bitmap, Rgb, BLACK, WHITE};
use crate::sample::Sample;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side length of the canvas produced for a session with no samples.
pub const BLANK_CANVAS_SIZE: u32 = 100;

/// Largest `max_dimension` accepted. A square canvas this size still has a
/// BMP file size that fits the header's 32-bit field.
pub const DIMENSION_LIMIT: u32 = 32_768;

const BACKGROUND: Rgb = WHITE;
const FOREGROUND: Rgb = BLACK;

/// The size of one canvas axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Dimension {
    /// Fit the samples, plus padding on both sides
    #[default]
    Auto,
    /// Exactly this many pixels
    Fixed(u32),
}

/// The mark drawn for each sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum PointShape {
    /// A filled circle of the configured diameter
    #[default]
    Disk,
    /// A filled square whose side is the configured diameter
    Square,
}

/// Where a sample lands on the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Origin {
    /// Shift samples so the top-left of their bounding box sits at
    /// `(padding, padding)`
    #[default]
    BoundingBox,
    /// Use the sample's raw coordinates as pixel coordinates. An
    /// [`Dimension::Auto`] axis then runs from zero to the largest sample
    /// plus padding.
    Raw,
}

/// How to draw a session.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Canvas width
    pub width: Dimension,
    /// Canvas height
    pub height: Dimension,
    /// Blank margin added on each side of an [`Dimension::Auto`] axis
    pub padding: u32,
    /// Diameter of each mark, in pixels. May be fractional.
    pub point_diameter: f64,
    /// Shape of each mark
    pub shape: PointShape,
    /// Translation from sample space to canvas space
    pub origin: Origin,
    /// Smallest size an [`Dimension::Auto`] axis may take
    pub min_dimension: u32,
    /// Largest size any axis may take, at most [`DIMENSION_LIMIT`]
    pub max_dimension: u32,
    /// JPEG quality of the preview, `1..=100`
    pub preview_quality: u8,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            padding: 10,
            point_diameter: 3.0,
            shape: PointShape::Disk,
            origin: Origin::BoundingBox,
            min_dimension: 10,
            max_dimension: 4096,
            preview_quality: 80,
        }
    }
}

/// A [`RasterConfig`] that cannot be drawn with.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RasterError {
    /// A fixed axis was zero pixels long
    #[error("{axis} must be greater than zero")]
    ZeroDimension {
        /// `"width"` or `"height"`
        axis: &'static str,
    },

    /// A fixed axis exceeded `max_dimension`
    #[error("{axis} of {size} exceeds the maximum of {max}")]
    DimensionTooLarge {
        /// `"width"` or `"height"`
        axis: &'static str,
        /// The requested size
        size: u32,
        /// The configured maximum
        max: u32,
    },

    /// The point diameter was zero, negative or not a number
    #[error("point diameter must be a positive number, got {0}")]
    InvalidDiameter(f64),

    /// `min_dimension` was zero
    #[error("minimum dimension must be greater than zero")]
    ZeroMinimumDimension,

    /// `min_dimension` was larger than `max_dimension`
    #[error("minimum dimension {min} is larger than the maximum {max}")]
    MinimumAboveMaximum {
        /// The configured minimum
        min: u32,
        /// The configured maximum
        max: u32,
    },

    /// `max_dimension` was above [`DIMENSION_LIMIT`]
    #[error("maximum dimension {0} is larger than the limit of {DIMENSION_LIMIT}")]
    MaximumTooLarge(u32),

    /// `preview_quality` was outside `1..=100`
    #[error("preview quality must be between 1 and 100, got {0}")]
    InvalidPreviewQuality(u8),
}

impl RasterConfig {
    /// Check that this configuration can be drawn with.
    pub fn validate(&self) -> Result<(), RasterError> {
        if !self.point_diameter.is_finite() || self.point_diameter <= 0.0 {
            return Err(RasterError::InvalidDiameter(self.point_diameter));
        }
        if self.min_dimension == 0 {
            return Err(RasterError::ZeroMinimumDimension);
        }
        if self.max_dimension > DIMENSION_LIMIT {
            return Err(RasterError::MaximumTooLarge(self.max_dimension));
        }
        if self.min_dimension > self.max_dimension {
            return Err(RasterError::MinimumAboveMaximum {
                min: self.min_dimension,
                max: self.max_dimension,
            });
        }
        if !(1..=100).contains(&self.preview_quality) {
            return Err(RasterError::InvalidPreviewQuality(self.preview_quality));
        }
        for (axis, dimension) in [("width", self.width), ("height", self.height)] {
            match dimension {
                Dimension::Fixed(0) => return Err(RasterError::ZeroDimension { axis }),
                Dimension::Fixed(size) if size > self.max_dimension => {
                    return Err(RasterError::DimensionTooLarge {
                        axis,
                        size,
                        max: self.max_dimension,
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// The smallest rectangle holding every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl Bounds {
    fn of(samples: &[Sample]) -> Option<Self> {
        let (first, rest) = samples.split_first()?;
        let start = Bounds {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        Some(rest.iter().fold(start, |b, s| Bounds {
            min_x: b.min_x.min(s.x),
            max_x: b.max_x.max(s.x),
            min_y: b.min_y.min(s.y),
            max_y: b.max_y.max(s.y),
        }))
    }
}

/// Draws samples with a validated [`RasterConfig`]. Holds no state between
/// calls, so one rasterizer can be shared by any number of sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRasterizer {
    config: RasterConfig,
}

impl PointRasterizer {
    /// Make a rasterizer, rejecting configurations that cannot be drawn.
    pub fn new(config: RasterConfig) -> Result<Self, RasterError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration in use
    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Draw `samples`, in order, onto a fresh canvas.
    pub fn render(&self, samples: &[Sample]) -> Bitmap {
        let Some(bounds) = Bounds::of(samples) else {
            debug!("No samples, rendering a blank canvas");
            return Bitmap::filled(BLANK_CANVAS_SIZE, BLANK_CANVAS_SIZE, BACKGROUND);
        };

        let width = self.axis_size(self.config.width, bounds.min_x, bounds.max_x);
        let height = self.axis_size(self.config.height, bounds.min_y, bounds.max_y);
        let padding = i64::from(self.config.padding);
        let mut bitmap = Bitmap::filled(width, height, BACKGROUND);

        let (offset_x, offset_y) = match self.config.origin {
            Origin::BoundingBox => (
                padding - i64::from(bounds.min_x),
                padding - i64::from(bounds.min_y),
            ),
            Origin::Raw => (0, 0),
        };

        debug!(
            "Rendering {} samples onto a {}x{} canvas",
            samples.len(),
            width,
            height
        );
        for sample in samples {
            self.stamp(
                &mut bitmap,
                i64::from(sample.x) + offset_x,
                i64::from(sample.y) + offset_y,
            );
        }

        bitmap
    }

    /// Size of an axis whose samples run from `min` to `max`. With a raw
    /// origin the canvas starts at zero, so an auto axis has to reach `max`.
    fn axis_size(&self, dimension: Dimension, min: i32, max: i32) -> u32 {
        let padding = i64::from(self.config.padding);
        match dimension {
            Dimension::Fixed(size) => size,
            Dimension::Auto => {
                let span = match self.config.origin {
                    Origin::BoundingBox => i64::from(max) - i64::from(min) + 1 + 2 * padding,
                    Origin::Raw => i64::from(max) + 1 + padding,
                };
                let clamped = span.clamp(
                    i64::from(self.config.min_dimension),
                    i64::from(self.config.max_dimension),
                );
                if clamped < span {
                    debug!("Clamping a {} pixel axis to {}", span, clamped);
                }
                clamped as u32
            }
        }
    }

    /// Paint one mark centred on `(cx, cy)`, clipped to the canvas.
    fn stamp(&self, bitmap: &mut Bitmap, cx: i64, cy: i64) {
        let radius = self.config.point_diameter / 2.0;
        // No mark needs to reach further than across the whole canvas
        let longest_side = f64::from(bitmap.width().max(bitmap.height()));
        let reach = radius.floor().min(longest_side) as i64;

        let x_range = (cx - reach).max(0)..=(cx + reach).min(i64::from(bitmap.width()) - 1);
        let y_range = (cy - reach).max(0)..=(cy + reach).min(i64::from(bitmap.height()) - 1);

        for y in y_range {
            for x in x_range.clone() {
                let dx = (x - cx) as f64;
                let dy = (y - cy) as f64;
                let inside = match self.config.shape {
                    PointShape::Disk => dx * dx + dy * dy <= radius * radius,
                    PointShape::Square => dx.abs() <= radius && dy.abs() <= radius,
                };
                if inside {
                    bitmap.set_pixel(x, y, FOREGROUND);
                }
            }
        }
    }
}

/// Validate `config` and draw `samples` with it in one go.
pub fn render(samples: &[Sample], config: &RasterConfig) -> Result<Bitmap, RasterError> {
    Ok(PointRasterizer::new(*config)?.render(samples))
}
