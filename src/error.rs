//! The crate-wide error type. Each module has its own error enum; this one
//! wraps all of them so callers driving a whole run can use `?` throughout.

use crate::bitmap::BitmapError;
use crate::config::ConfigError;
use crate::normalizer::NormalizeError;
use crate::rasterizer::RasterError;
use crate::session_parser::ParserError;
use crate::session_writer::SessionWriterError;

use std::io;
use thiserror::Error;

/// Any failure during a run.
#[derive(Debug, Error)]
pub enum CalendurrError {
    /// Reading from the device or a file failed
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The settings file could not be used
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The parser was misused
    #[error(transparent)]
    Parser(#[from] ParserError),

    /// The raster settings cannot be drawn with
    #[error(transparent)]
    Raster(#[from] RasterError),

    /// Encoding a drawing failed
    #[error(transparent)]
    Bitmap(#[from] BitmapError),

    /// The normalisation settings cannot map anything
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Writing a session out failed
    #[error(transparent)]
    Writer(#[from] SessionWriterError),
}
