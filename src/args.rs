//! Commandline argument parser using clap for calendurr

use crate::config::CalendurrConfig;
use crate::normalizer::DeviceRange;
use crate::rasterizer::{Dimension, Origin, PointShape};

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Turns pen sessions from the calendar device into bitmaps
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct CalendurrArgs {
    #[command(subcommand)]
    /// Where the coordinates come from
    pub command: CommandTask,

    /// Settings file in ron format. Flags below override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Drawing overrides
    #[command(flatten)]
    pub raster: RasterArgs,
}

/// Overrides for the drawing settings
#[derive(Debug, Args, Clone, Default)]
pub struct RasterArgs {
    /// Fixed canvas width in pixels, instead of fitting the samples
    #[arg(long, global = true)]
    pub width: Option<u32>,

    /// Fixed canvas height in pixels, instead of fitting the samples
    #[arg(long, global = true)]
    pub height: Option<u32>,

    /// Margin around the samples when the canvas is fitted
    #[arg(long, global = true)]
    pub padding: Option<u32>,

    /// Diameter of each mark, in pixels
    #[arg(short, long, global = true)]
    pub diameter: Option<f64>,

    /// Shape of each mark
    #[arg(long, global = true, value_enum)]
    pub shape: Option<ShapeArg>,

    /// Draw samples at their raw coordinates instead of their bounding box
    #[arg(long, global = true)]
    pub raw_origin: bool,

    /// Rescale samples with the default panel calibration, unless the
    /// settings file has its own
    #[arg(short, long, global = true)]
    pub normalize: bool,
}

/// Mark shapes selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShapeArg {
    /// Filled circle
    Disk,
    /// Filled square
    Square,
}

impl From<ShapeArg> for PointShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Disk => PointShape::Disk,
            ShapeArg::Square => PointShape::Square,
        }
    }
}

impl RasterArgs {
    /// Write every flag that was given into `config`.
    pub fn apply(&self, config: &mut CalendurrConfig) {
        if let Some(width) = self.width {
            config.raster.width = Dimension::Fixed(width);
        }
        if let Some(height) = self.height {
            config.raster.height = Dimension::Fixed(height);
        }
        if let Some(padding) = self.padding {
            config.raster.padding = padding;
        }
        if let Some(diameter) = self.diameter {
            config.raster.point_diameter = diameter;
        }
        if let Some(shape) = self.shape {
            config.raster.shape = shape.into();
        }
        if self.raw_origin {
            config.raster.origin = Origin::Raw;
        }
        if self.normalize && config.normalize.is_none() {
            config.normalize = Some(DeviceRange::default());
        }
    }
}

/// What to do
#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// List the serial ports that could be the device
    #[command(about)]
    Ports,

    /// Read sessions from the device over serial
    #[command(about)]
    Listen(ListenCommand),

    /// Read sessions from a recording of the serial stream
    #[command(about)]
    Replay(ReplayCommand),

    /// Generate a session and feed it through as if it came from the device
    #[command(about)]
    Simulate(SimulateCommand),

    /// Draw a coordinate capture file
    #[command(about)]
    Render(RenderCommand),
}

/// Options for `listen`
#[derive(Debug, Args, Clone)]
pub struct ListenCommand {
    /// Serial port of the device. Prompts with a list when left out
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate of the link
    #[arg(short, long, default_value_t = 115200)]
    pub baud: u32,

    /// Directory sessions are written to
    #[arg(short, long = "out-dir")]
    pub out_dir: PathBuf,
}

/// Options for `replay`
#[derive(Debug, Args, Clone)]
pub struct ReplayCommand {
    /// File holding the raw serial stream
    pub capture: PathBuf,

    /// Bytes handed to the parser at a time, or 0 for a line at a time
    #[arg(long, default_value_t = 0)]
    pub chunk_size: usize,

    /// Directory sessions are written to
    #[arg(short, long = "out-dir")]
    pub out_dir: PathBuf,
}

/// Options for `simulate`
#[derive(Debug, Args, Clone)]
pub struct SimulateCommand {
    /// Number of samples in the session
    #[arg(long, default_value_t = 64)]
    pub points: usize,

    /// Seed for the generated drawing
    #[arg(short, long, default_value_t = 0)]
    pub seed: u64,

    /// Month the device reports
    #[arg(long, default_value_t = 1)]
    pub month: i64,

    /// Day the device reports
    #[arg(long, default_value_t = 1)]
    pub day: i64,

    /// Bytes handed to the parser at a time, or 0 for a line at a time
    #[arg(long, default_value_t = 16)]
    pub chunk_size: usize,

    /// Delay between chunks, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub pace_ms: u64,

    /// Directory sessions are written to
    #[arg(short, long = "out-dir")]
    pub out_dir: PathBuf,
}

/// Options for `render`
#[derive(Debug, Args, Clone)]
pub struct RenderCommand {
    /// Coordinate capture to draw
    pub coords: PathBuf,

    /// Where to write the bitmap
    #[arg(short, long)]
    pub out: PathBuf,

    /// Also write a JPEG preview here
    #[arg(long)]
    pub preview: Option<PathBuf>,
}
