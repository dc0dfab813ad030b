//! The settings file, written in [ron]. Every field is optional; missing
//! fields take their defaults. A complete file looks like:
//!
//! ```text
//! (
//!     parser: (framing: Auto, dedup: true, date_policy: LastWins),
//!     raster: (
//!         width: Auto, height: Auto, padding: 10, point_diameter: 3.0,
//!         shape: Disk, origin: BoundingBox, min_dimension: 10,
//!         max_dimension: 4096, preview_quality: 80,
//!     ),
//!     normalize: None,
//! )
//! ```

use crate::normalizer::{DeviceRange, NormalizeError};
use crate::rasterizer::{RasterConfig, RasterError};
use crate::session_parser::ParserConfig;

use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error;

/// Things that can go wrong loading a settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid ron, or has fields of the wrong type
    #[error("ron error: {0}")]
    Ron(#[from] ron::de::SpannedError),

    /// The raster settings cannot be drawn with
    #[error("invalid raster settings: {0}")]
    Raster(#[from] RasterError),

    /// The normalisation settings cannot map anything
    #[error("invalid normalisation settings: {0}")]
    Normalize(#[from] NormalizeError),
}

/// Everything configurable about a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalendurrConfig {
    /// How the device stream is parsed
    pub parser: ParserConfig,
    /// How sessions are drawn
    pub raster: RasterConfig,
    /// Rescale samples onto the panel grid before drawing
    pub normalize: Option<DeviceRange>,
}

impl CalendurrConfig {
    /// Load and validate a settings file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }

    /// Check every section that has constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.raster.validate()?;
        if let Some(range) = &self.normalize {
            range.validate()?;
        }
        Ok(())
    }

    /// This configuration as pretty-printed ron.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

impl std::str::FromStr for CalendurrConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Self = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_framer::Framing;
    use crate::rasterizer::{Dimension, PointShape};
    use crate::session_parser::DatePolicy;
    use std::io::Write;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: CalendurrConfig = "()".parse().unwrap();
        assert_eq!(config, CalendurrConfig::default());
    }

    #[test]
    fn partial_file() {
        let config: CalendurrConfig = "(
            parser: (framing: Line, date_policy: FirstWins),
            raster: (width: Fixed(200), point_diameter: 5.5, shape: Square),
            normalize: Some(()),
        )"
        .parse()
        .unwrap();

        assert_eq!(config.parser.framing, Framing::Line);
        assert!(config.parser.dedup);
        assert_eq!(config.parser.date_policy, DatePolicy::FirstWins);
        assert_eq!(config.raster.width, Dimension::Fixed(200));
        assert_eq!(config.raster.height, Dimension::Auto);
        assert_eq!(config.raster.point_diameter, 5.5);
        assert_eq!(config.raster.shape, PointShape::Square);
        assert_eq!(config.normalize, Some(DeviceRange::default()));
    }

    #[test]
    fn pretty_output_reads_back() {
        let config = CalendurrConfig {
            normalize: Some(DeviceRange::default()),
            ..CalendurrConfig::default()
        };
        let text = config.to_ron().unwrap();
        assert_eq!(text.parse::<CalendurrConfig>().unwrap(), config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let result = "(raster: (point_diameter: 0.0))".parse::<CalendurrConfig>();
        assert!(matches!(
            result,
            Err(ConfigError::Raster(RasterError::InvalidDiameter(_)))
        ));

        let result = "(normalize: Some((x_min: 5, x_max: 5)))".parse::<CalendurrConfig>();
        assert!(matches!(result, Err(ConfigError::Normalize(_))));

        let result = "(raster: (padding: -1))".parse::<CalendurrConfig>();
        assert!(matches!(result, Err(ConfigError::Ron(_))));
    }

    #[test]
    fn from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"(parser: (dedup: false))").unwrap();
        let config = CalendurrConfig::from_path(file.path()).unwrap();
        assert!(!config.parser.dedup);

        assert!(matches!(
            CalendurrConfig::from_path("/definitely/not/here.ron"),
            Err(ConfigError::Io(_))
        ));
    }
}
