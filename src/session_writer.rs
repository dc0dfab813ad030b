//! The host side of a session: once the device stops sending coordinates,
//! draw them and put the results on disk where the OCR step can find them.
//!
//! For every session a [`SessionWriter`] produces four files sharing the
//! stem `session-NNN`:
//!
//! - `.bmp`, the uncompressed drawing
//! - `.jpg`, a preview of the drawing
//! - `.txt`, the samples as a [coordinate capture](crate::coordinate_file)
//! - `.ron`, a [`SessionSummary`]
//!
//! The drawing is made as soon as `STOP` arrives, but the files are only
//! written once the device sends `END` (so the date can be included), a new
//! session starts, or the writer is finished. A `STOP` or `END` seen
//! outside a started session writes nothing.

use crate::bitmap::{Bitmap, BitmapError};
use crate::coordinate_file::write_coordinates;
use crate::normalizer::{DeviceRange, NormalizeError};
use crate::rasterizer::PointRasterizer;
use crate::sample::{DateTag, Sample};
use crate::session_parser::{ParsedEvent, Session};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Things that can go wrong while writing a session out.
#[derive(Debug, Error)]
pub enum SessionWriterError {
    /// Creating a directory or writing a file failed
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Encoding the drawing failed
    #[error("bitmap error: {0}")]
    Bitmap(#[from] BitmapError),

    /// Serialising the summary failed
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),

    /// The normalisation settings cannot map anything
    #[error("normalisation error: {0}")]
    Normalize(#[from] NormalizeError),
}

/// What was written for one session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSummary {
    /// Position of this session in the run, starting at 1
    pub index: usize,
    /// Samples drawn
    pub samples: usize,
    /// The date the device reported, if any
    pub date: Option<DateTag>,
    /// Whether the device sent `END`
    pub completed: bool,
    /// Canvas width
    pub width: u32,
    /// Canvas height
    pub height: u32,
}

#[derive(Debug)]
struct PendingSession {
    samples: Vec<Sample>,
    bitmap: Bitmap,
}

/// Draws finished sessions and writes them to a directory.
#[derive(Debug)]
pub struct SessionWriter {
    out_dir: PathBuf,
    rasterizer: PointRasterizer,
    normalize: Option<DeviceRange>,
    next_index: usize,
    pending: Option<PendingSession>,
    in_session: bool,
}

impl SessionWriter {
    /// Write sessions into `out_dir`, creating it if needed.
    pub fn new(
        out_dir: impl AsRef<Path>,
        rasterizer: PointRasterizer,
        normalize: Option<DeviceRange>,
    ) -> Result<Self, SessionWriterError> {
        let out_dir = out_dir.as_ref().to_path_buf();
        fs::create_dir_all(&out_dir)?;
        if let Some(range) = &normalize {
            range.validate()?;
        }

        Ok(Self {
            out_dir,
            rasterizer,
            normalize,
            next_index: 1,
            pending: None,
            in_session: false,
        })
    }

    /// React to one event from the parser. `session` is the parser's view of
    /// the session after that event. Returns a summary whenever a session is
    /// written out.
    pub fn handle(
        &mut self,
        event: &ParsedEvent,
        session: &Session,
    ) -> Result<Option<SessionSummary>, SessionWriterError> {
        match event {
            ParsedEvent::SessionStarted => {
                let summary = match self.pending.take() {
                    Some(pending) => {
                        warn!("New session started before the last one ended");
                        Some(self.write(pending, None, false)?)
                    }
                    None => None,
                };
                self.in_session = true;
                Ok(summary)
            }
            ParsedEvent::SessionStopped { .. } if self.in_session => {
                self.pending = Some(self.draw(session.samples())?);
                Ok(None)
            }
            ParsedEvent::SessionStopped { .. } => {
                debug!("Stop outside a session, nothing to draw");
                Ok(None)
            }
            ParsedEvent::SessionCompleted { .. } => {
                let pending = match self.pending.take() {
                    Some(pending) => pending,
                    None if self.in_session => self.draw(session.samples())?,
                    None => {
                        debug!("End of a session that never started, nothing to write");
                        return Ok(None);
                    }
                };
                self.write(pending, session.date_tag(), true).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Write out a session that was stopped but never completed.
    pub fn finish(&mut self) -> Result<Option<SessionSummary>, SessionWriterError> {
        match self.pending.take() {
            Some(pending) => self.write(pending, None, false).map(Some),
            None => Ok(None),
        }
    }

    /// Where sessions are written
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn draw(&self, samples: &[Sample]) -> Result<PendingSession, SessionWriterError> {
        let samples = match &self.normalize {
            Some(range) => range.normalize(samples)?,
            None => samples.to_vec(),
        };
        let bitmap = self.rasterizer.render(&samples);
        Ok(PendingSession { samples, bitmap })
    }

    fn write(
        &mut self,
        pending: PendingSession,
        date: Option<DateTag>,
        completed: bool,
    ) -> Result<SessionSummary, SessionWriterError> {
        let index = self.next_index;
        self.next_index += 1;
        self.in_session = false;
        let stem = self.out_dir.join(format!("session-{:03}", index));

        let PendingSession { samples, bitmap } = pending;
        bitmap.save_bmp(stem.with_extension("bmp"))?;
        bitmap.save_preview(
            stem.with_extension("jpg"),
            self.rasterizer.config().preview_quality,
        )?;
        write_coordinates(stem.with_extension("txt"), &samples)?;

        let summary = SessionSummary {
            index,
            samples: samples.len(),
            date,
            completed,
            width: bitmap.width(),
            height: bitmap.height(),
        };
        let text = ron::ser::to_string_pretty(&summary, ron::ser::PrettyConfig::default())?;
        fs::write(stem.with_extension("ron"), text)?;

        info!(
            "Session {} written to {} ({} samples, date {})",
            index,
            stem.display(),
            summary.samples,
            date.map_or_else(|| "unknown".to_owned(), |d| d.to_string())
        );
        Ok(summary)
    }
}
