//! Calendurr is the host side of a handwriting calendar. The device is a
//! touch panel with a microcontroller: while the user writes on a day cell it
//! streams the pen position over serial, and when the pen is lifted it tells
//! us which day was selected. This crate turns that stream into pictures an
//! OCR step can read.
//!
//! The pieces, in the order data flows through them:
//!
//! - a [`ChunkSource`](chunk_source::ChunkSource) hands out raw bytes from
//!   the serial link, a recording, or a [simulated device](dummy_device)
//! - the [`StreamSessionParser`] reassembles those bytes into protocol units
//!   and tracks the drawing session they describe
//! - the [`PointRasterizer`] draws a session's samples onto a canvas, which
//!   is encoded as a [bitmap] and a JPEG preview
//! - the [`SessionWriter`](session_writer::SessionWriter) puts the results
//!   on disk, and [`pipeline::drive`] runs the whole thing
//!
//! A session on the wire looks like this, one unit per line:
//!
//! ```text
//! START-1
//! 0000:[1820,1757],
//! 0001:[1822,1760],
//! STOP-1
//! DATE-1:6,15
//! END-1
//! ```

#![warn(missing_docs)]
pub mod args;
pub mod bitmap;
pub mod chunk_source;
pub mod config;
pub mod coordinate_file;
pub mod device_message_decoder;
pub mod dummy_device;
pub mod error;
pub mod line_framer;
pub mod normalizer;
pub mod pipeline;
pub mod rasterizer;
pub mod sample;
pub mod session_parser;
pub mod session_writer;

pub use error::CalendurrError;
pub use rasterizer::{render, PointRasterizer, RasterConfig};
pub use sample::{DateTag, Sample};
pub use session_parser::{ParsedEvent, ParserConfig, SessionState, StreamSessionParser};
