//! Where transport chunks come from.
//!
//! A [`ChunkSource`] is an iterator of raw byte chunks, one per
//! notification or read. The parser does not care which one it is fed by,
//! so the live serial link, a capture file and the [dummy
//! device](crate::dummy_device) all look the same to it.

use crate::line_framer::Framing;

use log::info;
use serial2::SerialPort;
use std::{
    collections::VecDeque,
    fs,
    io,
    path::{Path, PathBuf},
    time::Duration,
};

const READ_BUFFER_SIZE: usize = 256;

/// A typed iterator of transport chunks. A source ends when the link
/// closes; a read failure is yielded as an `Err` item.
pub trait ChunkSource: Iterator<Item = io::Result<Vec<u8>>> {
    /// A short human-readable name for logs
    fn describe(&self) -> String;

    /// How chunks map onto protocol units, if the source knows. Used to
    /// settle a parser configured with [`Framing::Auto`].
    fn framing_hint(&self) -> Option<Framing> {
        None
    }
}

/// A live serial link to the device.
pub struct SerialSource {
    path: PathBuf,
    port: SerialPort,
    buffer: [u8; READ_BUFFER_SIZE],
}

impl SerialSource {
    /// Open `path` at `baud_rate`. Reads block until data arrives.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut port = SerialPort::open(&path, baud_rate)?;
        // Not quite infinite, but about 584,942,417,355 years is close enough
        port.set_read_timeout(Duration::MAX)?;
        info!("Opened {} at {} baud", path.display(), baud_rate);

        Ok(Self {
            path,
            port,
            buffer: [0; READ_BUFFER_SIZE],
        })
    }

    /// Every serial port the OS knows about.
    pub fn available_ports() -> io::Result<Vec<PathBuf>> {
        SerialPort::available_ports()
    }
}

impl Iterator for SerialSource {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.port.read(&mut self.buffer) {
            Ok(0) => None,
            Ok(len) => Some(Ok(self.buffer[..len].to_vec())),
            Err(e) => Some(Err(e)),
        }
    }
}

impl ChunkSource for SerialSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    /// Reads return whatever bytes have arrived, so units can be split
    /// anywhere.
    fn framing_hint(&self) -> Option<Framing> {
        Some(Framing::Line)
    }
}

/// Replays a recorded stream, either in fixed-size fragments or one line at
/// a time.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    name: String,
    chunks: VecDeque<Vec<u8>>,
    pace: Option<Duration>,
}

impl ReplaySource {
    /// Split `bytes` into chunks of `chunk_size` bytes. A `chunk_size` of
    /// zero hands out one newline-terminated line per chunk instead.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, chunk_size: usize) -> Self {
        let chunks = if chunk_size == 0 {
            bytes
                .split_inclusive(|&b| b == b'\n')
                .map(<[u8]>::to_vec)
                .collect()
        } else {
            bytes.chunks(chunk_size).map(<[u8]>::to_vec).collect()
        };

        Self {
            name: name.into(),
            chunks,
            pace: None,
        }
    }

    /// Read a capture file from disk.
    pub fn from_path(path: impl AsRef<Path>, chunk_size: usize) -> io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        Ok(Self::new(path.display().to_string(), bytes, chunk_size))
    }

    /// Wait this long before handing out each chunk, like a real link.
    pub fn paced(mut self, pace: Duration) -> Self {
        self.pace = (!pace.is_zero()).then_some(pace);
        self
    }

    /// Chunks not yet handed out
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl Iterator for ReplaySource {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.pop_front()?;
        if let Some(pace) = self.pace {
            spin_sleep::sleep(pace);
        }
        Some(Ok(chunk))
    }
}

impl ChunkSource for ReplaySource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    /// A recording is a newline-terminated stream, whichever way it is cut.
    fn framing_hint(&self) -> Option<Framing> {
        Some(Framing::Line)
    }
}
