//! Turns chunks from a transport into complete protocol units.
//!
//! Some transports hand us one whole unit per notification, others hand us
//! arbitrary byte fragments of a newline-terminated stream. [`LineFramer`]
//! copes with both, holding on to the tail of an unterminated line until the
//! rest of it arrives.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

const LINE_TERMINATOR: u8 = b'\n';

/// How chunks from the transport map onto protocol units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Framing {
    /// Every chunk is exactly one unit.
    Unit,
    /// Chunks are fragments of a newline-terminated stream.
    Line,
    /// Treat chunks as whole units until one contains a newline, then switch
    /// to [`Framing::Line`] for the rest of the connection.
    #[default]
    Auto,
}

/// Buffers partial lines and yields complete, trimmed, non-empty units.
#[derive(Debug, Clone)]
pub struct LineFramer {
    framing: Framing,
    latched_to_lines: bool,
    partial: Vec<u8>,
}

impl LineFramer {
    /// Make a new framer with an empty buffer.
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            latched_to_lines: false,
            partial: Vec::new(),
        }
    }

    /// Whether this framer is currently splitting on line terminators.
    pub fn splits_lines(&self) -> bool {
        match self.framing {
            Framing::Unit => false,
            Framing::Line => true,
            Framing::Auto => self.latched_to_lines,
        }
    }

    /// Pin an [`Framing::Auto`] framer to `framing` without waiting for a
    /// line terminator. Explicit framings are left alone.
    pub fn settle(&mut self, framing: Framing) {
        if self.framing == Framing::Auto && framing != Framing::Auto {
            debug!("Framing settled as {:?}", framing);
            self.framing = framing;
        }
    }

    /// Number of bytes waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }

    /// Feed a chunk, returning every unit it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.framing == Framing::Auto
            && !self.latched_to_lines
            && chunk.contains(&LINE_TERMINATOR)
        {
            debug!("Saw a line terminator, switching to line framing");
            self.latched_to_lines = true;
        }

        if !self.splits_lines() {
            return decode_unit(chunk).into_iter().collect();
        }

        self.partial.extend_from_slice(chunk);

        let Some(last_terminator) = self.partial.iter().rposition(|&b| b == LINE_TERMINATOR)
        else {
            return Vec::new();
        };

        let rest = self.partial.split_off(last_terminator + 1);
        let complete = std::mem::replace(&mut self.partial, rest);

        complete
            .split(|&b| b == LINE_TERMINATOR)
            .filter_map(decode_unit)
            .collect()
    }

    /// Take whatever is left in the buffer as a final unit. Used when the
    /// stream ends without a trailing terminator.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.partial);
        decode_unit(&rest)
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(Framing::default())
    }
}

fn decode_unit(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    if let std::borrow::Cow::Owned(_) = text {
        // Often happens at the start of a transmission when there is still
        // garbage in the device's buffer
        warn!("Unit was not valid utf-8, decoded lossily: {:?}", text);
    }
    let unit = text.trim();
    (!unit.is_empty()).then(|| unit.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_framing_passes_chunks_through() {
        let mut framer = LineFramer::new(Framing::Unit);
        assert_eq!(framer.push(b"START-1"), vec!["START-1"]);
        assert_eq!(framer.push(b" 1:10,20 \r\n"), vec!["1:10,20"]);
        assert!(framer.push(b"   ").is_empty());
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn line_framing_holds_partial_lines() {
        let mut framer = LineFramer::new(Framing::Line);
        assert!(framer.push(b"STA").is_empty());
        assert_eq!(framer.pending(), 3);
        assert_eq!(framer.push(b"RT-1\n1:1"), vec!["START-1"]);
        assert_eq!(framer.push(b"0,20\n2:15,25\nST"), vec!["1:10,20", "2:15,25"]);
        assert_eq!(framer.push(b"OP-1\r\n"), vec!["STOP-1"]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn line_framing_skips_blank_lines() {
        let mut framer = LineFramer::new(Framing::Line);
        assert_eq!(framer.push(b"\n\nEND\n\r\n"), vec!["END"]);
    }

    #[test]
    fn split_multibyte_character() {
        let mut framer = LineFramer::new(Framing::Line);
        let bytes = "pen·up\n".as_bytes();
        let (head, tail) = bytes.split_at(4);
        assert!(framer.push(head).is_empty());
        assert_eq!(framer.push(tail), vec!["pen·up"]);
    }

    #[test]
    fn auto_framing_latches() {
        let mut framer = LineFramer::new(Framing::Auto);
        assert!(!framer.splits_lines());
        assert_eq!(framer.push(b"START-1"), vec!["START-1"]);
        assert_eq!(framer.push(b"1:10,20\n2:1"), vec!["1:10,20"]);
        assert!(framer.splits_lines());
        assert!(framer.push(b"5,25").is_empty());
        assert_eq!(framer.push(b"\n"), vec!["2:15,25"]);
    }

    #[test]
    fn settled_auto_framing_buffers_from_the_start() {
        let mut framer = LineFramer::new(Framing::Auto);
        framer.settle(Framing::Line);
        assert!(framer.splits_lines());
        assert!(framer.push(b"STA").is_empty());
        assert_eq!(framer.push(b"RT-1\n"), vec!["START-1"]);
    }

    #[test]
    fn settle_keeps_explicit_framing() {
        let mut framer = LineFramer::new(Framing::Unit);
        framer.settle(Framing::Line);
        assert!(!framer.splits_lines());
        assert_eq!(framer.push(b"STA"), vec!["STA"]);
    }

    #[test]
    fn flush_returns_tail() {
        let mut framer = LineFramer::new(Framing::Line);
        assert_eq!(framer.push(b"START\nEND-1"), vec!["START"]);
        assert_eq!(framer.flush(), Some("END-1".to_owned()));
        assert_eq!(framer.flush(), None);
    }
}
