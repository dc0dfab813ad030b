//! Glue between a [`ChunkSource`], the [`StreamSessionParser`] and a
//! [`SessionWriter`].

use crate::chunk_source::ChunkSource;
use crate::error::CalendurrError;
use crate::session_parser::{ParsedEvent, StreamSessionParser};
use crate::session_writer::{SessionSummary, SessionWriter};

use log::{debug, info, warn};

/// Read `source` until it closes, writing every session it contains. The
/// parser is flushed and torn down at the end, and any session that was
/// stopped but never completed is written too.
///
/// A parser configured with [`Framing::Auto`](crate::line_framer::Framing)
/// takes the source's framing hint. If the source fails, a session that was
/// already stopped is still written before the error is returned.
///
/// Returns the summaries of the sessions written, in order.
pub fn drive<S: ChunkSource>(
    source: S,
    parser: &mut StreamSessionParser,
    writer: &mut SessionWriter,
) -> Result<Vec<SessionSummary>, CalendurrError> {
    let name = source.describe();
    info!("Reading from {}, writing to {}", name, writer.out_dir().display());
    if let Some(framing) = source.framing_hint() {
        parser.settle_framing(framing);
    }

    let mut summaries = Vec::new();
    for chunk in source {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Lost {}: {}", name, e);
                parser.teardown();
                if let Some(summary) = writer.finish()? {
                    info!("Saved session {} before giving up", summary.index);
                }
                return Err(e.into());
            }
        };
        let events = parser.ingest_bytes(&chunk)?;
        forward(&events, parser, writer, &mut summaries)?;
    }

    let events = parser.flush()?;
    forward(&events, parser, writer, &mut summaries)?;
    parser.teardown();
    summaries.extend(writer.finish()?);

    info!("Source closed after {} sessions", summaries.len());
    Ok(summaries)
}

fn forward(
    events: &[ParsedEvent],
    parser: &StreamSessionParser,
    writer: &mut SessionWriter,
    summaries: &mut Vec<SessionSummary>,
) -> Result<(), CalendurrError> {
    for event in events {
        debug!("{:?}", event);
        summaries.extend(writer.handle(event, parser.session())?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_source::ReplaySource;
    use crate::coordinate_file::read_coordinates;
    use crate::dummy_device::DummyDevice;
    use crate::line_framer::Framing;
    use crate::rasterizer::{PointRasterizer, RasterConfig};
    use crate::sample::{DateTag, Sample};
    use crate::session_parser::{ParserConfig, ParserError};
    use std::{collections::VecDeque, io};

    /// Hands out its chunks, then fails like an unplugged serial port.
    struct UnpluggedSource {
        chunks: VecDeque<Vec<u8>>,
    }

    impl Iterator for UnpluggedSource {
        type Item = io::Result<Vec<u8>>;

        fn next(&mut self) -> Option<Self::Item> {
            Some(self.chunks.pop_front().ok_or_else(|| {
                io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected")
            }))
        }
    }

    impl ChunkSource for UnpluggedSource {
        fn describe(&self) -> String {
            "unplugged".to_owned()
        }

        fn framing_hint(&self) -> Option<Framing> {
            Some(Framing::Line)
        }
    }

    fn writer(dir: &std::path::Path) -> SessionWriter {
        let rasterizer = PointRasterizer::new(RasterConfig::default()).unwrap();
        SessionWriter::new(dir, rasterizer, None).unwrap()
    }

    #[test]
    fn simulated_session_in_small_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let device = DummyDevice::builder()
            .num_points(40)
            .seed(7)
            .date(3, 9)
            .build();
        let expected = device.samples().to_vec();

        let mut parser = StreamSessionParser::default();
        let summaries = drive(device.into_source(5), &mut parser, &mut writer(dir.path())).unwrap();

        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].completed);
        assert_eq!(summaries[0].date, DateTag::new(3, 9));
        assert_eq!(
            read_coordinates(dir.path().join("session-001.txt")).unwrap(),
            expected
        );
        assert!(parser.is_torn_down());
        assert_eq!(parser.ingest("START\n"), Err(ParserError::TornDown));
    }

    #[test]
    fn default_parser_reassembles_a_split_start() {
        let dir = tempfile::tempdir().unwrap();
        let text = b"START-1\n1:10,20\n2:15,25\nSTOP-1\n";
        let source = ReplaySource::new("capture", text.to_vec(), 3);

        let mut parser = StreamSessionParser::default();
        let summaries = drive(source, &mut parser, &mut writer(dir.path())).unwrap();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].samples, 2);
        assert_eq!(
            read_coordinates(dir.path().join("session-001.txt")).unwrap(),
            vec![Sample::new(10, 20), Sample::new(15, 25)]
        );
    }

    #[test]
    fn stopped_session_survives_a_dropped_link() {
        let dir = tempfile::tempdir().unwrap();
        let source = UnpluggedSource {
            chunks: VecDeque::from([b"START\n1:1,1\n2:".to_vec(), b"2,2\nSTOP\nDA".to_vec()]),
        };

        let mut parser = StreamSessionParser::default();
        let result = drive(source, &mut parser, &mut writer(dir.path()));

        assert!(matches!(result, Err(CalendurrError::Io(_))));
        assert!(parser.is_torn_down());
        assert_eq!(
            read_coordinates(dir.path().join("session-001.txt")).unwrap(),
            vec![Sample::new(1, 1), Sample::new(2, 2)]
        );
        let summary = std::fs::read_to_string(dir.path().join("session-001.ron")).unwrap();
        assert!(summary.contains("completed: false"));
    }

    #[test]
    fn several_sessions_and_a_trailing_unit() {
        let dir = tempfile::tempdir().unwrap();
        let text = "START-1\n1:1,1\nSTOP-1\nDATE-1:1,2\nEND-1\n\
                    START-2\n1:5,5\n2:6,6\nSTOP-2\nDATE-2:12,31\nEND-2";
        let source = ReplaySource::new("capture", text.as_bytes().to_vec(), 7);

        let mut parser = StreamSessionParser::new(ParserConfig::default());
        let summaries = drive(source, &mut parser, &mut writer(dir.path())).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].date, DateTag::new(1, 2));
        assert_eq!(summaries[1].samples, 2);
        assert_eq!(summaries[1].date, DateTag::new(12, 31));
        assert!(summaries[1].completed);
    }

    #[test]
    fn stream_cut_after_stop() {
        let dir = tempfile::tempdir().unwrap();
        let source = ReplaySource::new("capture", b"START\n1:1,1\n2:2,2\nSTOP\n".to_vec(), 0);

        let mut parser = StreamSessionParser::default();
        let summaries = drive(source, &mut parser, &mut writer(dir.path())).unwrap();

        assert_eq!(summaries.len(), 1);
        assert!(!summaries[0].completed);
        assert_eq!(summaries[0].samples, 2);
    }

    #[test]
    fn nothing_to_write() {
        let dir = tempfile::tempdir().unwrap();
        let source = ReplaySource::new("noise", b"hello\n1:2,3\n".to_vec(), 3);
        let mut parser = StreamSessionParser::default();
        let summaries = drive(source, &mut parser, &mut writer(dir.path())).unwrap();
        assert!(summaries.is_empty());
    }
}
