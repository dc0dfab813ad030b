//! The session state machine that sits on top of the device protocol.
//!
//! A [`StreamSessionParser`] is owned by whoever owns the connection to one
//! device. Every chunk that arrives from the transport goes through
//! [`StreamSessionParser::ingest`], which returns the [`ParsedEvent`]s that
//! chunk produced, in order. Noisy input never stops the stream; it only
//! shows up as diagnostic events.
//!
//! The machine is permissive: a `START` unit resets the session from any
//! state, and the other control units are accepted from any state too.
//!
//! ```text
//!          START            STOP              END
//!   Idle ───────▶ Collecting ─────▶ AwaitingDate ─────▶ Completed
//!                     ▲                                    │
//!                     └────────────── START ◀──────────────┘
//! ```

use crate::device_message_decoder::DeviceMessage;
use crate::line_framer::{Framing, LineFramer};
use crate::sample::{DateTag, Sample};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The phase a [`Session`] is in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SessionState {
    /// No `START` seen yet
    #[default]
    Idle,
    /// Accepting coordinates
    Collecting,
    /// Coordinates are done, a date may follow
    AwaitingDate,
    /// The device sent `END`
    Completed,
}

/// What to do when a session receives more than one valid date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum DatePolicy {
    /// A later date replaces an earlier one.
    #[default]
    LastWins,
    /// The first valid date sticks.
    FirstWins,
}

/// Knobs for a [`StreamSessionParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    /// How transport chunks map onto units
    pub framing: Framing,
    /// Drop a unit that is byte-identical to the one before it
    pub dedup: bool,
    /// Which date to keep when several arrive
    pub date_policy: DatePolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            framing: Framing::default(),
            dedup: true,
            date_policy: DatePolicy::default(),
        }
    }
}

/// Everything the parser produces, in the order the units arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    /// A new session began and the sample list was cleared
    SessionStarted,
    /// A coordinate was appended to the session
    SampleReceived(Sample),
    /// Coordinate collection ended with `count` samples
    SessionStopped {
        /// Samples collected in this session
        count: usize,
    },
    /// The session's date tag was set
    DateReceived(DateTag),
    /// The device finished the session
    SessionCompleted {
        /// Samples collected in this session
        final_count: usize,
    },
    /// A coordinate-shaped unit whose numbers did not parse
    MalformedSample {
        /// The unit as received
        raw: String,
    },
    /// A date unit that did not parse or was out of range
    MalformedDate {
        /// The unit as received
        raw: String,
    },
    /// A unit that matched nothing in the protocol
    UnrecognizedUnit {
        /// The unit as received
        raw: String,
    },
}

impl ParsedEvent {
    /// Whether this event only reports bad input.
    pub fn is_diagnostic(&self) -> bool {
        matches!(
            self,
            Self::MalformedSample { .. } | Self::MalformedDate { .. } | Self::UnrecognizedUnit { .. }
        )
    }
}

/// One collection cycle: `START`, coordinates, `STOP`, `DATE`, `END`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    state: SessionState,
    samples: Vec<Sample>,
    date_tag: Option<DateTag>,
}

impl Session {
    /// Current phase
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Samples in arrival order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The date, if one has been received
    pub fn date_tag(&self) -> Option<DateTag> {
        self.date_tag
    }
}

/// Misuse of a [`StreamSessionParser`] by its caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParserError {
    /// The parser was torn down and cannot take more input.
    #[error("parser has been torn down")]
    TornDown,
}

/// Turns a fragmented stream from the device into [`ParsedEvent`]s while
/// tracking the current [`Session`].
#[derive(Debug, Clone)]
pub struct StreamSessionParser {
    config: ParserConfig,
    framer: LineFramer,
    session: Session,
    last_unit: Option<String>,
    torn_down: bool,
}

impl StreamSessionParser {
    /// Make a parser for a freshly opened connection.
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            framer: LineFramer::new(config.framing),
            session: Session::default(),
            last_unit: None,
            torn_down: false,
        }
    }

    /// Feed a text chunk from the transport.
    pub fn ingest(&mut self, chunk: &str) -> Result<Vec<ParsedEvent>, ParserError> {
        self.ingest_bytes(chunk.as_bytes())
    }

    /// Feed a raw byte chunk from the transport.
    pub fn ingest_bytes(&mut self, chunk: &[u8]) -> Result<Vec<ParsedEvent>, ParserError> {
        if self.torn_down {
            return Err(ParserError::TornDown);
        }
        debug!("Received a {} byte chunk", chunk.len());

        let mut events = Vec::new();
        for unit in self.framer.push(chunk) {
            self.process_unit(unit, &mut events);
        }
        Ok(events)
    }

    /// Tell a parser configured with [`Framing::Auto`] how the transport
    /// actually frames its chunks. Has no effect on an explicit framing.
    pub fn settle_framing(&mut self, framing: Framing) {
        self.framer.settle(framing);
    }

    /// Process whatever unterminated text is still buffered as a final unit.
    /// Call this when the stream ends.
    pub fn flush(&mut self) -> Result<Vec<ParsedEvent>, ParserError> {
        if self.torn_down {
            return Err(ParserError::TornDown);
        }

        let mut events = Vec::new();
        if let Some(unit) = self.framer.flush() {
            self.process_unit(unit, &mut events);
        }
        Ok(events)
    }

    /// Stop accepting input. Any later `ingest` is an error.
    pub fn teardown(&mut self) {
        if self.framer.pending() > 0 {
            warn!(
                "Tearing down with {} unterminated bytes buffered",
                self.framer.pending()
            );
        }
        self.torn_down = true;
    }

    /// Whether [`teardown`](Self::teardown) has been called.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// The session being tracked
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current phase of the session
    pub fn state(&self) -> SessionState {
        self.session.state
    }

    /// Samples collected so far, in arrival order
    pub fn samples(&self) -> &[Sample] {
        &self.session.samples
    }

    /// The session's date, if any
    pub fn date_tag(&self) -> Option<DateTag> {
        self.session.date_tag
    }

    fn process_unit(&mut self, unit: String, events: &mut Vec<ParsedEvent>) {
        if self.config.dedup && self.last_unit.as_deref() == Some(unit.as_str()) {
            debug!("Duplicate unit {:?}, ignoring", unit);
            return;
        }

        let message = DeviceMessage::decode(&unit);
        debug!("Unit {:?} decoded as {:?}", unit, message);

        if let Some(event) = self.apply(message, &unit) {
            events.push(event);
        }
        self.last_unit = Some(unit);
    }

    fn apply(&mut self, message: DeviceMessage, unit: &str) -> Option<ParsedEvent> {
        let session = &mut self.session;

        if message.is_coordinate() && session.state != SessionState::Collecting {
            debug!("Coordinate {:?} outside a session, ignoring", unit);
            return None;
        }

        match message {
            DeviceMessage::Start => {
                if session.state == SessionState::Collecting {
                    info!(
                        "Session restarted, discarding {} samples",
                        session.samples.len()
                    );
                } else {
                    info!("Session started");
                }
                *session = Session {
                    state: SessionState::Collecting,
                    ..Session::default()
                };
                Some(ParsedEvent::SessionStarted)
            }
            DeviceMessage::Stop => {
                session.state = SessionState::AwaitingDate;
                let count = session.samples.len();
                info!("Session stopped with {} samples", count);
                Some(ParsedEvent::SessionStopped { count })
            }
            DeviceMessage::Date(date) => {
                match (self.config.date_policy, session.date_tag) {
                    (DatePolicy::FirstWins, Some(kept)) => {
                        info!("Keeping date {}, ignoring {}", kept, date);
                    }
                    _ => {
                        info!("Session date is {}", date);
                        session.date_tag = Some(date);
                    }
                }
                Some(ParsedEvent::DateReceived(date))
            }
            DeviceMessage::MalformedDate => {
                warn!("Could not use date unit {:?}", unit);
                Some(ParsedEvent::MalformedDate {
                    raw: unit.to_owned(),
                })
            }
            DeviceMessage::End => {
                session.state = SessionState::Completed;
                let final_count = session.samples.len();
                info!("Session completed with {} samples", final_count);
                Some(ParsedEvent::SessionCompleted { final_count })
            }
            DeviceMessage::Coordinate(sample) => {
                session.samples.push(sample);
                Some(ParsedEvent::SampleReceived(sample))
            }
            DeviceMessage::MalformedCoordinate => {
                warn!("Was unable to parse coordinate {:?}", unit);
                Some(ParsedEvent::MalformedSample {
                    raw: unit.to_owned(),
                })
            }
            DeviceMessage::Unrecognized => {
                warn!("Unrecognized unit {:?}", unit);
                Some(ParsedEvent::UnrecognizedUnit {
                    raw: unit.to_owned(),
                })
            }
        }
    }
}

impl Default for StreamSessionParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy_device::DummyDevice;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const SCENARIO: [&str; 6] = [
        "START-1",
        "1:10,20",
        "2:15,25",
        "STOP-1",
        "DATE-1:6,15",
        "END-1",
    ];

    fn unit_parser() -> StreamSessionParser {
        StreamSessionParser::new(ParserConfig {
            framing: Framing::Unit,
            ..ParserConfig::default()
        })
    }

    fn line_parser() -> StreamSessionParser {
        StreamSessionParser::new(ParserConfig {
            framing: Framing::Line,
            ..ParserConfig::default()
        })
    }

    fn feed_units(parser: &mut StreamSessionParser, units: &[&str]) -> Vec<ParsedEvent> {
        units
            .iter()
            .flat_map(|u| parser.ingest(u).unwrap())
            .collect()
    }

    /// Split `text` into random fragments of 1 to `max_len` bytes.
    fn fragment(text: &str, max_len: usize, rng: &mut StdRng) -> Vec<Vec<u8>> {
        let bytes = text.as_bytes();
        let mut out = Vec::new();
        let mut start = 0;
        while start < bytes.len() {
            let end = (start + rng.gen_range(1..=max_len)).min(bytes.len());
            out.push(bytes[start..end].to_vec());
            start = end;
        }
        out
    }

    #[test]
    fn full_session() {
        let mut parser = unit_parser();
        let events = feed_units(&mut parser, &SCENARIO);

        assert_eq!(
            events,
            vec![
                ParsedEvent::SessionStarted,
                ParsedEvent::SampleReceived(Sample::new(10, 20)),
                ParsedEvent::SampleReceived(Sample::new(15, 25)),
                ParsedEvent::SessionStopped { count: 2 },
                ParsedEvent::DateReceived(DateTag::new(6, 15).unwrap()),
                ParsedEvent::SessionCompleted { final_count: 2 },
            ]
        );
        assert_eq!(parser.samples(), &[Sample::new(10, 20), Sample::new(15, 25)]);
        assert_eq!(parser.date_tag(), DateTag::new(6, 15));
        assert_eq!(parser.state(), SessionState::Completed);
    }

    #[test]
    fn fragmented_delivery_matches_unit_delivery() {
        let mut rng = StdRng::seed_from_u64(0x0CA1);
        let device = DummyDevice::builder().num_points(40).seed(7).build();
        let units = device.units();
        let unit_refs: Vec<&str> = units.iter().map(String::as_str).collect();

        let mut reference = unit_parser();
        let expected = feed_units(&mut reference, &unit_refs);

        for max_len in [1, 2, 3, 7, 16, 64] {
            let mut parser = line_parser();
            let mut events = Vec::new();
            for piece in fragment(&device.stream_text(), max_len, &mut rng) {
                events.extend(parser.ingest_bytes(&piece).unwrap());
            }
            events.extend(parser.flush().unwrap());

            assert_eq!(events, expected, "fragments of up to {} bytes", max_len);
            assert_eq!(parser.samples(), reference.samples());
            assert_eq!(parser.date_tag(), reference.date_tag());
        }
    }

    #[test]
    fn start_resets_from_every_state() {
        let prefixes: [&[&str]; 4] = [
            &[],
            &["START", "1:1,1"],
            &["START", "1:1,1", "STOP"],
            &["START", "1:1,1", "STOP", "DATE:1,2", "END"],
        ];

        for prefix in prefixes {
            let mut parser = unit_parser();
            feed_units(&mut parser, prefix);
            let events = parser.ingest("START-again").unwrap();

            assert_eq!(events, vec![ParsedEvent::SessionStarted]);
            assert!(parser.samples().is_empty());
            assert_eq!(parser.date_tag(), None);
            assert_eq!(parser.state(), SessionState::Collecting);
        }
    }

    #[test]
    fn preserves_sample_order() {
        let mut parser = unit_parser();
        parser.ingest("START").unwrap();
        let expected: Vec<Sample> = (0..100).map(|i| Sample::new(100 - i, i * 3 - 50)).collect();
        for (i, s) in expected.iter().enumerate() {
            parser.ingest(&format!("{:04}:[{},{}],", i, s.x, s.y)).unwrap();
        }
        assert_eq!(parser.samples(), expected.as_slice());
    }

    #[test]
    fn consecutive_duplicates_are_dropped() {
        let mut parser = unit_parser();
        parser.ingest("START").unwrap();
        assert_eq!(
            parser.ingest("5:1,2").unwrap(),
            vec![ParsedEvent::SampleReceived(Sample::new(1, 2))]
        );
        assert!(parser.ingest("5:1,2").unwrap().is_empty());
        assert_eq!(parser.samples().len(), 1);

        // Only *consecutive* repeats are dropped
        parser.ingest("6:3,4").unwrap();
        parser.ingest("5:1,2").unwrap();
        assert_eq!(parser.samples().len(), 3);
    }

    #[test]
    fn duplicates_kept_without_dedup() {
        let mut parser = StreamSessionParser::new(ParserConfig {
            framing: Framing::Unit,
            dedup: false,
            ..ParserConfig::default()
        });
        feed_units(&mut parser, &["START", "1:1,1", "1:1,1"]);
        assert_eq!(parser.samples().len(), 2);
    }

    #[test]
    fn date_out_of_range_is_diagnostic() {
        let mut parser = unit_parser();
        feed_units(&mut parser, &["START", "STOP"]);
        assert_eq!(
            parser.ingest("DATE-1:7,4").unwrap(),
            vec![ParsedEvent::DateReceived(DateTag::new(7, 4).unwrap())]
        );

        let mut parser = unit_parser();
        feed_units(&mut parser, &["START", "STOP"]);
        let events = parser.ingest("DATE-1:13,4").unwrap();
        assert_eq!(
            events,
            vec![ParsedEvent::MalformedDate {
                raw: "DATE-1:13,4".to_owned()
            }]
        );
        assert!(events[0].is_diagnostic());
        assert_eq!(parser.date_tag(), None);
        assert_eq!(parser.state(), SessionState::AwaitingDate);
    }

    #[test]
    fn date_policies() {
        let units = ["START", "STOP", "DATE-1:3,1", "DATE-2:4,2"];

        let mut last = unit_parser();
        feed_units(&mut last, &units);
        assert_eq!(last.date_tag(), DateTag::new(4, 2));

        let mut first = StreamSessionParser::new(ParserConfig {
            framing: Framing::Unit,
            date_policy: DatePolicy::FirstWins,
            ..ParserConfig::default()
        });
        feed_units(&mut first, &units);
        assert_eq!(first.date_tag(), DateTag::new(3, 1));
    }

    #[test]
    fn malformed_sample_leaves_state_alone() {
        let mut parser = unit_parser();
        feed_units(&mut parser, &["START", "1:10,20"]);
        let events = parser.ingest("3:abc,20").unwrap();

        assert_eq!(
            events,
            vec![ParsedEvent::MalformedSample {
                raw: "3:abc,20".to_owned()
            }]
        );
        assert_eq!(parser.samples(), &[Sample::new(10, 20)]);
        assert_eq!(parser.state(), SessionState::Collecting);
    }

    #[test]
    fn coordinates_outside_collecting_are_ignored() {
        let mut parser = unit_parser();
        assert!(parser.ingest("1:10,20").unwrap().is_empty());
        assert!(parser.ingest("2:abc,20").unwrap().is_empty());
        feed_units(&mut parser, &["START", "3:1,1", "STOP"]);
        assert!(parser.ingest("4:2,2").unwrap().is_empty());
        assert_eq!(parser.samples(), &[Sample::new(1, 1)]);
    }

    #[test]
    fn unrecognized_units_are_reported() {
        let mut parser = unit_parser();
        assert_eq!(
            parser.ingest("battery 3.7V").unwrap(),
            vec![ParsedEvent::UnrecognizedUnit {
                raw: "battery 3.7V".to_owned()
            }]
        );
        assert_eq!(parser.state(), SessionState::Idle);
    }

    #[test]
    fn settled_default_parser_reassembles_a_split_start() {
        let mut parser = StreamSessionParser::default();
        parser.settle_framing(Framing::Line);

        let mut events = Vec::new();
        for chunk in ["STA", "RT-1\n1:10,20\n", "2:15,25\nSTOP-1\n"] {
            events.extend(parser.ingest(chunk).unwrap());
        }

        assert_eq!(
            events,
            vec![
                ParsedEvent::SessionStarted,
                ParsedEvent::SampleReceived(Sample::new(10, 20)),
                ParsedEvent::SampleReceived(Sample::new(15, 25)),
                ParsedEvent::SessionStopped { count: 2 },
            ]
        );
        assert_eq!(parser.samples(), &[Sample::new(10, 20), Sample::new(15, 25)]);
    }

    #[test]
    fn one_chunk_many_units() {
        let mut parser = line_parser();
        let events = parser.ingest(&(SCENARIO.join("\n") + "\n")).unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(parser.state(), SessionState::Completed);
    }

    #[test]
    fn flush_processes_unterminated_tail() {
        let mut parser = line_parser();
        parser.ingest("START\n1:1,1\nEND").unwrap();
        assert_eq!(parser.state(), SessionState::Collecting);
        assert_eq!(
            parser.flush().unwrap(),
            vec![ParsedEvent::SessionCompleted { final_count: 1 }]
        );
    }

    #[test]
    fn ingest_after_teardown_fails() {
        let mut parser = StreamSessionParser::default();
        parser.ingest("START").unwrap();
        parser.teardown();
        assert!(parser.is_torn_down());
        assert_eq!(parser.ingest("1:1,1"), Err(ParserError::TornDown));
        assert_eq!(parser.flush(), Err(ParserError::TornDown));
    }
}
