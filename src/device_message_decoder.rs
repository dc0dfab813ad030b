//! Decodes a single protocol unit sent by the device into a
//! [`DeviceMessage`].
//!
//! The device speaks a small textual protocol. Control units carry one of
//! the markers `START`, `STOP`, `DATE` or `END`, optionally followed by a
//! disambiguating suffix (`START-1`, `STOP-1`...). Coordinates look like
//! `<label>:<x>,<y>`, and the firmware actually sends them as
//! `0003:[10,20],`, so the brackets and trailing comma are optional. Dates
//! look like `DATE-1:6,15` (month, then day).
//!
//! Control markers are checked before the coordinate pattern, in the order
//! listed above, because a date unit also has a colon-delimited shape.

use crate::sample::{DateTag, Sample};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_till1, take_until},
    character::complete::{char, i32, one_of, space0},
    combinator::{eof, map, opt},
    sequence::{delimited, preceded, separated_pair, terminated, tuple},
    Finish, IResult,
};

const START_MARKER: &str = "START";
const STOP_MARKER: &str = "STOP";
const DATE_MARKER: &str = "DATE";
const END_MARKER: &str = "END";

/// Characters that may separate the `DATE` marker (and its suffix) from the
/// `<month>,<day>` payload.
const DATE_DELIMITERS: &str = ":= ";

/// What a single unit from the device means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMessage {
    /// Begin a new session
    Start,
    /// End coordinate collection
    Stop,
    /// A valid, in-range date tag
    Date(DateTag),
    /// A `DATE` unit whose payload did not parse or was out of range
    MalformedDate,
    /// The session is fully done
    End,
    /// A coordinate sample
    Coordinate(Sample),
    /// Something shaped like `<label>:...` whose numbers did not parse
    MalformedCoordinate,
    /// Anything else
    Unrecognized,
}

impl DeviceMessage {
    /// Classify a complete, already-trimmed unit.
    pub fn decode(unit: &str) -> Self {
        if unit.contains(START_MARKER) {
            Self::Start
        } else if unit.contains(STOP_MARKER) {
            Self::Stop
        } else if unit.contains(DATE_MARKER) {
            match parse_date(unit).finish() {
                Ok((_remaining, (month, day))) => DateTag::new(month.into(), day.into())
                    .map(Self::Date)
                    .unwrap_or(Self::MalformedDate),
                Err(_) => Self::MalformedDate,
            }
        } else if unit.contains(END_MARKER) {
            Self::End
        } else if let Ok((_remaining, sample)) = parse_coordinate(unit).finish() {
            Self::Coordinate(sample)
        } else if looks_like_coordinate(unit) {
            Self::MalformedCoordinate
        } else {
            Self::Unrecognized
        }
    }

    /// Whether this message is a coordinate, well-formed or not.
    pub fn is_coordinate(&self) -> bool {
        matches!(self, Self::Coordinate(_) | Self::MalformedCoordinate)
    }
}

fn padded_i32(s: &str) -> IResult<&str, i32> {
    delimited(space0, i32, space0)(s)
}

fn number_pair(s: &str) -> IResult<&str, (i32, i32)> {
    separated_pair(padded_i32, char(','), padded_i32)(s)
}

fn unit_tail(s: &str) -> IResult<&str, ()> {
    map(tuple((opt(char(',')), space0, eof)), |_| ())(s)
}

fn parse_coordinate(s: &str) -> IResult<&str, Sample> {
    map(
        tuple((
            take_till1(|c| c == ':'),
            char(':'),
            space0,
            alt((delimited(char('['), number_pair, char(']')), number_pair)),
            unit_tail,
        )),
        |(_label, _, _, (x, y), _)| Sample::new(x, y),
    )(s)
}

fn parse_date(s: &str) -> IResult<&str, (i32, i32)> {
    preceded(
        tuple((
            take_until(DATE_MARKER),
            tag(DATE_MARKER),
            take_till(|c| DATE_DELIMITERS.contains(c)),
            one_of(DATE_DELIMITERS),
            space0,
        )),
        terminated(number_pair, unit_tail),
    )(s)
}

fn looks_like_coordinate(s: &str) -> bool {
    matches!(s.split_once(':'), Some((label, _)) if !label.is_empty())
}
