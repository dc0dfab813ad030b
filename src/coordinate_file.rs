//! Reads and writes coordinate capture files.
//!
//! A capture is plain text holding one bracketed pair per sample:
//!
//! ```text
//! [10,10],
//! [20,20],
//! [30,10]
//! ```
//!
//! Reading is forgiving: anything between the pairs is skipped, so a pasted
//! debug log works as well as a clean file.

use crate::sample::Sample;

use nom::{
    character::complete::{char, i32, space0},
    combinator::map,
    sequence::{delimited, separated_pair},
    IResult,
};
use std::{fmt::Write as _, fs, io, path::Path};

fn padded_i32(s: &str) -> IResult<&str, i32> {
    delimited(space0, i32, space0)(s)
}

fn parse_bracketed_pair(s: &str) -> IResult<&str, Sample> {
    map(
        delimited(
            char('['),
            separated_pair(padded_i32, char(','), padded_i32),
            char(']'),
        ),
        |(x, y)| Sample::new(x, y),
    )(s)
}

/// Every `[x,y]` pair in `text`, in the order they appear.
pub fn parse_coordinates(text: &str) -> Vec<Sample> {
    let mut samples = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        rest = &rest[open..];
        match parse_bracketed_pair(rest) {
            Ok((remaining, sample)) => {
                samples.push(sample);
                rest = remaining;
            }
            // Not a pair, skip past this bracket and keep looking
            Err(_) => rest = &rest[1..],
        }
    }

    samples
}

/// Render `samples` as a capture, one `[x,y],` per line.
pub fn format_coordinates(samples: &[Sample]) -> String {
    let mut out = String::with_capacity(samples.len() * 12);
    for sample in samples {
        let _ = writeln!(out, "{},", sample);
    }
    out
}

/// Read a capture file from disk.
pub fn read_coordinates(path: impl AsRef<Path>) -> io::Result<Vec<Sample>> {
    Ok(parse_coordinates(&fs::read_to_string(path)?))
}

/// Write `samples` to a capture file.
pub fn write_coordinates(path: impl AsRef<Path>, samples: &[Sample]) -> io::Result<()> {
    fs::write(path, format_coordinates(samples))
}
