//! The two value types that flow out of a drawing session: the coordinate
//! [`Sample`]s reported by the pen, and the [`DateTag`] the device attaches
//! once the pen is lifted.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// One raw coordinate reading from the device. Values are stored exactly as
/// they arrive on the wire; no scaling or clamping happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Sample {
    /// Horizontal reading
    pub x: i32,
    /// Vertical reading
    pub y: i32,
}

impl Sample {
    /// Make a new [`Sample`].
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

/// The calendar day the device had selected when it sent a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct DateTag {
    month: u8,
    day: u8,
}

impl DateTag {
    /// Build a [`DateTag`], returning `None` unless `month` is in `1..=12`
    /// and `day` is in `1..=31`.
    pub fn new(month: i64, day: i64) -> Option<Self> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(Self {
            month: month as u8,
            day: day as u8,
        })
    }

    /// Month of the year, `1..=12`
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Day of the month, `1..=31`
    pub fn day(&self) -> u8 {
        self.day
    }
}

impl Default for DateTag {
    /// January 1st
    fn default() -> Self {
        Self { month: 1, day: 1 }
    }
}

impl Display for DateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_tag_bounds() {
        assert!(DateTag::new(1, 1).is_some());
        assert!(DateTag::new(12, 31).is_some());
        assert!(DateTag::new(0, 5).is_none());
        assert!(DateTag::new(13, 4).is_none());
        assert!(DateTag::new(6, 0).is_none());
        assert!(DateTag::new(6, 32).is_none());
        assert!(DateTag::new(-7, 4).is_none());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Sample::new(-3, 14).to_string(), "[-3,14]");
        assert_eq!(DateTag::new(7, 4).unwrap().to_string(), "07-04");
    }
}
