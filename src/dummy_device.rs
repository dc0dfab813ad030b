//! A stand-in for the real pen device, for exercising the host side without
//! hardware. It draws a wobbly loop in the same raw ADC range as the
//! firmware's touch panel and speaks the same protocol.

use crate::chunk_source::ReplaySource;
use crate::sample::{DateTag, Sample};

use rand::prelude::*;
use std::f64::consts::PI;

// Centre and reach of the touch panel's raw readings
const PANEL_CENTER_X: f64 = 1820.0;
const PANEL_CENTER_Y: f64 = 1757.0;
const PANEL_REACH: f64 = 300.0;

/// A simulated device holding one pre-recorded session.
#[derive(Debug, Clone)]
pub struct DummyDevice {
    session_id: u32,
    samples: Vec<Sample>,
    date: DateTag,
}

/// Configures a [`DummyDevice`]. Get one from [`DummyDevice::builder`].
#[derive(Debug, Clone)]
pub struct DummyDeviceBuilder {
    num_points: usize,
    noise: f64,
    seed: u64,
    session_id: u32,
    month: i64,
    day: i64,
}

impl DummyDevice {
    /// Start configuring a [`DummyDevice`].
    pub fn builder() -> DummyDeviceBuilder {
        DummyDeviceBuilder::default()
    }

    /// The samples this device will send, in order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The date this device will attach to its session.
    pub fn date(&self) -> DateTag {
        self.date
    }

    /// Every unit of the session, in the order the firmware sends them.
    pub fn units(&self) -> Vec<String> {
        let id = self.session_id;
        let mut units = Vec::with_capacity(self.samples.len() + 4);

        units.push(format!("START-{id}"));
        units.extend(
            self.samples
                .iter()
                .enumerate()
                .map(|(i, s)| format!("{:04}:[{},{}],", i, s.x, s.y)),
        );
        units.push(format!("STOP-{id}"));
        units.push(format!(
            "DATE-{id}:{},{}",
            self.date.month(),
            self.date.day()
        ));
        units.push(format!("END-{id}"));

        units
    }

    /// The whole session as one newline-terminated stream.
    pub fn stream_text(&self) -> String {
        self.units().into_iter().map(|u| u + "\n").collect()
    }

    /// Turn the session into a [`ReplaySource`] handing out `chunk_size`
    /// bytes at a time, or one unit at a time when `chunk_size` is zero.
    pub fn into_source(self, chunk_size: usize) -> ReplaySource {
        ReplaySource::new("dummy device", self.stream_text().into_bytes(), chunk_size)
    }
}

impl Default for DummyDeviceBuilder {
    fn default() -> Self {
        Self {
            num_points: 64,
            noise: 4.0,
            seed: 0,
            session_id: 1,
            month: 1,
            day: 1,
        }
    }
}

impl DummyDeviceBuilder {
    /// How many samples the session contains
    pub fn num_points(mut self, num_points: usize) -> Self {
        self.num_points = num_points;
        self
    }

    /// Maximum jitter added to each reading, in raw units
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Seed for the jitter, so runs are repeatable
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Suffix used on the control units
    pub fn session_id(mut self, session_id: u32) -> Self {
        self.session_id = session_id;
        self
    }

    /// The date the device reports. Out-of-range values fall back to
    /// January 1st.
    pub fn date(mut self, month: i64, day: i64) -> Self {
        self.month = month;
        self.day = day;
        self
    }

    /// Generate the session.
    pub fn build(self) -> DummyDevice {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let date = DateTag::new(self.month, self.day).unwrap_or_default();

        DummyDevice {
            session_id: self.session_id,
            samples: generate_loop(self.num_points, self.noise, &mut rng),
            date,
        }
    }
}

/// A lemniscate traced once, roughly what a hand-drawn "8" looks like.
fn generate_loop(num_points: usize, noise: f64, rng: &mut StdRng) -> Vec<Sample> {
    (0..num_points)
        .map(|i| (i as f64 / num_points.max(1) as f64) * 2.0 * PI)
        .map(|t| {
            let jitter_x = if noise > 0.0 { rng.gen_range(-noise..=noise) } else { 0.0 };
            let jitter_y = if noise > 0.0 { rng.gen_range(-noise..=noise) } else { 0.0 };
            let x = PANEL_CENTER_X + PANEL_REACH * t.sin() / 2.0 + jitter_x;
            let y = PANEL_CENTER_Y + PANEL_REACH * (t / 2.0).sin() - PANEL_REACH / 2.0 + jitter_y;
            Sample::new(x.round() as i32, y.round() as i32)
        })
        .collect()
}
