//! Periodic redraw of the four PPG traces.
//!
//! [`RenderTick::tick`] is toolkit independent: it snapshots the shared
//! buffer, smooths both channels and stores the results in a
//! [`DisplayState`]. The egui window, the terminal printer and the tests all
//! drive the same tick and read the same state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::acquisition::SharedSampleBuffer;
use crate::config::PpgConfig;
use crate::diagnostics::{Channel, DiagnosticSink};
use crate::error::Result;
use crate::session::ConnectionState;
use crate::signal_processing::{FilterOutcome, FilterStage};

/// One plotted series plus its axis limits
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trace {
    /// `[x, y]` pairs with x the position in the window
    pub points: Vec<[f64; 2]>,
    /// Horizontal limits, `(0, window length)`
    pub x_range: Option<(f64, f64)>,
    /// Vertical limits; kept from the last non-flat update
    pub y_range: Option<(f64, f64)>,
}

impl Trace {
    /// Replace the data, showing at most `x_len` points
    fn update(&mut self, values: &[f64], x_len: usize, margin: f64) {
        let shown = &values[..values.len().min(x_len)];
        self.points = shown
            .iter()
            .enumerate()
            .map(|(i, &v)| [i as f64, v])
            .collect();

        if shown.is_empty() {
            return;
        }
        self.x_range = Some((0.0, x_len as f64));
        if let Some(range) = axis_range(shown, margin) {
            self.y_range = Some(range);
        }
    }

    pub fn latest(&self) -> Option<f64> {
        self.points.last().map(|p| p[1])
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Everything the display shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    pub raw_red: Trace,
    pub raw_infrared: Trace,
    pub filtered_red: Trace,
    pub filtered_infrared: Trace,
    /// Number of ticks that updated the display
    pub frame: u64,
    /// Samples in the last snapshot
    pub samples: usize,
    /// Device sequence number of the newest sample
    pub last_sequence: Option<i64>,
    /// Whether each channel was actually filtered on the last update
    pub red_filtered: bool,
    pub infrared_filtered: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Disconnected; display left as it was
    Skipped,
    /// Display refreshed from a snapshot of this many samples
    Updated { samples: usize },
}

/// `[min - margin * range, max + margin * range]`, or `None` when flat or empty
pub fn axis_range(values: &[f64], margin: f64) -> Option<(f64, f64)> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range.is_finite() && range > 0.0 {
        Some((min - range * margin, max + range * margin))
    } else {
        None
    }
}

pub struct RenderTick {
    filter: FilterStage,
    margin: f64,
    display: DisplayState,
}

impl RenderTick {
    pub fn new(config: &PpgConfig, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        Ok(Self {
            filter: FilterStage::new(&config.filter, sink)?,
            margin: config.display.margin_fraction,
            display: DisplayState::default(),
        })
    }

    /// Refresh the display from the buffer, if connected
    ///
    /// The buffer lock is held only while copying the snapshot.
    pub fn tick(&mut self, state: &ConnectionState, buffer: &SharedSampleBuffer) -> TickOutcome {
        if !state.is_connected() {
            return TickOutcome::Skipped;
        }

        let snapshot = buffer.snapshot();
        let x_len = snapshot.len();

        let red = snapshot.red_f64();
        let infrared = snapshot.infrared_f64();
        let red_out = self.filter.apply(Channel::Red, &red);
        let infrared_out = self.filter.apply(Channel::Infrared, &infrared);

        let d = &mut self.display;
        d.raw_red.update(&red, x_len, self.margin);
        d.raw_infrared.update(&infrared, x_len, self.margin);
        d.filtered_red.update(red_out.values(), x_len, self.margin);
        d.filtered_infrared
            .update(infrared_out.values(), x_len, self.margin);

        d.red_filtered = matches!(red_out, FilterOutcome::Filtered(_));
        d.infrared_filtered = matches!(infrared_out, FilterOutcome::Filtered(_));
        d.samples = x_len;
        d.last_sequence = snapshot.last().map(|s| s.sequence);
        d.frame += 1;

        TickOutcome::Updated { samples: x_len }
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }
}

/// Fixed-interval tick scheduler for host event loops
///
/// Missed deadlines are not replayed: after a stall the next tick is one
/// interval after the late one.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next_due: Instant,
}

impl Ticker {
    /// First tick is due immediately
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now,
        }
    }

    /// Returns `true` and schedules the next tick if one is due at `now`
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }

    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_due.saturating_duration_since(now)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
