use std::sync::Arc;

use super::butterworth_lowpass::ButterworthLowpass;
use super::zero_phase::ZeroPhaseFilter;
use crate::config::FilterConfig;
use crate::diagnostics::{Channel, Diagnostic, DiagnosticSink};
use crate::error::Result;

/// Result of smoothing one channel for one render tick
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    /// Zero-phase filtered window
    Filtered(Vec<f64>),
    /// Window too short to filter; returned unchanged
    PassThrough(Vec<f64>),
    /// Filtering failed; the raw window is substituted
    Fallback(Vec<f64>),
}

impl FilterOutcome {
    pub fn values(&self) -> &[f64] {
        match self {
            FilterOutcome::Filtered(v) | FilterOutcome::PassThrough(v) | FilterOutcome::Fallback(v) => v,
        }
    }

    pub fn into_values(self) -> Vec<f64> {
        match self {
            FilterOutcome::Filtered(v) | FilterOutcome::PassThrough(v) | FilterOutcome::Fallback(v) => v,
        }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, FilterOutcome::Filtered(_))
    }
}

/// Display smoothing: zero-phase Butterworth low-pass with raw-data fallback
///
/// Recomputed from scratch for every window; no state is carried between
/// calls.
pub struct FilterStage {
    filter: ZeroPhaseFilter,
    min_window: usize,
    sink: Arc<dyn DiagnosticSink>,
}

impl FilterStage {
    pub fn new(config: &FilterConfig, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        let lowpass = ButterworthLowpass::from_config(config)?;
        Ok(Self {
            filter: ZeroPhaseFilter::new(lowpass),
            min_window: config.min_window,
            sink,
        })
    }

    /// Smooth `window`, never failing
    ///
    /// Windows of `min_window` samples or fewer pass through untouched. Any
    /// filter error is reported to the diagnostic sink and the raw window is
    /// returned in its place.
    pub fn apply(&self, channel: Channel, window: &[f64]) -> FilterOutcome {
        if window.len() <= self.min_window {
            return FilterOutcome::PassThrough(window.to_vec());
        }

        match self.filter.filtfilt(window) {
            Ok(filtered) => FilterOutcome::Filtered(filtered),
            Err(e) => {
                self.sink.report(Diagnostic::Filter {
                    channel,
                    message: e.to_string(),
                });
                FilterOutcome::Fallback(window.to_vec())
            }
        }
    }

    /// Plain filter contract: same length out as in
    pub fn filter(&self, channel: Channel, window: &[f64]) -> Vec<f64> {
        self.apply(channel, window).into_values()
    }

    pub fn min_window(&self) -> usize {
        self.min_window
    }
}
