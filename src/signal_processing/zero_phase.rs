//! Forward-backward (zero-phase) filtering over a complete window.
//!
//! The window is padded at both ends with its point reflection about the end
//! samples (odd extension), filtered forward, then filtered again in reverse.
//! Each pass starts in the steady state of its first input value, so a
//! constant window comes back unchanged. The padding is trimmed before
//! returning, leaving an output the same length as the input with no lag.

use super::butterworth_lowpass::ButterworthLowpass;
use crate::error::{PpgError, Result};

pub struct ZeroPhaseFilter {
    lowpass: ButterworthLowpass,
    padlen: usize,
}

impl ZeroPhaseFilter {
    /// Wrap `lowpass`, padding each edge by three times the coefficient count
    pub fn new(lowpass: ButterworthLowpass) -> Self {
        let padlen = 3 * (lowpass.order() + 1);
        Self { lowpass, padlen }
    }

    pub fn padlen(&self) -> usize {
        self.padlen
    }

    /// Shortest window that can be padded
    pub fn min_len(&self) -> usize {
        self.padlen + 1
    }

    pub fn filtfilt(&self, input: &[f64]) -> Result<Vec<f64>> {
        let n = input.len();
        if n <= self.padlen {
            return Err(PpgError::InsufficientData {
                needed: self.min_len(),
                available: n,
            });
        }

        let extended = odd_extend(input, self.padlen);

        let mut forward = self.steady_state_pass(&extended)?;
        forward.reverse();
        let mut backward = self.steady_state_pass(&forward)?;
        backward.reverse();

        let output = backward[self.padlen..self.padlen + n].to_vec();

        if let Some(i) = output.iter().position(|v| !v.is_finite()) {
            return Err(PpgError::NonFinite(i));
        }
        Ok(output)
    }

    // Starting from the steady state for x[0] is equivalent to filtering
    // x - x[0] from rest and adding x[0] back, since the DC gain is one.
    fn steady_state_pass(&self, x: &[f64]) -> Result<Vec<f64>> {
        let Some(&offset) = x.first() else {
            return Ok(Vec::new());
        };
        let centered: Vec<f64> = x.iter().map(|v| v - offset).collect();
        let mut y = self.lowpass.run(&centered)?;
        for v in y.iter_mut() {
            *v += offset;
        }
        Ok(y)
    }
}

/// Pad `x` by `padlen` samples at each end with its odd reflection
///
/// Requires `x.len() > padlen`.
fn odd_extend(x: &[f64], padlen: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];

    let mut out = Vec::with_capacity(n + 2 * padlen);
    out.extend((1..=padlen).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((n - 1 - padlen..n - 1).rev().map(|i| 2.0 * last - x[i]));
    out
}
