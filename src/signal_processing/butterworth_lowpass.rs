use crate::config::FilterConfig;
use crate::error::{PpgError, Result};
use iir_filters::filter::{DirectForm2Transposed, Filter};
use iir_filters::filter_design::{FilterType, butter};
use iir_filters::sos::zpk2sos;

/// Butterworth IIR low-pass filter for PPG smoothing
///
/// Passes the cardiac band (below a few Hz) and attenuates motion and
/// electrical noise above `cutoff_hz`. Realized as cascaded second-order
/// sections in direct form II transposed.
///
/// The filter itself is stateless between passes: every call to
/// [`run`](Self::run) starts a fresh section cascade at rest.
#[derive(Debug, Clone)]
pub struct ButterworthLowpass {
    cutoff_hz: f64,
    sample_rate: f64,
    order: usize,
}

impl ButterworthLowpass {
    /// Create a new Butterworth low-pass filter
    ///
    /// # Arguments
    /// * `cutoff_hz` - Cutoff frequency in Hz
    /// * `sample_rate` - Sample rate of the input in Hz
    /// * `order` - Filter order (5 for the default PPG display)
    ///
    /// # Errors
    /// Returns `PpgError::FilterDesign` if the parameters do not yield a
    /// realizable filter
    pub fn new(cutoff_hz: f64, sample_rate: f64, order: usize) -> Result<Self> {
        if order == 0 {
            return Err(PpgError::FilterDesign("order must be at least 1".into()));
        }
        if !(cutoff_hz > 0.0 && cutoff_hz < sample_rate / 2.0) {
            return Err(PpgError::FilterDesign(format!(
                "cutoff {} Hz outside (0, {}) Hz",
                cutoff_hz,
                sample_rate / 2.0
            )));
        }

        let filter = Self {
            cutoff_hz,
            sample_rate,
            order,
        };
        // Surface design errors now rather than on the first pass
        filter.sections()?;
        Ok(filter)
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::new(config.cutoff_hz, config.sample_rate_hz, config.order)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    /// One causal pass over `input`, starting from rest
    pub fn run(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut sections = self.sections()?;
        Ok(input.iter().map(|&x| sections.filter(x)).collect())
    }

    fn sections(&self) -> Result<DirectForm2Transposed> {
        let zpk = butter(
            self.order as u32,
            FilterType::LowPass(self.cutoff_hz),
            self.sample_rate,
        )
        .map_err(|e| PpgError::FilterDesign(format!("{:?}", e)))?;

        let sos = zpk2sos(&zpk, None).map_err(|e| PpgError::FilterDesign(format!("{:?}", e)))?;

        Ok(DirectForm2Transposed::new(&sos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn rms(x: &[f64]) -> f64 {
        (x.iter().map(|v| v * v).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_butterworth_lowpass_design() {
        assert!(ButterworthLowpass::new(5.0, 50.0, 5).is_ok());
        assert!(ButterworthLowpass::from_config(&FilterConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_invalid_cutoff() {
        assert!(ButterworthLowpass::new(30.0, 50.0, 5).is_err());
        assert!(ButterworthLowpass::new(0.0, 50.0, 5).is_err());
        assert!(ButterworthLowpass::new(5.0, 50.0, 0).is_err());
    }

    #[test]
    fn test_step_settles_to_unity() {
        let filter = ButterworthLowpass::new(5.0, 50.0, 5).unwrap();
        let out = filter.run(&[1.0; 200]).unwrap();
        assert!((out[199] - 1.0).abs() < 1e-6, "DC gain {}", out[199]);
    }

    #[test]
    fn test_passes_heart_rate_attenuates_noise() {
        let filter = ButterworthLowpass::new(5.0, 50.0, 5).unwrap();
        let n = 1000;

        // 1.2 Hz (72 bpm) sits well inside the passband
        let pulse: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 1.2 * i as f64 / 50.0).sin())
            .collect();
        // 15 Hz mains/motion harmonics, 3x the cutoff
        let noise: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * 15.0 * i as f64 / 50.0).sin())
            .collect();

        let pulse_out = filter.run(&pulse).unwrap();
        let noise_out = filter.run(&noise).unwrap();

        let pulse_gain = rms(&pulse_out[200..]) / rms(&pulse[200..]);
        let noise_gain = rms(&noise_out[200..]) / rms(&noise[200..]);

        assert!(pulse_gain > 0.95, "pulse gain {}", pulse_gain);
        assert!(noise_gain < 0.01, "noise gain {}", noise_gain);
    }

    #[test]
    fn test_each_run_starts_from_rest() {
        let filter = ButterworthLowpass::new(5.0, 50.0, 5).unwrap();
        let first = filter.run(&[3.0; 40]).unwrap();
        let second = filter.run(&[3.0; 40]).unwrap();
        assert_eq!(first, second);
    }
}
