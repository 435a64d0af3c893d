use std::f64::consts::PI;
use std::io;
use std::time::Instant;

use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::acquisition::{LineSource, PPG_MARKER};
use crate::error::{PpgError, Result};

/// Synthetic PPG device parameters
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Output rate in samples per second
    pub sample_rate_hz: f64,
    /// Simulated heart rate
    pub heart_rate_bpm: f64,
    pub red_baseline: f64,
    pub red_amplitude: f64,
    pub infrared_baseline: f64,
    pub infrared_amplitude: f64,
    /// Standard deviation of additive Gaussian noise, in counts
    pub noise_std: f64,
    /// Probability that a line is emitted truncated
    pub malformed_fraction: f64,
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 50.0,
            heart_rate_bpm: 72.0,
            red_baseline: 90_000.0,
            red_amplitude: 1_200.0,
            infrared_baseline: 110_000.0,
            infrared_amplitude: 2_000.0,
            noise_std: 60.0,
            malformed_fraction: 0.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Relative blood volume over one cardiac cycle, `phase` in [0, 1)
///
/// Systolic peak followed by a smaller dicrotic wave.
pub fn pulse_shape(phase: f64) -> f64 {
    let systolic = (-((phase - 0.2) / 0.08).powi(2)).exp();
    let dicrotic = 0.4 * (-((phase - 0.45) / 0.1).powi(2)).exp();
    systolic + dicrotic
}

/// [`LineSource`] producing `PPG_RAW` lines from a synthetic waveform
///
/// Paced sources release lines at the configured sample rate against the
/// wall clock; unpaced sources always have a line ready.
pub struct SimulatedSource {
    config: SimulationConfig,
    rng: ChaCha8Rng,
    noise: Normal<f64>,
    sequence: i64,
    started: Instant,
    paced: bool,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Self::build(config, true)
    }

    pub fn unpaced(config: SimulationConfig) -> Result<Self> {
        Self::build(config, false)
    }

    fn build(config: SimulationConfig, paced: bool) -> Result<Self> {
        if config.sample_rate_hz <= 0.0 {
            return Err(PpgError::Config("simulated sample rate must be positive".into()));
        }
        if !(0.0..=1.0).contains(&config.malformed_fraction) {
            return Err(PpgError::Config("malformed fraction must lie in [0, 1]".into()));
        }
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| PpgError::Config(format!("noise: {}", e)))?;
        let rng = match config.seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => rand::make_rng(),
        };

        Ok(Self {
            config,
            rng,
            noise,
            sequence: 0,
            started: Instant::now(),
            paced,
        })
    }

    /// Generate the next line regardless of pacing
    pub fn next_line(&mut self) -> String {
        let t = self.sequence as f64 / self.config.sample_rate_hz;
        let phase = (t * self.config.heart_rate_bpm / 60.0).fract();
        // Slow respiratory baseline wander
        let wander = (2.0 * PI * 0.25 * t).sin();

        let pulse = pulse_shape(phase);
        // Absorption rises with blood volume, so intensity dips at systole
        let red = self.config.red_baseline - self.config.red_amplitude * pulse
            + 0.3 * self.config.red_amplitude * wander
            + self.noise.sample(&mut self.rng);
        let infrared = self.config.infrared_baseline - self.config.infrared_amplitude * pulse
            + 0.3 * self.config.infrared_amplitude * wander
            + self.noise.sample(&mut self.rng);

        let sequence = self.sequence;
        self.sequence += 1;

        if self.config.malformed_fraction > 0.0
            && self.rng.random::<f64>() < self.config.malformed_fraction
        {
            return format!("{},{},{}", PPG_MARKER, sequence, red.round() as i64);
        }

        format!(
            "{},{},{},{}",
            PPG_MARKER,
            sequence,
            red.round() as i64,
            infrared.round() as i64
        )
    }
}

impl LineSource for SimulatedSource {
    fn has_input(&mut self) -> io::Result<bool> {
        if !self.paced {
            return Ok(true);
        }
        let due = self.started.elapsed().as_secs_f64() * self.config.sample_rate_hz;
        Ok(due >= self.sequence as f64)
    }

    fn read_line(&mut self) -> io::Result<String> {
        Ok(self.next_line())
    }

    fn describe(&self) -> String {
        format!(
            "simulated ({:.0} Hz, {:.0} bpm)",
            self.config.sample_rate_hz, self.config.heart_rate_bpm
        )
    }
}
