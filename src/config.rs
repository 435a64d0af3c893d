//! Configuration for the PPG acquisition and display pipeline.
//!
//! Every section has defaults matching the reference device firmware
//! (115200 baud, ~50 Hz sample rate) so `PpgConfig::default()` is usable as-is.
//! A TOML file may override any subset of fields:
//!
//! ```toml
//! [serial]
//! baud_rate = 115200
//!
//! [filter]
//! cutoff_hz = 4.0
//!
//! [display]
//! refresh = "40ms"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{PpgError, Result};

/// Render tick interval
///
/// Can be specified as a period or as a refresh rate.
///
/// # Parsing formats
/// - `50` or `50ms` - period in milliseconds
/// - `0.05s` - period in seconds
/// - `20hz` or `20Hz` - refresh rate
///
/// # Example
/// ```
/// use ppgscope::config::RefreshInterval;
///
/// let interval: RefreshInterval = "20hz".parse().unwrap();
/// assert_eq!(interval.as_duration().as_millis(), 50);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct RefreshInterval(Duration);

impl RefreshInterval {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self::from_millis(50)
    }
}

impl fmt::Display for RefreshInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0.as_millis())
    }
}

impl FromStr for RefreshInterval {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();

        let hz = s
            .strip_suffix("hz")
            .or_else(|| s.strip_suffix("Hz"))
            .or_else(|| s.strip_suffix("HZ"));
        if let Some(num) = hz {
            let hz: f64 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid refresh rate: {}", s))?;
            if hz <= 0.0 || !hz.is_finite() {
                return Err("refresh rate must be positive".to_string());
            }
            return Ok(Self(Duration::from_secs_f64(1.0 / hz)));
        }

        if let Some(num) = s.strip_suffix("ms") {
            let ms: u64 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid interval: {}", s))?;
            if ms == 0 {
                return Err("interval must be positive".to_string());
            }
            return Ok(Self::from_millis(ms));
        }

        if let Some(num) = s.strip_suffix('s') {
            let secs: f64 = num
                .trim()
                .parse()
                .map_err(|_| format!("invalid interval: {}", s))?;
            if secs <= 0.0 || !secs.is_finite() {
                return Err("interval must be positive".to_string());
            }
            return Ok(Self(Duration::from_secs_f64(secs)));
        }

        let ms: u64 = s.parse().map_err(|_| format!("invalid interval: {}", s))?;
        if ms == 0 {
            return Err("interval must be positive".to_string());
        }
        Ok(Self::from_millis(ms))
    }
}

impl TryFrom<String> for RefreshInterval {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// System-wide configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PpgConfig {
    /// Serial link parameters
    pub serial: SerialConfig,
    /// Rolling sample buffer
    pub buffer: BufferConfig,
    /// Smoothing filter design
    pub filter: FilterConfig,
    /// Render tick and axis scaling
    pub display: DisplayConfig,
}

/// Serial link parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Line speed in baud
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
    /// Sleep between availability polls when no input is pending, in microseconds
    pub poll_interval_us: u64,
}

/// Rolling sample buffer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Number of samples retained (500 is ~10 s at 50 Hz)
    pub capacity: usize,
}

/// Butterworth low-pass design
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Filter order
    pub order: usize,
    /// Assumed device sample rate in Hz
    pub sample_rate_hz: f64,
    /// Cutoff frequency in Hz
    pub cutoff_hz: f64,
    /// Windows at or below this length are passed through unfiltered
    pub min_window: usize,
}

/// Render tick and axis scaling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Interval between render ticks
    pub refresh: RefreshInterval,
    /// Fraction of the data range added above and below each trace
    pub margin_fraction: f64,
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }
}

impl FilterConfig {
    /// Cutoff as a fraction of the Nyquist frequency
    pub fn normalized_cutoff(&self) -> f64 {
        self.cutoff_hz / (0.5 * self.sample_rate_hz)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout_ms: 1000,
            poll_interval_us: 1000,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: 500 }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            order: 5,
            sample_rate_hz: 50.0,
            cutoff_hz: 5.0,
            min_window: 10,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh: RefreshInterval::default(),
            margin_fraction: 0.1,
        }
    }
}

impl PpgConfig {
    /// Parse a TOML document; missing fields keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PpgError::Config(format!("{}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PpgError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(PpgError::Config("baud rate must be positive".into()));
        }
        if self.buffer.capacity == 0 {
            return Err(PpgError::Config("buffer capacity must be positive".into()));
        }
        if self.filter.order == 0 {
            return Err(PpgError::Config("filter order must be positive".into()));
        }
        if self.filter.sample_rate_hz <= 0.0 {
            return Err(PpgError::Config("sample rate must be positive".into()));
        }
        let wn = self.filter.normalized_cutoff();
        if wn.is_nan() || wn <= 0.0 || wn >= 1.0 {
            return Err(PpgError::Config(format!(
                "cutoff {} Hz must lie strictly between 0 and Nyquist ({} Hz)",
                self.filter.cutoff_hz,
                self.filter.sample_rate_hz / 2.0
            )));
        }
        if self.display.refresh.as_duration().is_zero() {
            return Err(PpgError::Config("refresh interval must be positive".into()));
        }
        let margin = self.display.margin_fraction;
        if margin.is_nan() || margin < 0.0 {
            return Err(PpgError::Config("axis margin must be non-negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PpgConfig::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.timeout(), Duration::from_secs(1));
        assert_eq!(config.buffer.capacity, 500);
        assert_eq!(config.filter.order, 5);
        assert!((config.filter.normalized_cutoff() - 0.2).abs() < 1e-12);
        assert_eq!(config.display.refresh.as_duration(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_refresh_interval_formats() {
        let ms: RefreshInterval = "40ms".parse().unwrap();
        assert_eq!(ms.as_duration(), Duration::from_millis(40));

        let bare: RefreshInterval = "40".parse().unwrap();
        assert_eq!(bare, ms);

        let secs: RefreshInterval = "0.04s".parse().unwrap();
        assert_eq!(secs.as_duration().as_millis(), 40);

        let hz: RefreshInterval = "25Hz".parse().unwrap();
        assert_eq!(hz.as_duration().as_millis(), 40);
    }

    #[test]
    fn test_refresh_interval_invalid() {
        assert!("abc".parse::<RefreshInterval>().is_err());
        assert!("0ms".parse::<RefreshInterval>().is_err());
        assert!("-5hz".parse::<RefreshInterval>().is_err());
        assert!("0s".parse::<RefreshInterval>().is_err());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = PpgConfig::from_toml_str(
            r#"
            [filter]
            cutoff_hz = 4.0

            [display]
            refresh = "20hz"
            "#,
        )
        .unwrap();

        assert_eq!(config.filter.cutoff_hz, 4.0);
        assert_eq!(config.filter.order, 5);
        assert_eq!(config.display.refresh.as_duration().as_millis(), 50);
        assert_eq!(config.buffer.capacity, 500);
    }

    #[test]
    fn test_toml_rejects_cutoff_above_nyquist() {
        let err = PpgConfig::from_toml_str("[filter]\ncutoff_hz = 30.0\n").unwrap_err();
        assert!(matches!(err, PpgError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = PpgConfig::default();
        config.buffer.capacity = 0;
        assert!(config.validate().is_err());
    }
}
