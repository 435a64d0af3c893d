use std::f64::consts::PI;

/// Format one device line
pub fn ppg_line(sequence: i64, red: i64, infrared: i64) -> String {
    format!("PPG_RAW,{},{},{}", sequence, red, infrared)
}

/// Synthetic PPG lines: a slow pulse plus a component well above the cutoff
///
/// `pulse_hz` should sit below the low-pass cutoff and `ripple_hz` above it.
pub fn ppg_lines(count: usize, sample_rate: f64, pulse_hz: f64, ripple_hz: f64) -> Vec<String> {
    (0..count)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let pulse = (2.0 * PI * pulse_hz * t).sin();
            let ripple = (2.0 * PI * ripple_hz * t).sin();
            let red = 50_000.0 + 1_000.0 * pulse + 400.0 * ripple;
            let infrared = 60_000.0 + 1_500.0 * pulse + 400.0 * ripple;
            ppg_line(i as i64, red.round() as i64, infrared.round() as i64)
        })
        .collect()
}

/// `PPG_RAW,n,100+n,200+n` for n in `0..count`
pub fn ramp_lines(count: usize) -> Vec<String> {
    (0..count as i64)
        .map(|n| ppg_line(n, 100 + n, 200 + n))
        .collect()
}
