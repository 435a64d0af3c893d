pub mod generate;

pub use generate::{ppg_line, ppg_lines, ramp_lines};
