pub mod butterworth_lowpass;
pub mod filter_stage;
pub mod zero_phase;

pub use butterworth_lowpass::ButterworthLowpass;
pub use filter_stage::{FilterOutcome, FilterStage};
pub use zero_phase::ZeroPhaseFilter;
