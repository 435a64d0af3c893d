pub mod acquisition;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod render;
pub mod session;
pub mod signal_processing;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::PpgConfig;
pub use error::{ParseError, PpgError, Result};
