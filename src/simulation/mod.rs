mod device;

pub use device::{SimulatedSource, SimulationConfig, pulse_shape};
