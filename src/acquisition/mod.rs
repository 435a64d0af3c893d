pub mod acquisition_loop;
pub mod buffer;
pub mod parser;
pub mod serial;
pub mod source;

pub use acquisition_loop::{AcquisitionLoop, AcquisitionReport, AcquisitionState, AcquisitionStats};
pub use buffer::{SampleBuffer, SharedSampleBuffer, Snapshot};
pub use parser::{PPG_MARKER, Sample, parse_line};
pub use serial::{PortInfo, SerialSource, list_ports, prompt_for_port, select_port};
pub use source::{LineSource, ScriptedSource};
