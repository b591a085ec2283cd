// src/drivers/mod.rs
// sensor input, signal processing and panel rendering
pub mod buffer;
pub mod error;
pub mod filter;
pub mod peaks;
pub mod pipeline;
pub mod plot;
pub mod serial;
pub mod source;
// flat re-exports for the rest of the crate
pub use buffer::SampleWindow;
pub use error::{MonitorError, SensorFault};
pub use plot::sink_for_path;
pub use serial::SerialPpgSensor;
pub use source::{FingerSwitch, RetryingSource, SampleSource, SimulatedPpg};
