// src/drivers/mod.rs
pub mod buffer;
pub mod error;
pub mod logfile;
pub mod network;
pub mod pipeline;
pub mod plot;

pub use buffer::{SlidingWindow, WindowFrame};
pub use error::AcquisitionError;
pub use logfile::{read_tail, LogTable};
pub use network::{FeedTimeouts, NetworkSampleSource};
pub use pipeline::{parse_field, SensorClass, ValuePipeline, TEMPERATURE_PORT};
pub use plot::{render_scalar_png, Canvas, PngRenderer, Renderer};
