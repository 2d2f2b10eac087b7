//! Acquisition and windowing engine behind the scalar monitor.
//!
//! A single [`engine::AcquisitionController`] owns one active mode at a
//! time: replaying a log file on a timer, or following a live TCP feed
//! seeded from that source's log. Either way the result is a fixed-size
//! window of recent values handed to a [`drivers::Renderer`].
pub mod config;
pub mod drivers;
pub mod engine;
pub mod registry;
pub mod types;

pub use config::MonitorConfig;
pub use engine::{AcquisitionController, Session};
pub use registry::SensorRegistry;
pub use types::{AcquisitionMode, SourceDescriptor, StyleHint};
