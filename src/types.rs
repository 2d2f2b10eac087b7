// src/types.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::drivers::AcquisitionError;

/// Registry entry for one named sensor feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Field index on the wire; also the log column offset (`channel + 1`).
    #[serde(rename = "channel")]
    pub channel_index: usize,
    /// Filled in by the registry from its shared-log naming rule.
    #[serde(default)]
    pub log_path: PathBuf,
    #[serde(rename = "color", default = "default_color")]
    pub display_color: String,
}

fn default_color() -> String {
    "red".to_owned()
}

impl SourceDescriptor {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn style(&self) -> StyleHint {
        StyleHint {
            color: parse_color(&self.display_color).unwrap_or(StyleHint::default().color),
            label: self.name.clone(),
        }
    }
}

// Only one acquisition path may be active at a time.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum AcquisitionMode {
    #[default]
    Idle,
    FileReplay,
    NetworkStream,
}

/// Colour and legend label handed to the renderer with every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleHint {
    pub color: [u8; 3],
    pub label: String,
}

impl Default for StyleHint {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            label: "log".to_owned(),
        }
    }
}

/// Accepts `#rrggbb` or the handful of named colours used by the server list.
pub fn parse_color(hint: &str) -> Option<[u8; 3]> {
    let hint = hint.trim();
    if let Some(hex) = hint.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return Some([channel(0)?, channel(2)?, channel(4)?]);
    }
    let rgb = match hint.to_ascii_lowercase().as_str() {
        "red" => [255, 0, 0],
        "green" => [0, 200, 0],
        "blue" => [40, 90, 255],
        "yellow" => [255, 255, 0],
        "cyan" => [0, 255, 255],
        "magenta" => [255, 0, 255],
        "orange" => [255, 165, 0],
        "white" => [255, 255, 255],
        "black" => [0, 0, 0],
        _ => return None,
    };
    Some(rgb)
}

// Background reader -> foreground handoff.
#[derive(Debug)]
pub enum FeedEvent {
    /// One complete text record, forwarded verbatim.
    Line(String),
    /// Terminal transport error; the reader has exited after sending it.
    Error(AcquisitionError),
}
