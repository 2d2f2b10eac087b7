use log::{debug, warn};

use crate::drivers::AcquisitionError;
use crate::types::SourceDescriptor;

/// Port of the designated temperature endpoint.
pub const TEMPERATURE_PORT: u16 = 63205;
/// Temperature readings at or above this are sensor glitches.
pub const TEMPERATURE_MAX: f64 = 500.0;
/// Open interval of plausible pressure readings.
pub const PRESSURE_RANGE: (f64, f64) = (0.0, 0.05);

/// Acceptance rule, picked by the endpoint a source talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorClass {
    Temperature,
    Pressure,
}

impl SensorClass {
    pub fn for_port(port: u16) -> Self {
        if port == TEMPERATURE_PORT {
            SensorClass::Temperature
        } else {
            SensorClass::Pressure
        }
    }

    pub fn accepts(self, value: f64) -> bool {
        match self {
            SensorClass::Temperature => value < TEMPERATURE_MAX,
            SensorClass::Pressure => value > PRESSURE_RANGE.0 && value < PRESSURE_RANGE.1,
        }
    }
}

/// Extracts the 0-indexed comma-separated field at `index` as a float.
pub fn parse_field(record: &str, index: usize) -> Result<f64, AcquisitionError> {
    let malformed = |reason: String| AcquisitionError::MalformedRecord {
        record: record.to_owned(),
        reason,
    };
    let field = record
        .split(',')
        .nth(index)
        .ok_or_else(|| malformed(format!("no field at index {index}")))?;
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| malformed(e.to_string()))
}

/// Per-value pipeline for one network source.
///
/// A record that cannot be parsed falls back to `0.0`, which then goes
/// through the acceptance rule like any other reading.
#[derive(Clone, Debug)]
pub struct ValuePipeline {
    field_index: usize,
    class: SensorClass,
    last_accepted: Option<f64>,
}

impl ValuePipeline {
    pub fn for_source(source: &SourceDescriptor) -> Self {
        Self {
            field_index: source.channel_index,
            class: SensorClass::for_port(source.port),
            last_accepted: None,
        }
    }

    pub fn class(&self) -> SensorClass {
        self.class
    }

    pub fn last_accepted(&self) -> Option<f64> {
        self.last_accepted
    }

    /// Returns the value to push, or `None` when the reading is rejected.
    pub fn process(&mut self, record: &str) -> Option<f64> {
        let value = parse_field(record, self.field_index).unwrap_or_else(|e| {
            warn!("{e}");
            0.0
        });
        if self.class.accepts(value) {
            self.last_accepted = Some(value);
            Some(value)
        } else {
            debug!("{:?} reading {value} rejected", self.class);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(port: u16, channel_index: usize) -> SourceDescriptor {
        SourceDescriptor {
            name: "T".into(),
            host: "localhost".into(),
            port,
            channel_index,
            log_path: PathBuf::new(),
            display_color: "red".into(),
        }
    }

    fn run(pipeline: &mut ValuePipeline, lines: &[&str]) -> Vec<f64> {
        lines.iter().filter_map(|l| pipeline.process(l)).collect()
    }

    #[test]
    fn temperature_filter_drops_readings_at_or_above_500() {
        let mut pipeline = ValuePipeline::for_source(&source(TEMPERATURE_PORT, 0));
        assert_eq!(pipeline.class(), SensorClass::Temperature);
        assert_eq!(run(&mut pipeline, &["10", "501", "499"]), vec![10.0, 499.0]);
        assert_eq!(pipeline.last_accepted(), Some(499.0));
    }

    #[test]
    fn pressure_filter_keeps_open_interval() {
        let mut pipeline = ValuePipeline::for_source(&source(63201, 0));
        assert_eq!(
            run(&mut pipeline, &["0.02", "-1", "0.06", "0.0001"]),
            vec![0.02, 0.0001]
        );
        assert_eq!(pipeline.last_accepted(), Some(0.0001));
    }

    #[test]
    fn field_is_selected_by_channel_index() {
        let mut pipeline = ValuePipeline::for_source(&source(63201, 2));
        assert_eq!(run(&mut pipeline, &["12:00:01,1e-9,0.003"]), vec![0.003]);
    }

    #[test]
    fn unparsable_record_falls_back_to_zero() {
        let mut pressure = ValuePipeline::for_source(&source(63201, 1));
        assert_eq!(run(&mut pressure, &["x,oops", "x"]), Vec::<f64>::new());
        let mut temperature = ValuePipeline::for_source(&source(TEMPERATURE_PORT, 1));
        assert_eq!(run(&mut temperature, &["x,oops"]), vec![0.0]);
    }

    #[test]
    fn parse_field_reports_malformed_records() {
        assert_eq!(parse_field(" 1.5 ,2", 0).unwrap(), 1.5);
        assert!(matches!(
            parse_field("1.5", 3),
            Err(AcquisitionError::MalformedRecord { .. })
        ));
        assert!(matches!(
            parse_field("a,b", 1),
            Err(AcquisitionError::MalformedRecord { .. })
        ));
    }
}
