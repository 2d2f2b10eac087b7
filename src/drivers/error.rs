use std::path::PathBuf;

use thiserror::Error;

use crate::types::AcquisitionMode;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("unknown source `{0}`")]
    UnknownSource(String),
    #[error("log file {path} unavailable: {reason}")]
    FileUnavailable { path: PathBuf, reason: String },
    #[error("malformed record {record:?}: {reason}")]
    MalformedRecord { record: String, reason: String },
    #[error("window capacity {requested} out of range (must be 0 < n < {max})")]
    InvalidCapacity { requested: i64, max: usize },
    #[error("channel {0} is invalid; only 0 or 1 can be monitored")]
    InvalidChannel(i64),
    #[error("channel is fixed by the source while in {0:?} mode")]
    ChannelFixed(AcquisitionMode),
    #[error("failed to connect to {addr}: {reason}")]
    ConnectFailed { addr: String, reason: String },
    #[error("connection to {addr} closed: {reason}")]
    TransportClosed { addr: String, reason: String },
    #[error("no data from {addr} for {secs} s")]
    IdleTimeout { addr: String, secs: u64 },
    #[error("invalid source registry: {0}")]
    Registry(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

impl AcquisitionError {
    pub(crate) fn file_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AcquisitionError::FileUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors reported by the background reader that end the stream.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AcquisitionError::ConnectFailed { .. }
                | AcquisitionError::TransportClosed { .. }
                | AcquisitionError::IdleTimeout { .. }
        )
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for AcquisitionError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        AcquisitionError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for AcquisitionError {
    fn from(value: image::ImageError) -> Self {
        AcquisitionError::Plot(value.to_string())
    }
}
