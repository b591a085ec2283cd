use thiserror::Error;
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("invalid pass band {low_hz} Hz - {high_hz} Hz for sample rate {sample_rate_hz} Hz")]
    InvalidBand {
        low_hz: f64,
        high_hz: f64,
        sample_rate_hz: f64,
    },
    #[error("sample window not full yet: {filled}/{capacity} samples")]
    WindowNotFull { filled: usize, capacity: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("failed to render display frame: {0}")]
    Render(String),
    #[error(transparent)]
    Sensor(#[from] SensorFault),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
/// A failed sensor read. The kind is only reported, never acted on.
#[derive(Debug, Error)]
pub enum SensorFault {
    #[error("sensor busy, no sample available yet")]
    Busy,
    #[error("malformed sensor reading: {0:?}")]
    Malformed(String),
    #[error("sensor disconnected: {0}")]
    Disconnected(String),
}
impl From<std::io::Error> for SensorFault {
    fn from(value: std::io::Error) -> Self {
        match value.kind() {
            std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::Interrupted => SensorFault::Busy,
            std::io::ErrorKind::InvalidData => SensorFault::Malformed(value.to_string()),
            _ => SensorFault::Disconnected(value.to_string()),
        }
    }
}
impl From<serialport::Error> for SensorFault {
    fn from(value: serialport::Error) -> Self {
        SensorFault::Disconnected(value.to_string())
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for MonitorError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        MonitorError::Render(format!("{value:?}"))
    }
}
impl From<image::ImageError> for MonitorError {
    fn from(value: image::ImageError) -> Self {
        MonitorError::Render(value.to_string())
    }
}
