use std::io::Read;
use std::time::Duration;
use serialport::SerialPort;
use crate::drivers::{MonitorError, SampleSource, SensorFault};
/// Read timeout per poll; short so a silent bridge only stalls one attempt.
const READ_TIMEOUT: Duration = Duration::from_millis(5);
/// Longest line we are willing to buffer before discarding it as garbage.
const MAX_LINE_BYTES: usize = 64;
/// Splits the bridge's byte stream into one-sample-per-line readings.
///
/// Lines look like `"<ir>"` or `"<ir>,<red>"`; only the first field is used.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}
impl LineDecoder {
    pub fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }
    /// Oldest complete line, if any, parsed into an intensity.
    pub fn next_sample(&mut self) -> Option<Result<f64, SensorFault>> {
        let Some(end) = self.pending.iter().position(|&b| b == b'\n') else {
            if self.pending.len() > MAX_LINE_BYTES {
                let junk = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                return Some(Err(SensorFault::Malformed(junk)));
            }
            return None;
        };
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        let text = String::from_utf8_lossy(&line);
        let field = text.trim().split(',').next().unwrap_or("").trim();
        Some(
            field
                .parse::<f64>()
                .map_err(|_| SensorFault::Malformed(text.trim().to_string())),
        )
    }
}
/// PPG sensor behind a serial bridge that streams one IR sample per line.
pub struct SerialPpgSensor {
    port_name: String,
    port: Box<dyn SerialPort>,
    decoder: LineDecoder,
}
impl SerialPpgSensor {
    pub fn connect(port_name: &str, baud_rate: u32) -> Result<Self, MonitorError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(SensorFault::from)?;
        Ok(Self {
            port_name: port_name.to_string(),
            port,
            decoder: LineDecoder::default(),
        })
    }
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}
impl SampleSource for SerialPpgSensor {
    fn read_sample(&mut self) -> Result<f64, SensorFault> {
        if let Some(sample) = self.decoder.next_sample() {
            return sample;
        }
        let mut chunk = [0u8; 64];
        let read = self.port.read(&mut chunk)?;
        if read == 0 {
            return Err(SensorFault::Disconnected(format!(
                "{} closed",
                self.port_name
            )));
        }
        self.decoder.feed(&chunk[..read]);
        self.decoder.next_sample().unwrap_or(Err(SensorFault::Busy))
    }
}
