//! Mock serial device for testing.
//!
//! `MockDevice` plays the role of the physical receiver: it holds a script
//! of reads (data, errors, silence) and hands out `MockSerialPort` handles
//! when opened. Every handle shares the device's state, so tests can check
//! how often the port was opened and whether a stale handle was ever read.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// One scripted read result.
#[derive(Debug, Clone)]
pub enum MockRead {
    /// Bytes returned by the next read (split across reads if the buffer is smaller).
    Data(Vec<u8>),
    /// The next read fails with an I/O error of this kind.
    Error(io::ErrorKind),
    /// The next read blocks for this long and then times out.
    Silence(Duration),
}

#[derive(Debug)]
struct MockDeviceState {
    script: VecDeque<MockRead>,
    /// How long a read blocks when the script is empty.
    idle_read: Duration,
    /// Identifier of the most recently opened handle.
    current_handle: u64,
    open_handles: u32,
    opens: u32,
    open_attempts: u32,
    reads: u64,
    reads_in_flight: u32,
    stale_reads: u32,
    opens_during_read: u32,
    /// Number of further opens that succeed; `None` means unlimited.
    remaining_opens: Option<u32>,
    last_config: Option<PortConfiguration>,
}

/// A scripted stand-in for the RF receiver.
///
/// # Example
/// ```
/// use smatrix_exporter::port::{MockDevice, PortConfiguration, PortOpener, SerialPortAdapter};
///
/// let device = MockDevice::new();
/// device.push_line("045  I --- 04:123456 --:------ --:------ 1F09 003");
///
/// let mut port = device.open("/dev/mock", &PortConfiguration::antenna()).unwrap();
/// let mut buffer = [0u8; 64];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert!(buffer[..n].ends_with(b"\r\n"));
/// assert_eq!(device.opens(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct MockDevice {
    state: Arc<Mutex<MockDeviceState>>,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Create a silent device whose empty reads block for 10ms.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockDeviceState {
                script: VecDeque::new(),
                idle_read: Duration::from_millis(10),
                current_handle: 0,
                open_handles: 0,
                opens: 0,
                open_attempts: 0,
                reads: 0,
                reads_in_flight: 0,
                stale_reads: 0,
                opens_during_read: 0,
                remaining_opens: None,
                last_config: None,
            })),
        }
    }

    /// Set how long a read blocks when nothing is scripted.
    pub fn with_idle_read(self, idle_read: Duration) -> Self {
        self.state.lock().idle_read = idle_read;
        self
    }

    /// Append raw bytes to the script.
    pub fn push_bytes(&self, data: &[u8]) {
        self.push(MockRead::Data(data.to_vec()));
    }

    /// Append a CRLF-terminated line to the script.
    pub fn push_line(&self, line: &str) {
        self.push(MockRead::Data(format!("{line}\r\n").into_bytes()));
    }

    /// Append a read error to the script.
    pub fn push_error(&self, kind: io::ErrorKind) {
        self.push(MockRead::Error(kind));
    }

    /// Append a period of silence to the script.
    pub fn push_silence(&self, duration: Duration) {
        self.push(MockRead::Silence(duration));
    }

    pub fn push(&self, read: MockRead) {
        self.state.lock().script.push_back(read);
    }

    /// Allow only `count` more successful opens; later opens fail with `NotFound`.
    pub fn fail_opens_after(&self, count: u32) {
        self.state.lock().remaining_opens = Some(count);
    }

    /// Total number of successful opens.
    pub fn opens(&self) -> u32 {
        self.state.lock().opens
    }

    /// Every call to `open`, including the ones that failed.
    pub fn open_attempts(&self) -> u32 {
        self.state.lock().open_attempts
    }

    /// Number of handles that are open right now.
    pub fn open_handles(&self) -> u32 {
        self.state.lock().open_handles
    }

    /// Total number of read calls across all handles.
    pub fn reads(&self) -> u64 {
        self.state.lock().reads
    }

    /// Reads issued on a handle that had already been replaced or closed.
    pub fn stale_reads(&self) -> u32 {
        self.state.lock().stale_reads
    }

    /// Opens that happened while a read was blocked on another handle.
    pub fn opens_during_read(&self) -> u32 {
        self.state.lock().opens_during_read
    }

    /// Scripted reads not consumed yet.
    pub fn pending(&self) -> usize {
        self.state.lock().script.len()
    }

    /// Transport parameters used by the last open.
    pub fn last_config(&self) -> Option<PortConfiguration> {
        self.state.lock().last_config.clone()
    }
}

impl PortOpener for MockDevice {
    fn open(
        &self,
        device: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let mut state = self.state.lock();
        state.open_attempts += 1;

        if let Some(remaining) = state.remaining_opens.as_mut() {
            if *remaining == 0 {
                return Err(PortError::not_found(device));
            }
            *remaining -= 1;
        }

        if state.reads_in_flight > 0 {
            state.opens_during_read += 1;
        }

        state.opens += 1;
        state.open_handles += 1;
        state.current_handle += 1;
        state.last_config = Some(config.clone());

        Ok(Box::new(MockSerialPort {
            name: device.to_string(),
            handle: state.current_handle,
            state: Arc::clone(&self.state),
        }))
    }
}

/// An open handle on a `MockDevice`. Dropping it closes the handle.
pub struct MockSerialPort {
    name: String,
    handle: u64,
    state: Arc<Mutex<MockDeviceState>>,
}

impl SerialPortAdapter for MockSerialPort {
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let (next, idle) = {
            let mut state = self.state.lock();
            state.reads += 1;
            if state.current_handle != self.handle {
                state.stale_reads += 1;
            }
            state.reads_in_flight += 1;
            (state.script.pop_front(), state.idle_read)
        };

        let result = match next {
            Some(MockRead::Data(data)) => {
                let n = data.len().min(buffer.len());
                buffer[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.state
                        .lock()
                        .script
                        .push_front(MockRead::Data(data[n..].to_vec()));
                }
                Ok(n)
            }
            Some(MockRead::Error(kind)) => Err(PortError::Io(io::Error::new(
                kind,
                "scripted read failure",
            ))),
            Some(MockRead::Silence(duration)) => {
                std::thread::sleep(duration);
                Err(PortError::Io(io::Error::new(io::ErrorKind::TimedOut, "silence")))
            }
            None => {
                std::thread::sleep(idle);
                Err(PortError::Io(io::Error::new(io::ErrorKind::TimedOut, "no data")))
            }
        };

        self.state.lock().reads_in_flight -= 1;
        result
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_input(&mut self) -> Result<(), PortError> {
        Ok(())
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.open_handles = state.open_handles.saturating_sub(1);
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}
