//! Serial transport underneath the AT queue.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

const WRITE_RETRY: Duration = Duration::from_millis(1);

/// Byte channel to a modem's AT interface.
///
/// The reader and writer threads share one channel, so every method takes
/// `&self`.
pub trait AtChannel: Send + Sync {
    /// Writes all of `bytes`.
    fn write(&self, bytes: &[u8]) -> io::Result<()>;

    /// Copies whatever input is ready into `buffer` without blocking.
    ///
    /// Returns 0 when nothing is available.
    fn read_available(&self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Releases the underlying device.
    fn close(&self);
}

/// Opens AT channels for device nodes.
pub trait ChannelOpener: Send + Sync {
    /// Opens the channel behind `node`.
    fn open(&self, node: &Utf8Path) -> io::Result<Box<dyn AtChannel>>;
}

/// Line rate used for every AT interface.
pub const BAUD_RATE: u32 = 115_200;

const PORT_TIMEOUT: Duration = Duration::from_millis(10);

type Port = Mutex<Option<Box<dyn SerialPort>>>;

/// Serial port in raw 8N1 mode with separate read and write handles.
pub struct SerialChannel {
    reader: Port,
    writer: Port,
}

impl SerialChannel {
    /// Opens `node` at [`BAUD_RATE`].
    pub fn open(node: &Utf8Path) -> io::Result<Self> {
        let port = serialport::new(node.as_str(), BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(PORT_TIMEOUT)
            .open()?;
        Self::from_port(port)
    }

    /// Wraps an already configured port.
    pub fn from_port(port: Box<dyn SerialPort>) -> io::Result<Self> {
        let writer = port.try_clone()?;
        Ok(Self {
            reader: Mutex::new(Some(port)),
            writer: Mutex::new(Some(writer)),
        })
    }

    fn closed() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "channel closed")
    }
}

impl fmt::Debug for SerialChannel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|port| port.name());
        formatter
            .debug_struct("SerialChannel")
            .field("port", &name)
            .finish()
    }
}

impl AtChannel for SerialChannel {
    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let port = guard.as_mut().ok_or_else(Self::closed)?;
        let mut remaining = bytes;
        while !remaining.is_empty() {
            match port.write(remaining) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(written) => remaining = remaining.get(written..).unwrap_or_default(),
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    thread::sleep(WRITE_RETRY);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
        port.flush()
    }

    fn read_available(&self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut guard = self.reader.lock().unwrap_or_else(PoisonError::into_inner);
        let port = guard.as_mut().ok_or_else(Self::closed)?;
        if port.bytes_to_read()? == 0 {
            return Ok(0);
        }
        match port.read(buffer) {
            Ok(read) => Ok(read),
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock
                        | io::ErrorKind::TimedOut
                        | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(error) => Err(error),
        }
    }

    fn close(&self) {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Opens [`SerialChannel`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl ChannelOpener for SerialOpener {
    fn open(&self, node: &Utf8Path) -> io::Result<Box<dyn AtChannel>> {
        Ok(Box::new(SerialChannel::open(node)?))
    }
}
