//! Byte transport abstraction and implementations
//!
//! The engine only needs two operations from its link to the board:
//! "try to read the next byte" and "write these bytes, in order". A
//! read yielding no data simply ends the current poll cycle; the engine
//! never blocks or retries.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use tracing::debug;

/// A byte-oriented link to a board
pub trait Transport {
    /// Read the next available byte, or `None` when the link has no data
    /// ready right now
    fn try_read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write bytes synchronously and in order
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// Serial port transport with short-timeout, effectively non-blocking reads
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open a serial device at the given baud rate
    pub fn open(path: &str, baud_rate: u32) -> io::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(1))
            .open()?;
        debug!("opened {} at {} baud", path, baud_rate);
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn try_read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }
}

/// In-memory transport for tests and simulation: inbound bytes are
/// scripted with [`feed`](MemoryTransport::feed), outbound bytes are
/// recorded for inspection.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the engine to read
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    /// Everything the engine has written so far
    pub fn written(&self) -> &[u8] {
        &self.outbound
    }

    /// Take and clear the recorded outbound bytes
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

impl Transport for MemoryTransport {
    fn try_read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.inbound.pop_front())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.outbound.extend_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_transport_feed_and_read() {
        let mut transport = MemoryTransport::new();
        transport.feed(&[1, 2]);
        assert_eq!(transport.try_read_byte().unwrap(), Some(1));
        assert_eq!(transport.try_read_byte().unwrap(), Some(2));
        assert_eq!(transport.try_read_byte().unwrap(), None);
    }

    #[test]
    fn test_memory_transport_records_writes() {
        let mut transport = MemoryTransport::new();
        transport.write(&[0x90, 0x01]).unwrap();
        transport.write(&[0x00]).unwrap();
        assert_eq!(transport.written(), &[0x90, 0x01, 0x00]);
        assert_eq!(transport.take_written(), vec![0x90, 0x01, 0x00]);
        assert!(transport.written().is_empty());
    }
}
