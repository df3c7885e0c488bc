//! Serial channel for PowerLinc-style modems
//!
//! The port is opened once and cloned so the reader and writer each own a
//! handle. Reads use a short driver timeout so that `close()` is observed
//! within one timeout period; timeouts never reach the caller.

use super::ByteChannel;
use crate::constants::{SERIAL_DISCONNECT_THRESHOLD, SERIAL_READ_TIMEOUT_MS};
use crate::error::{PortError, Result};
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Serial channel, 8N1 without flow control
pub struct SerialChannel {
    device: String,
    baud_rate: u32,
    open: AtomicBool,
    reader: Mutex<Option<Box<dyn SerialPort>>>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
}

impl SerialChannel {
    /// Create a channel for the given device (not opened yet)
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            open: AtomicBool::new(false),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    fn open_port(&self) -> Result<Box<dyn SerialPort>> {
        let map_err = |e: serialport::Error| PortError::SerialOpen {
            device: self.device.clone(),
            source: std::io::Error::other(e.to_string()),
        };

        serialport::new(&self.device, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(SERIAL_READ_TIMEOUT_MS))
            .open()
            .map_err(map_err)
    }
}

impl ByteChannel for SerialChannel {
    fn open(&self) -> Result<()> {
        // Writer lock serializes open/close
        let mut writer = self.writer.lock();
        if self.open.load(Ordering::SeqCst) {
            return Err(PortError::AlreadyOpen);
        }

        let port = self.open_port()?;
        let clone = port.try_clone().map_err(|e| PortError::SerialOpen {
            device: self.device.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;

        *self.reader.lock() = Some(clone);
        *writer = Some(port);
        self.open.store(true, Ordering::SeqCst);
        info!("Opened serial {} @ {} baud", self.device, self.baud_rate);
        Ok(())
    }

    fn close(&self) {
        let mut writer = self.writer.lock();
        if !self.open.swap(false, Ordering::SeqCst) && writer.is_none() {
            return;
        }
        // Dropping the handles releases the device even if it is broken
        writer.take();
        self.reader.lock().take();
        info!("Closed serial {}", self.device);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut zero_reads = 0u32;
        loop {
            if !self.open.load(Ordering::SeqCst) {
                return Ok(0);
            }

            // Lock per attempt so close() never waits longer than one timeout
            let mut guard = self.reader.lock();
            let Some(port) = guard.as_mut() else {
                return Ok(0);
            };

            match port.read(buf) {
                Ok(n) if n > 0 => return Ok(n),
                Ok(_) => {
                    zero_reads += 1;
                    if zero_reads > SERIAL_DISCONNECT_THRESHOLD {
                        debug!("Serial {} returned no data repeatedly", self.device);
                        return Ok(0);
                    }
                }
                Err(ref e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    zero_reads = 0;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock();
        let port = guard.as_mut().ok_or(PortError::NotOpen)?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }
}
