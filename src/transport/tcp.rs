//! TCP channel for serial-over-IP modems
//!
//! The connected stream is cloned into a reader half and a writer half.
//! `close()` shuts the socket down in both directions, which makes a
//! blocked `read()` return end of stream and a blocked `write()` fail.

use super::ByteChannel;
use crate::constants::TCP_CONNECT_TIMEOUT_SECS;
use crate::error::{PortError, Result};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Raw TCP channel
pub struct TcpChannel {
    host: String,
    port: u16,
    open: AtomicBool,
    reader: Mutex<Option<TcpStream>>,
    writer: Mutex<Option<TcpStream>>,
    /// Handle used only to shut the socket down from `close()`
    control: Mutex<Option<TcpStream>>,
}

impl TcpChannel {
    /// Create a channel for `host:port` (not connected yet)
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            open: AtomicBool::new(false),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            control: Mutex::new(None),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect(&self) -> Result<TcpStream> {
        let address = self.address();
        let map_err = |e| PortError::TcpConnect {
            address: address.clone(),
            source: e,
        };

        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(map_err)?
            .collect();

        let mut last_err =
            std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses");
        for addr in addrs {
            match connect_socket(addr) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_err = e;
                }
            }
        }
        Err(map_err(last_err))
    }
}

/// Connect with keepalive and no-delay enabled
fn connect_socket(addr: SocketAddr) -> std::io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_keepalive(true)?;
    socket.set_nodelay(true)?;
    socket.connect_timeout(&addr.into(), Duration::from_secs(TCP_CONNECT_TIMEOUT_SECS))?;
    Ok(socket.into())
}

impl ByteChannel for TcpChannel {
    fn open(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        if self.open.load(Ordering::SeqCst) {
            return Err(PortError::AlreadyOpen);
        }

        let stream = self.connect()?;
        let clone_err = |e| PortError::TcpConnect {
            address: self.address(),
            source: e,
        };
        let reader = stream.try_clone().map_err(clone_err)?;
        let control = stream.try_clone().map_err(clone_err)?;

        *self.reader.lock() = Some(reader);
        *self.control.lock() = Some(control);
        *writer = Some(stream);
        self.open.store(true, Ordering::SeqCst);
        info!("Connected to {}", self.address());
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);

        // Shut down before touching the writer lock: a writer stuck in send
        // holds it until the shutdown fails its write
        let control = self.control.lock().take();
        if let Some(control) = control {
            let _ = control.shutdown(Shutdown::Both);
            info!("Disconnected from {}", self.address());
        }

        self.writer.lock().take();
        // The reader half is dropped on the next open, a blocked reader may still hold it
        if let Some(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = self.reader.lock();
        let Some(stream) = guard.as_mut() else {
            return Ok(0);
        };
        loop {
            match stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) if !self.open.load(Ordering::SeqCst) => return Ok(0),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock();
        let stream = guard.as_mut().ok_or(PortError::NotOpen)?;
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }
}
