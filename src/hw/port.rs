use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, instrument};

use crate::error::TransportError;

/// Readable half of an open device stream.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Writable half of an open device stream.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Both halves of an open device stream.
pub struct PortStreams {
    pub reader: BoxedReader,
    pub writer: BoxedWriter,
}

impl PortStreams {
    /// Wraps a reader and writer pair.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

impl fmt::Debug for PortStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortStreams").finish_non_exhaustive()
    }
}

/// Source of an ordered, reliable byte stream to the device.
///
/// The session never assumes anything about the medium beyond ordered
/// delivery; closing happens by dropping the returned halves.
#[async_trait]
pub trait DevicePort: Send + Sync {
    /// Human-readable port name used in logs and errors.
    fn describe(&self) -> String;

    /// Opens a fresh stream to the device.
    async fn open(&self) -> Result<PortStreams, TransportError>;
}

/// A serial device exposed as a character device, such as `/dev/ttyACM0`.
///
/// The Flipper's USB CDC interface ignores line settings, so the device node
/// is opened for reading and writing as-is.
#[derive(Debug, Clone)]
pub struct CharDevicePort {
    path: PathBuf,
}

impl CharDevicePort {
    /// Creates a port for the given device node.
    ///
    /// ```
    /// use ntag::{CharDevicePort, DevicePort};
    ///
    /// let port = CharDevicePort::new("/dev/ttyACM0");
    /// assert_eq!("/dev/ttyACM0", port.describe());
    /// ```
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DevicePort for CharDevicePort {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    #[instrument(skip(self), level = "debug", fields(port = %self.path.display()))]
    async fn open(&self) -> Result<PortStreams, TransportError> {
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .await
            .map_err(|source| TransportError::Open {
                port: self.describe(),
                source,
            })?;
        debug!("device node opened");
        let (reader, writer) = tokio::io::split(file);
        Ok(PortStreams::new(reader, writer))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn missing_device_node_reports_open_error() {
        let port = CharDevicePort::new("/nonexistent/ntag-test-port");
        assert_matches!(
            port.open().await,
            Err(TransportError::Open { port, .. }) if port == "/nonexistent/ntag-test-port"
        );
    }
}
