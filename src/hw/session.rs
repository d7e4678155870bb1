use std::time::Duration;

use bon::Builder;
use ntag_macros::progress;
use owo_colors::OwoColorize;
use serde_with::SerializeDisplay;
use strum_macros::Display;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::commands::{DeviceCommand, INTERRUPT, LINE_END, WRITE_READY_MARKER};
use super::model::{DirectoryEntry, parent_directory, parse_listing};
use super::port::{BoxedReader, BoxedWriter, DevicePort};
use super::receive_buffer::ReceiveBuffer;
use crate::error::TransportError;
use crate::utils::text_to_bytes;

/// Prompt the device CLI prints when it is ready for a command.
pub const PROMPT_MARKER: &str = ">:";

const DRAIN_CHUNK_LEN: usize = 1024;
const INTERRUPT_SETTLE: Duration = Duration::from_millis(100);
const CONTENT_SETTLE: Duration = Duration::from_millis(500);
const NEWLINE_SETTLE: Duration = Duration::from_millis(200);
const PROMPT_SETTLE: Duration = Duration::from_millis(200);

/// Lifecycle of a [`TransportSession`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, SerializeDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Synchronizing,
    Ready,
    Busy,
}

/// Timing and retry settings for a [`TransportSession`].
#[derive(Debug, Clone, Eq, PartialEq, Builder)]
pub struct SessionConfig {
    /// Number of interrupt-and-wait rounds before the handshake gives up.
    #[builder(default = 3)]
    handshake_attempts: u32,
    /// Wait for the prompt within each handshake attempt.
    #[builder(default = Duration::from_secs(2))]
    handshake_timeout: Duration,
    /// Wait for a command echo or its response.
    #[builder(default = Duration::from_secs(5))]
    command_timeout: Duration,
    /// Wait for the device to announce it accepts file content.
    #[builder(default = Duration::from_secs(5))]
    write_ready_timeout: Duration,
    /// Pause after opening the port before the first handshake attempt.
    #[builder(default = Duration::from_millis(500))]
    settle_delay: Duration,
    /// Pause between failed handshake attempts.
    #[builder(default = Duration::from_millis(500))]
    retry_delay: Duration,
    /// Pause after every write to the device.
    #[builder(default = Duration::from_millis(50))]
    write_pacing: Duration,
    #[builder(default = PROMPT_MARKER.to_string(), into)]
    prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SessionConfig {
    /// Returns the number of handshake attempts.
    #[must_use]
    pub const fn handshake_attempts(&self) -> u32 {
        self.handshake_attempts
    }

    /// Returns the per-attempt handshake timeout.
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Returns the command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns the prompt marker.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Background task copying inbound bytes into the receive buffer.
#[derive(Debug)]
struct DrainTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Drop for DrainTask {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

struct Link {
    writer: BoxedWriter,
    buffer: ReceiveBuffer,
    _drain: DrainTask,
}

/// Request/response session with the device command line.
///
/// Only one operation runs at a time; every operation takes `&mut self`. Any
/// failure after the port is open drops the stream and returns the session
/// to [`SessionState::Disconnected`]; call [`TransportSession::connect`]
/// again before further use.
pub struct TransportSession {
    port: Box<dyn DevicePort>,
    config: SessionConfig,
    state: SessionState,
    link: Option<Link>,
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("port", &self.port.describe())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TransportSession {
    /// Creates a disconnected session over `port`.
    #[must_use]
    pub fn new(port: Box<dyn DevicePort>, config: SessionConfig) -> Self {
        Self {
            port,
            config,
            state: SessionState::Disconnected,
            link: None,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the session settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Opens the port and synchronises with the command prompt.
    ///
    /// Each handshake attempt sends an interrupt byte and a newline and then
    /// waits up to the handshake timeout for the prompt. Connecting an already
    /// ready session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Open`] if the port cannot be opened and
    /// [`TransportError::HandshakeFailed`] once every attempt timed out.
    #[progress(
        message = "Connecting to device",
        finished = format!("{} Connected", "✓".green()),
    )]
    #[instrument(skip(self), level = "info", fields(port = %self.port.describe()))]
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        if self.state == SessionState::Ready && self.link.is_some() {
            return Ok(());
        }

        let result = self.open_and_synchronise().await;
        match &result {
            Ok(()) => {
                self.state = SessionState::Ready;
                info!("device session ready");
            }
            Err(error) => {
                tracing::Span::current()
                    .pb_set_finish_message(&format!("{} Connection failed", "✗".red()));
                warn!(%error, "device connection failed");
                self.teardown();
            }
        }
        result
    }

    /// Closes the stream. Calling it on a disconnected session does nothing.
    #[instrument(skip(self), level = "info")]
    pub async fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take()
            && let Err(error) = link.writer.shutdown().await
        {
            debug!(%error, "device writer shutdown failed");
        }
        if self.state != SessionState::Disconnected {
            info!("device session closed");
        }
        self.state = SessionState::Disconnected;
    }

    /// Waits until `marker` arrives and returns the trimmed text before it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ReadTimeout`] when the marker does not arrive
    /// in time; the session is disconnected.
    #[instrument(skip(self), level = "debug")]
    pub async fn read_until(
        &mut self,
        marker: &str,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        self.begin()?;
        let result = self.wait_for(marker, timeout).await;
        self.finish(result)
    }

    /// Writes `content` to `path`, creating its parent directory first, and
    /// verifies the file exists afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::WriteVerificationFailed`] when `storage stat`
    /// reports an error, or any read or write failure on the way.
    #[instrument(skip(self, content), level = "info", fields(content_len = content.len()))]
    pub async fn write_file(&mut self, path: &str, content: &str) -> Result<(), TransportError> {
        self.begin()?;
        let result = self.write_file_inner(path, content).await;
        self.finish(result)
    }

    /// Lists the entries of a device directory.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandRejected`] when the device reports a
    /// storage error, or any read or write failure on the way.
    #[instrument(skip(self), level = "info")]
    pub async fn list_directory(
        &mut self,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, TransportError> {
        self.begin()?;
        let result = self.list_directory_inner(path).await;
        self.finish(result)
    }

    /// Returns the names of the applications the loader can start.
    ///
    /// # Errors
    ///
    /// Returns any read or write failure.
    #[instrument(skip(self), level = "info")]
    pub async fn loader_list(&mut self) -> Result<Vec<String>, TransportError> {
        self.begin()?;
        let result = self
            .command(&DeviceCommand::LoaderList)
            .await
            .map(|response| parse_app_names(&response));
        self.finish(result)
    }

    /// Returns the loader's report on the running application.
    ///
    /// # Errors
    ///
    /// Returns any read or write failure.
    #[instrument(skip(self), level = "info")]
    pub async fn loader_info(&mut self) -> Result<String, TransportError> {
        self.begin()?;
        let result = self.command(&DeviceCommand::LoaderInfo).await;
        self.finish(result)
    }

    /// Starts `app`, optionally passing it a file.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandRejected`] when the loader reports an
    /// error.
    #[instrument(skip(self), level = "info")]
    pub async fn loader_open(
        &mut self,
        app: &str,
        file: Option<&str>,
    ) -> Result<String, TransportError> {
        self.begin()?;
        let result = self
            .checked_command(&DeviceCommand::LoaderOpen { app, file })
            .await;
        self.finish(result)
    }

    /// Closes the running application.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandRejected`] when the loader reports an
    /// error.
    #[instrument(skip(self), level = "info")]
    pub async fn loader_close(&mut self) -> Result<String, TransportError> {
        self.begin()?;
        let result = self.checked_command(&DeviceCommand::LoaderClose).await;
        self.finish(result)
    }

    /// Sends a named signal to the running application.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandRejected`] when the loader reports an
    /// error.
    #[instrument(skip(self), level = "info")]
    pub async fn loader_signal(
        &mut self,
        name: &str,
        arg: Option<&str>,
    ) -> Result<String, TransportError> {
        self.begin()?;
        let result = self
            .checked_command(&DeviceCommand::LoaderSignal { name, arg })
            .await;
        self.finish(result)
    }

    /// Opens `app`, closing whatever application is running first.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandRejected`] when closing or opening is
    /// refused.
    #[instrument(skip(self), level = "info")]
    pub async fn launch_app(
        &mut self,
        app: &str,
        file: Option<&str>,
    ) -> Result<String, TransportError> {
        self.begin()?;
        let result = self.launch_app_inner(app, file).await;
        self.finish(result)
    }

    async fn open_and_synchronise(&mut self) -> Result<(), TransportError> {
        self.teardown();
        self.state = SessionState::Connecting;
        let streams = self.port.open().await?;

        let buffer = ReceiveBuffer::new();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(drain(streams.reader, buffer.clone(), cancel.clone()));
        self.link = Some(Link {
            writer: streams.writer,
            buffer,
            _drain: DrainTask { cancel, handle },
        });

        self.state = SessionState::Synchronizing;
        sleep(self.config.settle_delay).await;
        self.link()?.buffer.clear();

        let attempts = self.config.handshake_attempts;
        for attempt in 1..=attempts {
            self.send(&[INTERRUPT]).await?;
            sleep(INTERRUPT_SETTLE).await;
            self.send(LINE_END.as_bytes()).await?;

            match self
                .wait_for(&self.config.prompt, self.config.handshake_timeout)
                .await
            {
                Ok(_banner) => {
                    debug!(attempt, "command prompt reached");
                    return Ok(());
                }
                Err(TransportError::ReadTimeout { .. }) => {
                    warn!(attempt, attempts, "no prompt from device, retrying");
                    if attempt < attempts {
                        sleep(self.config.retry_delay).await;
                    }
                }
                Err(error) => return Err(error),
            }
        }

        Err(TransportError::HandshakeFailed { attempts })
    }

    async fn write_file_inner(&mut self, path: &str, content: &str) -> Result<(), TransportError> {
        self.link()?.buffer.clear();
        if let Some(parent) = parent_directory(path) {
            let response = self.command(&DeviceCommand::StorageMkdir(parent)).await?;
            trace!(parent, %response, "parent directory ensured");
        }

        self.send_line(&DeviceCommand::StorageWrite(path).to_string())
            .await?;
        self.wait_for(WRITE_READY_MARKER, self.config.write_ready_timeout)
            .await?;

        self.send(&text_to_bytes(content)).await?;
        sleep(CONTENT_SETTLE).await;
        self.send(LINE_END.as_bytes()).await?;
        sleep(NEWLINE_SETTLE).await;
        self.send(&[INTERRUPT]).await?;
        sleep(CONTENT_SETTLE).await;
        self.wait_for(&self.config.prompt, self.config.command_timeout)
            .await?;
        sleep(PROMPT_SETTLE).await;
        self.link()?.buffer.clear();

        let response = self.command(&DeviceCommand::StorageStat(path)).await?;
        if reports_error(&response) || response.to_ascii_lowercase().contains("not found") {
            return Err(TransportError::WriteVerificationFailed {
                path: path.to_string(),
                response,
            });
        }
        debug!(path, %response, "file written and verified");
        Ok(())
    }

    async fn list_directory_inner(
        &mut self,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, TransportError> {
        let response = self
            .checked_command(&DeviceCommand::StorageList(path))
            .await?;
        let entries = parse_listing(path, &response);
        debug!(entry_count = entries.len(), "directory listed");
        Ok(entries)
    }

    async fn launch_app_inner(
        &mut self,
        app: &str,
        file: Option<&str>,
    ) -> Result<String, TransportError> {
        let info = self.command(&DeviceCommand::LoaderInfo).await?;
        if app_is_running(&info) {
            debug!(%info, "closing running application");
            self.checked_command(&DeviceCommand::LoaderClose).await?;
        }
        self.checked_command(&DeviceCommand::LoaderOpen { app, file })
            .await
    }

    /// Sends a command, consumes its echo and returns the response body.
    async fn command(&mut self, command: &DeviceCommand<'_>) -> Result<String, TransportError> {
        let line = command.to_string();
        self.send_line(&line).await?;
        self.wait_for(&line, self.config.command_timeout).await?;
        let response = self
            .wait_for(&self.config.prompt, self.config.command_timeout)
            .await?;
        trace!(command = %line, %response, "command completed");
        Ok(response)
    }

    async fn checked_command(
        &mut self,
        command: &DeviceCommand<'_>,
    ) -> Result<String, TransportError> {
        let response = self.command(command).await?;
        if reports_error(&response) {
            return Err(TransportError::CommandRejected {
                command: command.to_string(),
                response,
            });
        }
        Ok(response)
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        debug!(command = line, "sending command");
        self.send(&text_to_bytes(&format!("{line}{LINE_END}"))).await
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let pacing = self.config.write_pacing;
        let link = self.link()?;
        link.writer.write_all(bytes).await?;
        link.writer.flush().await?;
        sleep(pacing).await;
        Ok(())
    }

    async fn wait_for(&self, marker: &str, timeout: Duration) -> Result<String, TransportError> {
        let link = self.link.as_ref().ok_or(TransportError::NotConnected)?;
        link.buffer.wait_for(marker, timeout).await
    }

    fn begin(&mut self) -> Result<(), TransportError> {
        if self.state != SessionState::Ready || self.link.is_none() {
            return Err(TransportError::NotConnected);
        }
        self.state = SessionState::Busy;
        Ok(())
    }

    fn finish<T>(&mut self, result: Result<T, TransportError>) -> Result<T, TransportError> {
        match &result {
            Ok(_value) => self.state = SessionState::Ready,
            Err(error) => {
                warn!(%error, "device operation failed, disconnecting");
                self.teardown();
            }
        }
        result
    }

    fn link(&mut self) -> Result<&mut Link, TransportError> {
        self.link.as_mut().ok_or(TransportError::NotConnected)
    }

    fn teardown(&mut self) {
        self.link = None;
        self.state = SessionState::Disconnected;
    }
}

async fn drain(mut reader: BoxedReader, buffer: ReceiveBuffer, cancel: CancellationToken) {
    let mut chunk = [0u8; DRAIN_CHUNK_LEN];
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                buffer.close("session closed");
                break;
            }
            read = reader.read(&mut chunk) => match read {
                Ok(0) => {
                    buffer.close("device closed the stream");
                    break;
                }
                Ok(len) => buffer.append(&chunk[..len]),
                Err(error) => {
                    warn!(%error, "device read failed");
                    buffer.close(error.to_string());
                    break;
                }
            },
        }
    }
}

fn reports_error(response: &str) -> bool {
    response.to_ascii_lowercase().contains("error")
}

fn app_is_running(info: &str) -> bool {
    let info = info.to_ascii_lowercase();
    info.contains("running") && !info.contains("no application")
}

fn parse_app_names(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.ends_with(':') && !line.contains('>'))
        .map(str::to_string)
        .collect()
}
