use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{Instant, timeout_at};
use tracing::trace;

use crate::error::TransportError;
use crate::utils::bytes_to_text;

#[derive(Debug, Default)]
struct BufferState {
    bytes: Vec<u8>,
    closed: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<BufferState>,
    changed: Notify,
}

/// Bytes received from the device, shared between the drain task and the
/// command side of a session.
///
/// The drain task only appends; readers only consume a prefix up to and
/// including a marker. Every append or close wakes pending readers.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReceiveBuffer {
    shared: Arc<Shared>,
}

impl ReceiveBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes and wakes any pending reader.
    pub(crate) fn append(&self, bytes: &[u8]) {
        let buffered = {
            let mut state = self.lock();
            state.bytes.extend_from_slice(bytes);
            state.bytes.len()
        };
        trace!(received = bytes.len(), buffered, "device bytes buffered");
        self.shared.changed.notify_waiters();
    }

    /// Marks the inbound stream as finished so waiting readers fail fast.
    pub(crate) fn close(&self, reason: impl Into<String>) {
        self.lock().closed.get_or_insert_with(|| reason.into());
        self.shared.changed.notify_waiters();
    }

    /// Discards everything buffered so far.
    pub(crate) fn clear(&self) {
        self.lock().bytes.clear();
    }

    /// Returns the number of unread bytes.
    pub(crate) fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    /// Waits until `marker` appears, returning the trimmed text before it.
    ///
    /// The marker itself is consumed along with everything preceding it. On
    /// timeout the buffer is left untouched.
    pub(crate) async fn wait_for(
        &self,
        marker: &str,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            let changed = self.shared.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if let Some(text) = self.take_until(marker)? {
                return Ok(text);
            }

            if timeout_at(deadline, changed).await.is_err() {
                return Err(TransportError::ReadTimeout {
                    marker: marker.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }
    }

    fn take_until(&self, marker: &str) -> Result<Option<String>, TransportError> {
        let mut state = self.lock();
        if let Some(position) = find_marker(&state.bytes, marker.as_bytes()) {
            let consumed: Vec<u8> = state.bytes.drain(..position + marker.len()).collect();
            let text = bytes_to_text(&consumed[..position]).trim().to_string();
            trace!(marker, consumed = consumed.len(), "marker found");
            return Ok(Some(text));
        }
        match &state.closed {
            Some(reason) => Err(TransportError::StreamClosed {
                reason: reason.clone(),
            }),
            None => Ok(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn find_marker(haystack: &[u8], marker: &[u8]) -> Option<usize> {
    if marker.is_empty() {
        return Some(0);
    }
    haystack
        .windows(marker.len())
        .position(|window| window == marker)
}
