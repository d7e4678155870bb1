use ntag_macros::progress;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{ToolError, TransportError};
use crate::hw::{SessionState, TransportSession};
use crate::tag::{ImageRequest, TagImage, suggested_file_name};

/// Device directory the NFC application browses by default.
pub const DEFAULT_NFC_DIRECTORY: &str = "/ext/nfc";

/// Result of uploading a tag image.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct UploadReceipt {
    path: String,
    uid: String,
    bytes_written: usize,
}

impl UploadReceipt {
    /// Creates an upload receipt.
    ///
    /// ```
    /// use ntag::UploadReceipt;
    ///
    /// let receipt = UploadReceipt::new("/ext/nfc/a.nfc", "04 01 02 03 04 05 06", 1480);
    /// assert_eq!(1480, receipt.bytes_written());
    /// ```
    #[must_use]
    pub fn new(path: impl Into<String>, uid: impl Into<String>, bytes_written: usize) -> Self {
        Self {
            path: path.into(),
            uid: uid.into(),
            bytes_written,
        }
    }

    /// Returns the device path the image was written to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the UID of the uploaded image.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the number of rendered bytes sent.
    #[must_use]
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }
}

/// Generates tag images and stores them on the device.
pub struct TagUploadHandler;

impl TagUploadHandler {
    /// Returns the default device path for a request's image.
    ///
    /// ```
    /// use ntag::{ImageRequest, PayloadKind, TagUploadHandler};
    ///
    /// let request = ImageRequest::builder()
    ///     .kind(PayloadKind::Url)
    ///     .input("https://example.com")
    ///     .build();
    /// assert_eq!(
    ///     "/ext/nfc/url_https___example_com.nfc",
    ///     TagUploadHandler::default_destination(&request)
    /// );
    /// ```
    #[must_use]
    pub fn default_destination(request: &ImageRequest) -> String {
        format!(
            "{DEFAULT_NFC_DIRECTORY}/{}",
            suggested_file_name(request.kind(), request.input())
        )
    }

    /// Renders `image` and writes it to `path`, connecting first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when connecting, writing or verifying fails.
    #[progress(
        message = "Uploading tag image",
        finished = format!("{} Upload complete", "✓".green()),
    )]
    #[instrument(skip(session, image), level = "info", fields(uid = %image.uid()))]
    pub async fn upload(
        session: &mut TransportSession,
        image: &TagImage,
        path: &str,
    ) -> Result<UploadReceipt, TransportError> {
        if session.state() == SessionState::Disconnected {
            session.connect().await?;
        }
        let rendered = image.render();
        session.write_file(path, &rendered).await?;
        debug!(path, bytes = rendered.len(), "tag image uploaded");
        Ok(UploadReceipt::new(
            path,
            image.uid().to_string(),
            rendered.len(),
        ))
    }

    /// Generates an image for `request` and uploads it.
    ///
    /// The image is generated before the device is touched, so invalid input
    /// never opens a connection. `destination` defaults to
    /// [`TagUploadHandler::default_destination`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::TagImage`] when generation fails and
    /// [`ToolError::Transport`] when the upload fails.
    #[instrument(skip(session, request), level = "info", fields(kind = %request.kind()))]
    pub async fn generate_and_upload(
        session: &mut TransportSession,
        request: &ImageRequest,
        destination: Option<&str>,
    ) -> Result<UploadReceipt, ToolError> {
        let image = TagImage::generate(request)?;
        let path = destination.map_or_else(|| Self::default_destination(request), str::to_string);
        Ok(Self::upload(session, &image, &path).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::TagImageError;
    use crate::hw::{FakeDeviceConfig, FakeDevicePort, SessionConfig};
    use crate::ndef::PayloadKind;

    fn session(port: &FakeDevicePort) -> TransportSession {
        TransportSession::new(Box::new(port.clone()), SessionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn upload_connects_on_demand_and_stores_the_rendered_image() {
        let port = FakeDevicePort::new(FakeDeviceConfig::default());
        let mut session = session(&port);
        let request = ImageRequest::builder()
            .kind(PayloadKind::Text)
            .input("hello")
            .build();
        let image = TagImage::generate(&request).expect("text fits");

        let receipt = TagUploadHandler::upload(&mut session, &image, "/ext/nfc/hello.nfc")
            .await
            .expect("upload should succeed");

        assert_eq!("/ext/nfc/hello.nfc", receipt.path());
        assert_eq!(image.uid().to_string(), receipt.uid());
        assert_eq!(Some(image.render()), port.file("/ext/nfc/hello.nfc"));
        assert_eq!(SessionState::Ready, session.state());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_never_touches_the_device() {
        let port = FakeDevicePort::new(FakeDeviceConfig::default());
        let mut session = session(&port);
        let request = ImageRequest::builder()
            .kind(PayloadKind::Email)
            .input("nobody")
            .build();

        let result = TagUploadHandler::generate_and_upload(&mut session, &request, None).await;

        assert_matches!(result, Err(ToolError::TagImage(error)) if matches!(*error, TagImageError::InvalidInput { .. }));
        assert_eq!(0, port.interrupts());
        assert_eq!(SessionState::Disconnected, session.state());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_device_surfaces_transport_error() {
        let port = FakeDevicePort::new(FakeDeviceConfig::builder().stalled(true).build());
        let mut session = session(&port);
        let request = ImageRequest::builder()
            .kind(PayloadKind::Url)
            .input("https://example.com")
            .build();

        let result = TagUploadHandler::generate_and_upload(&mut session, &request, None).await;

        assert_matches!(
            result,
            Err(ToolError::Transport(error))
                if matches!(*error, TransportError::HandshakeFailed { attempts: 3 })
        );
    }
}
