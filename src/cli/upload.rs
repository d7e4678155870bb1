use std::io;

use anyhow::Result;
use clap::Args;
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::cli::generate::PayloadArgs;
use crate::cli::ui::Painter;
use crate::handlers::TagUploadHandler;
use crate::hw::TransportSession;
use crate::terminal::TerminalClient;

/// Arguments for the `upload` command.
#[derive(Debug, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    payload: PayloadArgs,
    /// Device path to write; defaults to `/ext/nfc/<suggested name>.nfc`.
    #[arg(long)]
    destination: Option<String>,
}

impl UploadArgs {
    /// Creates `upload` arguments.
    ///
    /// ```
    /// use ntag::{PayloadArgs, PayloadKind, TagType, UploadArgs};
    ///
    /// let args = UploadArgs::new(PayloadArgs::new(TagType::Ntag215, PayloadKind::Text, "hello"))
    ///     .with_destination("/ext/nfc/hello.nfc");
    /// assert_eq!(Some("/ext/nfc/hello.nfc"), args.destination());
    /// ```
    #[must_use]
    pub fn new(payload: PayloadArgs) -> Self {
        Self {
            payload,
            destination: None,
        }
    }

    /// Returns the device path override.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Overrides the device path.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// Executes the `upload` command.
#[instrument(skip(session, args, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    mut session: TransportSession,
    args: &UploadArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let request = args.payload.to_request()?;
    let upload_result =
        TagUploadHandler::generate_and_upload(&mut session, &request, args.destination.as_deref())
            .await;
    session.disconnect().await;
    let receipt = upload_result?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(
                out,
                "{} {} ({} bytes, UID {})",
                painter.success("Uploaded"),
                painter.path(receipt.path()),
                receipt.bytes_written(),
                receipt.uid(),
            )?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &receipt)?;
            writeln!(out)?;
        }
    }

    Ok(())
}
