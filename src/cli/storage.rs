use std::io;

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::cli::ui::{DirectoryListingView, Painter};
use crate::hw::TransportSession;
use crate::terminal::TerminalClient;

/// Arguments for the `storage` command.
#[derive(Debug, Args)]
pub struct StorageArgs {
    #[command(subcommand)]
    action: StorageAction,
}

impl StorageArgs {
    /// Creates storage arguments for one action.
    ///
    /// ```
    /// use ntag::{StorageAction, StorageArgs};
    ///
    /// let args = StorageArgs::new(StorageAction::List { path: "/ext/nfc".into() });
    /// assert!(matches!(args.action(), StorageAction::List { path } if path == "/ext/nfc"));
    /// ```
    #[must_use]
    pub fn new(action: StorageAction) -> Self {
        Self { action }
    }

    /// Returns the requested action.
    #[must_use]
    pub fn action(&self) -> &StorageAction {
        &self.action
    }
}

/// Action performed by the `storage` command.
#[derive(Debug, Subcommand)]
pub enum StorageAction {
    /// List a device directory.
    List {
        /// Absolute device path.
        #[arg(default_value = "/ext")]
        path: String,
    },
}

/// Executes the `storage` command.
#[instrument(skip(session, args, out, terminal_client), level = "info", fields(action = ?args.action, ?output_format))]
pub(crate) async fn run<W>(
    mut session: TransportSession,
    args: &StorageArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    session.connect().await?;
    let listing = match &args.action {
        StorageAction::List { path } => session.list_directory(path).await,
    };
    session.disconnect().await;
    let entries = listing?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", DirectoryListingView::new(&entries, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &entries)?;
            writeln!(out)?;
        }
    }

    Ok(())
}
