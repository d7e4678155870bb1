use std::io;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::instrument;

use crate::cli::OutputFormat;
use crate::cli::ui::Painter;
use crate::hw::TransportSession;
use crate::terminal::TerminalClient;

/// JSON result emitted by a `loader` action.
#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum LoaderResult {
    List { apps: Vec<String> },
    Info { response: String },
    Open { app: String, response: String },
    Close { response: String },
    Signal { name: String, response: String },
    Launch { app: String, response: String },
}

/// Arguments for the `loader` command.
#[derive(Debug, Args)]
pub struct LoaderArgs {
    #[command(subcommand)]
    action: LoaderAction,
}

impl LoaderArgs {
    /// Creates loader arguments for one action.
    ///
    /// ```
    /// use ntag::{LoaderAction, LoaderArgs};
    ///
    /// let args = LoaderArgs::new(LoaderAction::Info);
    /// assert!(matches!(args.action(), LoaderAction::Info));
    /// ```
    #[must_use]
    pub fn new(action: LoaderAction) -> Self {
        Self { action }
    }

    /// Returns the requested action.
    #[must_use]
    pub fn action(&self) -> &LoaderAction {
        &self.action
    }
}

/// Action performed by the `loader` command.
#[derive(Debug, Subcommand)]
pub enum LoaderAction {
    /// List the applications the loader can start.
    List,
    /// Show which application is running.
    Info,
    /// Start an application, optionally with a file.
    Open {
        /// Application name, e.g. `NFC`.
        app: String,
        /// File passed to the application.
        file: Option<String>,
    },
    /// Close the running application.
    Close,
    /// Send a named signal to the running application.
    Signal {
        /// Signal name.
        name: String,
        /// Optional signal argument.
        arg: Option<String>,
    },
    /// Close whatever is running, then start an application.
    Launch {
        /// Application name, e.g. `NFC`.
        app: String,
        /// File passed to the application.
        file: Option<String>,
    },
}

/// Executes the `loader` command.
#[instrument(skip(session, args, out, terminal_client), level = "info", fields(action = ?args.action, ?output_format))]
pub(crate) async fn run<W>(
    mut session: TransportSession,
    args: &LoaderArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    session.connect().await?;
    let command_result = run_with_session(&mut session, &args.action).await;
    session.disconnect().await;
    let result = command_result?;

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            write_pretty(out, &painter, &result)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &result)?;
            writeln!(out)?;
        }
    }

    Ok(())
}

#[instrument(skip(session), level = "debug")]
async fn run_with_session(
    session: &mut TransportSession,
    action: &LoaderAction,
) -> Result<LoaderResult> {
    let result = match action {
        LoaderAction::List => LoaderResult::List {
            apps: session.loader_list().await?,
        },
        LoaderAction::Info => LoaderResult::Info {
            response: session.loader_info().await?,
        },
        LoaderAction::Open { app, file } => LoaderResult::Open {
            app: app.clone(),
            response: session.loader_open(app, file.as_deref()).await?,
        },
        LoaderAction::Close => LoaderResult::Close {
            response: session.loader_close().await?,
        },
        LoaderAction::Signal { name, arg } => LoaderResult::Signal {
            name: name.clone(),
            response: session.loader_signal(name, arg.as_deref()).await?,
        },
        LoaderAction::Launch { app, file } => LoaderResult::Launch {
            app: app.clone(),
            response: session.launch_app(app, file.as_deref()).await?,
        },
    };
    Ok(result)
}

fn write_pretty(out: &mut impl io::Write, painter: &Painter, result: &LoaderResult) -> Result<()> {
    match result {
        LoaderResult::List { apps } => {
            writeln!(out, "{}", painter.heading("Applications"))?;
            for app in apps {
                writeln!(out, "  {app}")?;
            }
        }
        LoaderResult::Info { response } | LoaderResult::Close { response } => {
            writeln!(out, "{response}")?;
        }
        LoaderResult::Open { app, response } | LoaderResult::Launch { app, response } => {
            writeln!(out, "{} {}", painter.success("Started"), painter.value(app))?;
            if !response.is_empty() {
                writeln!(out, "{}", painter.muted(response))?;
            }
        }
        LoaderResult::Signal { name, response } => {
            writeln!(out, "{} {}", painter.success("Signalled"), painter.value(name))?;
            if !response.is_empty() {
                writeln!(out, "{}", painter.muted(response))?;
            }
        }
    }
    Ok(())
}
