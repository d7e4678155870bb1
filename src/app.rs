use std::io;
use std::path::PathBuf;

use anyhow::Result;
use tracing::instrument;

use crate::cli::{Command, FakeArgs, LogLevel, OutputFormat};
use crate::error::CliConfigError;
use crate::hw::{CharDevicePort, FakeDevicePort, SessionConfig, TransportSession};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Creates a session for a serial device node such as `/dev/ttyACM0`.
#[must_use]
pub fn serial_session(port: impl Into<PathBuf>, config: SessionConfig) -> TransportSession {
    TransportSession::new(Box::new(CharDevicePort::new(port)), config)
}

/// Creates a session backed by the in-process simulated device.
///
/// ```
/// let session = ntag::fake_session(ntag::FakeArgs::default(), ntag::SessionConfig::default());
/// assert_eq!(ntag::SessionState::Disconnected, session.state());
/// ```
#[must_use]
pub fn fake_session(fake_args: FakeArgs, config: SessionConfig) -> TransportSession {
    TransportSession::new(
        Box::new(FakeDevicePort::new(fake_args.into_device_config())),
        config,
    )
}

/// Runs the CLI command using process terminal detection.
///
/// # Errors
///
/// Returns an error if tracing initialisation, the command, or output
/// writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    session: Option<TransportSession>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, session, output_format, None).await
}

/// Runs the CLI command using process terminal detection and a log level.
///
/// # Errors
///
/// Returns an error if tracing initialisation, the command, or output
/// writing fails.
pub async fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    session: Option<TransportSession>,
    output_format: OutputFormat,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(
        command,
        out,
        &SystemTerminalClient,
        session,
        output_format,
        log_level,
    )
    .await
}

/// Runs the CLI command with an injected terminal client.
///
/// # Errors
///
/// Returns an error if tracing initialisation, the command, or output
/// writing fails.
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    session: Option<TransportSession>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(command, out, terminal_client, session, output_format, None)
        .await
}

/// Runs the CLI command with injected clients and explicit telemetry settings.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct FakeTerminal;
/// impl ntag::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = ntag::Args::try_parse_from([
///     "ntag",
///     "--log-level",
///     "trace",
///     "--fake",
///     "loader",
///     "list",
/// ])?;
/// let log_level = args.log_level();
/// let (command, session) = args.into_command_and_session();
/// let mut out = Vec::new();
/// ntag::run_with_clients_and_log_level(
///     command,
///     &mut out,
///     &FakeTerminal,
///     session,
///     ntag::OutputFormat::Json,
///     log_level,
/// ).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, a device command needs a
/// session and none was given, device interaction fails, or output writing
/// fails.
#[instrument(
    skip(out, terminal_client, session),
    level = "info",
    fields(command = %command_name(&command), ?log_level)
)]
pub async fn run_with_clients_and_log_level<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    session: Option<TransportSession>,
    output_format: OutputFormat,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "ntag",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    match command {
        Command::Generate(args) => {
            crate::cli::generate::run(&args, out, terminal_client, output_format)
        }
        Command::Upload(args) => {
            crate::cli::upload::run(
                require_session(session)?,
                &args,
                out,
                terminal_client,
                output_format,
            )
            .await
        }
        Command::Storage(args) => {
            crate::cli::storage::run(
                require_session(session)?,
                &args,
                out,
                terminal_client,
                output_format,
            )
            .await
        }
        Command::Loader(args) => {
            crate::cli::loader::run(
                require_session(session)?,
                &args,
                out,
                terminal_client,
                output_format,
            )
            .await
        }
    }
}

fn require_session(session: Option<TransportSession>) -> Result<TransportSession> {
    session.ok_or_else(|| CliConfigError::MissingPort.into())
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Generate(_args) => "generate",
        Command::Upload(_args) => "upload",
        Command::Storage(_args) => "storage",
        Command::Loader(_args) => "loader",
    }
}
