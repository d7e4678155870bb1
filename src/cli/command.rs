use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::generate::GenerateArgs;
use crate::cli::loader::LoaderArgs;
use crate::cli::storage::StorageArgs;
use crate::cli::upload::UploadArgs;
use crate::error::FixtureError;
use crate::hw::{
    CharDevicePort, DevicePort, FakeDeviceConfig, FakeDevicePort, FakeFile, SessionConfig,
    TransportSession,
};

/// Command-line options for the NTAG image tool.
#[derive(Debug, Parser)]
#[command(
    name = "ntag",
    about = "Build NTAG213/215/216 tag images and transfer them to a Flipper Zero."
)]
pub struct Args {
    /// Overrides `RUST_LOG` with a single level.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format; defaults to `pretty` on a terminal and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    output_format: Option<OutputFormat>,
    /// Serial device node of the Flipper, e.g. `/dev/ttyACM0`.
    #[arg(long, global = true, conflicts_with = "fake")]
    port: Option<PathBuf>,
    /// Uses the in-process simulated device instead of a serial port.
    #[arg(long, global = true)]
    fake: bool,
    /// Seeds a file on the fake device as `path=content`; repeatable.
    #[arg(long, global = true, requires = "fake")]
    fake_file: Vec<FakeFile>,
    /// Name of an application already running on the fake device.
    #[arg(long, global = true, requires = "fake")]
    fake_running_app: Option<String>,
    /// Makes the fake device ignore all input.
    #[arg(long, global = true, requires = "fake")]
    fake_stalled: bool,
    /// How long each handshake attempt waits for the prompt (e.g. `2s`).
    #[arg(long, global = true, value_parser = parse_duration)]
    handshake_timeout: Option<Duration>,
    /// How long a command waits for its response (e.g. `5s`).
    #[arg(long, global = true, value_parser = parse_duration)]
    command_timeout: Option<Duration>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use ntag::{Args, Command, LoaderAction, LoaderArgs};
    ///
    /// let args = Args::new(Command::Loader(LoaderArgs::new(LoaderAction::List)));
    /// assert_eq!(None, args.log_level());
    ///
    /// let (command, session) = args.into_command_and_session();
    /// assert!(matches!(command, Command::Loader(loader) if matches!(loader.action(), LoaderAction::List)));
    /// assert!(session.is_none());
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            log_level: None,
            output_format: None,
            port: None,
            fake: false,
            fake_file: Vec::new(),
            fake_running_app: None,
            fake_stalled: false,
            handshake_timeout: None,
            command_timeout: None,
            command,
        }
    }

    /// Targets a serial device node.
    #[must_use]
    pub fn with_port(mut self, port: impl Into<PathBuf>) -> Self {
        self.port = Some(port.into());
        self.fake = false;
        self
    }

    /// Enables fake device mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        let FakeArgs {
            files,
            running_app,
            stalled,
        } = fake;

        self.fake = true;
        self.port = None;
        self.fake_file = files.unwrap_or_default();
        self.fake_running_app = running_app;
        self.fake_stalled = stalled;
        self
    }

    /// Returns the requested log level override.
    #[must_use]
    pub const fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the requested output format, if one was given.
    #[must_use]
    pub const fn output_format(&self) -> Option<OutputFormat> {
        self.output_format
    }

    /// Returns the session settings derived from the timeout flags.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::builder()
            .maybe_handshake_timeout(self.handshake_timeout)
            .maybe_command_timeout(self.command_timeout)
            .build()
    }

    /// Splits parsed CLI arguments into the command and an unopened session.
    ///
    /// The session is `None` when neither `--port` nor `--fake` was given;
    /// commands that need a device report that when they run.
    ///
    /// ```
    /// use clap::Parser;
    ///
    /// let args = ntag::Args::try_parse_from(["ntag", "--fake", "loader", "list"])?;
    /// let (_command, session) = args.into_command_and_session();
    /// assert!(session.is_some());
    /// # Ok::<(), clap::Error>(())
    /// ```
    #[must_use]
    pub fn into_command_and_session(self) -> (Command, Option<TransportSession>) {
        let config = self.session_config();
        let Args {
            port,
            fake,
            fake_file,
            fake_running_app,
            fake_stalled,
            command,
            ..
        } = self;

        let device_port: Option<Box<dyn DevicePort>> = if fake {
            let fake_args = FakeArgs {
                files: Some(fake_file),
                running_app: fake_running_app,
                stalled: fake_stalled,
            };
            Some(Box::new(FakeDevicePort::new(fake_args.into_device_config())))
        } else {
            port.map(|path| Box::new(CharDevicePort::new(path)) as Box<dyn DevicePort>)
        };

        (
            command,
            device_port.map(|device_port| TransportSession::new(device_port, config)),
        )
    }
}

/// Fake device arguments for programmatic runs.
#[derive(Debug, Default, Builder)]
pub struct FakeArgs {
    #[builder(with = |records: &[&str]| -> Result<_, FixtureError> {
        records.iter().map(|record| record.parse()).collect()
    })]
    files: Option<Vec<FakeFile>>,
    #[builder(into)]
    running_app: Option<String>,
    #[builder(default)]
    stalled: bool,
}

impl FakeArgs {
    pub(crate) fn into_device_config(self) -> FakeDeviceConfig {
        let Self {
            files,
            running_app,
            stalled,
        } = self;

        FakeDeviceConfig::builder()
            .files(files.unwrap_or_default())
            .maybe_running_app(running_app)
            .stalled(stalled)
            .build()
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build a tag image and print it as a Flipper NFC file.
    Generate(GenerateArgs),
    /// Build a tag image and store it on the device.
    Upload(UploadArgs),
    /// Browse device storage.
    Storage(StorageArgs),
    /// Control device applications.
    Loader(LoaderArgs),
}

/// Log verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text and tables.
    Pretty,
    /// Pretty-printed JSON documents.
    Json,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fake_fixture_flags_require_fake_mode() {
        let result = Args::try_parse_from(["ntag", "--fake-stalled", "loader", "list"]);

        let error = result.expect_err("fake flags should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn port_and_fake_conflict() {
        let result =
            Args::try_parse_from(["ntag", "--port", "/dev/ttyACM0", "--fake", "loader", "list"]);

        let error = result.expect_err("--port and --fake should conflict");
        assert_eq!(ErrorKind::ArgumentConflict, error.kind());
    }

    #[test]
    fn malformed_fake_file_fails_parsing() {
        let result = Args::try_parse_from(["ntag", "--fake", "--fake-file", "nope", "loader", "list"]);

        let error = result.expect_err("fixture without `=` should fail");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }

    #[test]
    fn timeouts_flow_into_session_config() {
        let args = Args::try_parse_from([
            "ntag",
            "--fake",
            "--handshake-timeout",
            "250ms",
            "--command-timeout",
            "1s",
            "loader",
            "info",
        ])
        .expect("valid timeouts should parse");

        let config = args.session_config();
        assert_eq!(Duration::from_millis(250), config.handshake_timeout());
        assert_eq!(Duration::from_secs(1), config.command_timeout());
        assert_eq!(3, config.handshake_attempts());
    }

    #[test]
    fn no_device_flags_yield_no_session() {
        let args = Args::try_parse_from(["ntag", "loader", "list"])
            .expect("device flags are optional at parse time");

        let (command, session) = args.into_command_and_session();
        assert_matches!(command, Command::Loader(_));
        assert!(session.is_none());
    }

    #[test]
    fn fake_args_builder_rejects_relative_paths() {
        let result = FakeArgs::builder().files(&["nfc/a.nfc=x"]);
        assert_matches!(
            result.err(),
            Some(FixtureError::RelativePath { path }) if path == "nfc/a.nfc"
        );
    }
}
