use derive_more::From;
use thiserror::Error;

/// Errors returned while building a tag image.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum TagImageError {
    /// The payload failed its kind-specific shape check.
    #[error("invalid {kind} payload: {reason}")]
    InvalidInput { kind: &'static str, reason: String },
    /// The device name is not one of the supported NTAG types.
    #[error("unknown device type `{name}`; expected one of NTAG213, NTAG215, NTAG216")]
    UnknownDeviceType { name: String },
    /// The framed NDEF message does not fit in the tag data pages.
    #[error("framed NDEF message needs {required} bytes but only {available} are available")]
    CapacityExceeded { required: usize, available: usize },
    /// The record kind name is not supported.
    #[error("unsupported record kind `{kind}`")]
    UnsupportedRecordKind { kind: String },
    /// A caller-supplied UID was malformed.
    #[error("invalid tag UID: {reason}")]
    InvalidUid { reason: String },
    /// The record type does not fit the one-byte TYPE_LENGTH field.
    #[error("record type of {len} bytes exceeds the maximum of {max} bytes")]
    RecordTypeTooLong { len: usize, max: usize },
    /// The NDEF message is longer than a TLV length field can declare.
    #[error("NDEF message of {len} bytes exceeds the TLV maximum of {max} bytes")]
    MessageTooLong { len: usize, max: usize },
}

/// Errors returned by the device transport session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote command prompt never appeared.
    #[error("failed to reach the device command prompt after {attempts} attempts")]
    HandshakeFailed { attempts: u32 },
    /// The expected marker did not arrive in time.
    #[error("timed out after {timeout_ms}ms waiting for `{marker}`")]
    ReadTimeout { marker: String, timeout_ms: u64 },
    /// The written file could not be confirmed on the device.
    #[error("could not verify `{path}` after writing: {response}")]
    WriteVerificationFailed { path: String, response: String },
    /// The remote reported an error for a command.
    #[error("device rejected `{command}`: {response}")]
    CommandRejected { command: String, response: String },
    /// An operation was attempted without an open session.
    #[error("no device session is connected")]
    NotConnected,
    /// The inbound byte stream ended or failed.
    #[error("device stream closed: {reason}")]
    StreamClosed { reason: String },
    /// The device port could not be opened.
    #[error("failed to open device port `{port}`")]
    Open {
        port: String,
        source: std::io::Error,
    },
    /// Writing to the device failed.
    #[error("device I/O failed")]
    Io(#[from] std::io::Error),
}

/// Errors returned when parsing fake device fixtures.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FixtureError {
    /// A seeded file was not written as `path=content`.
    #[error("fixture file `{record}` must be written as `path=content`")]
    InvalidFileRecord { record: String },
    /// A seeded file path was not absolute.
    #[error("fixture path `{path}` must start with `/`")]
    RelativePath { path: String },
}

/// Errors returned when validating runtime session options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("either --port or --fake is required for device commands")]
    MissingPort,
    #[error("provide the payload either inline or with --input-file, not both")]
    ConflictingInput,
    #[error("a payload is required, inline or with --input-file")]
    MissingInput,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ToolError {
    #[error(transparent)]
    #[from(TagImageError, Box<TagImageError>)]
    TagImage(Box<TagImageError>),
    #[error(transparent)]
    #[from(TransportError, Box<TransportError>)]
    Transport(Box<TransportError>),
}
