mod app;
mod cli;
mod error;
mod handlers;
mod hw;
mod ndef;
mod tag;
mod telemetry;
mod terminal;
mod utils;

pub use app::{
    fake_session, run, run_with_clients, run_with_clients_and_log_level, run_with_log_level,
    serial_session,
};
pub use cli::{
    Args, Command, FakeArgs, GenerateArgs, LoaderAction, LoaderArgs, LogLevel, OutputFormat,
    PayloadArgs, StorageAction, StorageArgs, UploadArgs,
};
pub use error::{FixtureError, TagImageError, ToolError, TransportError};
pub use handlers::{DEFAULT_NFC_DIRECTORY, TagUploadHandler, UploadReceipt};
pub use hw::{
    BoxedReader, BoxedWriter, CharDevicePort, DevicePort, DirectoryEntry, EntryKind,
    FakeDeviceConfig, FakeDevicePort, FakeFile, FileType, PROMPT_MARKER, PortStreams,
    SessionConfig, SessionState, TransportSession,
};
pub use ndef::{
    ANDROID_APP_TYPE, MAX_MESSAGE_LEN, NdefRecord, PayloadKind, TlvMessage, Tnf,
    VCARD_MIME_TYPE, WIFI_RECORD_TYPE, WifiAuth, WifiCredential, split_uri_prefix,
};
pub use tag::{
    DeviceProfile, FIRST_DATA_PAGE, ImageRequest, NFC_FILE_EXTENSION, NXP_MANUFACTURER_CODE,
    NfcDeviceFile, PAGE_SIZE, Page, TagImage, TagImageBuilder, TagType, TagUid,
    suggested_file_name,
};
pub use terminal::TerminalClient;
