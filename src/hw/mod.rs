mod commands;
mod fake_backend;
pub(crate) mod model;
mod port;
mod receive_buffer;
mod session;

pub use self::fake_backend::{FakeDeviceConfig, FakeDevicePort, FakeFile};
pub use self::model::{DirectoryEntry, EntryKind, FileType};
pub use self::port::{BoxedReader, BoxedWriter, CharDevicePort, DevicePort, PortStreams};
pub use self::session::{PROMPT_MARKER, SessionConfig, SessionState, TransportSession};
