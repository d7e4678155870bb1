pub(crate) mod command;
pub(crate) mod generate;
pub(crate) mod loader;
pub(crate) mod storage;
pub(crate) mod ui;
pub(crate) mod upload;

pub use self::command::{Args, Command, FakeArgs, LogLevel, OutputFormat};
pub use self::generate::{GenerateArgs, PayloadArgs};
pub use self::loader::{LoaderAction, LoaderArgs};
pub use self::storage::{StorageAction, StorageArgs};
pub use self::upload::UploadArgs;
