use derive_more::Display;

/// Interrupt byte (Ctrl+C) that aborts input and returns to the prompt.
pub(crate) const INTERRUPT: u8 = 0x03;

/// Line terminator the device CLI expects after every command.
pub(crate) const LINE_END: &str = "\r\n";

/// Banner the device prints once `storage write` is ready for content.
pub(crate) const WRITE_READY_MARKER: &str =
    "Just write your text data. New line by Ctrl+Enter, exit by Ctrl+C.";

/// Command lines understood by the device CLI.
#[derive(Debug, Clone, Eq, PartialEq, Display)]
pub(crate) enum DeviceCommand<'a> {
    #[display("storage mkdir {_0}")]
    StorageMkdir(&'a str),
    #[display("storage write {_0}")]
    StorageWrite(&'a str),
    #[display("storage stat {_0}")]
    StorageStat(&'a str),
    #[display("storage list {_0}")]
    StorageList(&'a str),
    #[display("loader list")]
    LoaderList,
    #[display("loader info")]
    LoaderInfo,
    #[display("loader close")]
    LoaderClose,
    #[display("loader open \"{app}\"{}", file.map(|file| format!(" \"{file}\"")).unwrap_or_default())]
    LoaderOpen { app: &'a str, file: Option<&'a str> },
    #[display("loader signal {name}{}", arg.map(|arg| format!(" {arg}")).unwrap_or_default())]
    LoaderSignal { name: &'a str, arg: Option<&'a str> },
}
