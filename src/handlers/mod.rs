mod tag_upload;

pub use self::tag_upload::{DEFAULT_NFC_DIRECTORY, TagUploadHandler, UploadReceipt};
