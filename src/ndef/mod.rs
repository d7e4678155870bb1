//! NDEF record construction and Type 2 TLV framing.

mod payload;
mod record;
mod tlv;
mod uri;
mod wifi;

pub use payload::PayloadKind;
pub use record::{ANDROID_APP_TYPE, NdefRecord, Tnf, VCARD_MIME_TYPE, WIFI_RECORD_TYPE};
pub use tlv::{MAX_MESSAGE_LEN, TlvMessage};
pub use uri::split_uri_prefix;
pub use wifi::{WifiAuth, WifiCredential};
