use std::borrow::Cow;

use super::wifi::WifiCredential;
use crate::error::TagImageError;

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_SR: u8 = 0x10;
const SHORT_RECORD_MAX_PAYLOAD_LEN: usize = 0xFF;
/// Longest record type the one-byte TYPE_LENGTH field can declare.
pub const MAX_RECORD_TYPE_LEN: usize = 0xFF;

const TEXT_STATUS_UTF8: u8 = 0x02;
const TEXT_LANGUAGE: &[u8; 2] = b"en";

/// Record type of the Android application record.
pub const ANDROID_APP_TYPE: &str = "android.com:pkg";

/// MIME type used for contact cards.
pub const VCARD_MIME_TYPE: &str = "text/x-vCard";

/// Well-known type carried by Wi-Fi credential records.
pub const WIFI_RECORD_TYPE: &str = "Spp";

/// Type Name Format, the low three bits of a record header.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Tnf {
    /// NFC Forum well-known type (`0x01`).
    WellKnown,
    /// RFC 2046 media type (`0x02`).
    MimeMedia,
    /// NFC Forum external type (`0x04`).
    External,
}

impl Tnf {
    /// Returns the protocol value.
    #[must_use]
    pub const fn as_raw(self) -> u8 {
        match self {
            Self::WellKnown => 0x01,
            Self::MimeMedia => 0x02,
            Self::External => 0x04,
        }
    }
}

/// One NDEF record, emitted as the only record of its message.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NdefRecord {
    /// URI record: abbreviation code plus the remainder of the URI.
    Uri { prefix_code: u8, remainder: String },
    /// UTF-8 text record in English.
    Text { text: String },
    /// Media-type record such as a vCard.
    Mime { media_type: String, body: Vec<u8> },
    /// External-type record such as an Android application record.
    External { record_type: String, payload: Vec<u8> },
    /// Wi-Fi Simple-Config credential.
    WifiCredential(WifiCredential),
}

impl NdefRecord {
    /// Creates an Android application record for a package identifier.
    #[must_use]
    pub fn android_app(package: impl Into<String>) -> Self {
        Self::External {
            record_type: ANDROID_APP_TYPE.to_string(),
            payload: package.into().into_bytes(),
        }
    }

    /// Returns the Type Name Format of the record.
    #[must_use]
    pub fn tnf(&self) -> Tnf {
        match self {
            Self::Uri { .. } | Self::Text { .. } | Self::WifiCredential(_) => Tnf::WellKnown,
            Self::Mime { .. } => Tnf::MimeMedia,
            Self::External { .. } => Tnf::External,
        }
    }

    /// Returns the record type field.
    #[must_use]
    pub fn record_type(&self) -> &[u8] {
        match self {
            Self::Uri { .. } => b"U",
            Self::Text { .. } => b"T",
            Self::Mime { media_type, .. } => media_type.as_bytes(),
            Self::External { record_type, .. } => record_type.as_bytes(),
            Self::WifiCredential(_) => WIFI_RECORD_TYPE.as_bytes(),
        }
    }

    /// Returns the payload bytes.
    #[must_use]
    pub fn payload(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Uri {
                prefix_code,
                remainder,
            } => {
                let mut payload = Vec::with_capacity(1 + remainder.len());
                payload.push(*prefix_code);
                payload.extend_from_slice(remainder.as_bytes());
                Cow::Owned(payload)
            }
            Self::Text { text } => {
                let mut payload = Vec::with_capacity(1 + TEXT_LANGUAGE.len() + text.len());
                payload.push(TEXT_STATUS_UTF8);
                payload.extend_from_slice(TEXT_LANGUAGE);
                payload.extend_from_slice(text.as_bytes());
                Cow::Owned(payload)
            }
            Self::Mime { body, .. } => Cow::Borrowed(body),
            Self::External { payload, .. } => Cow::Borrowed(payload),
            Self::WifiCredential(credential) => Cow::Owned(credential.to_payload()),
        }
    }

    /// Encodes the record header, type and payload.
    ///
    /// Payloads shorter than 256 bytes use the short-record form with a
    /// one-byte length; longer payloads clear `SR` and use a four-byte
    /// big-endian length. `MB` and `ME` are always set.
    ///
    /// Fails when the type or payload is longer than its length field can
    /// declare.
    ///
    /// ```
    /// use ntag::NdefRecord;
    ///
    /// let record = NdefRecord::Text { text: "hi".to_string() };
    /// assert_eq!(
    ///     vec![0xD1, 0x01, 0x05, b'T', 0x02, b'e', b'n', b'h', b'i'],
    ///     record.encode()?
    /// );
    /// # Ok::<(), ntag::TagImageError>(())
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>, TagImageError> {
        let record_type = self.record_type();
        let type_len =
            u8::try_from(record_type.len()).map_err(|_| TagImageError::RecordTypeTooLong {
                len: record_type.len(),
                max: MAX_RECORD_TYPE_LEN,
            })?;
        let payload = self.payload();
        let short = payload.len() <= SHORT_RECORD_MAX_PAYLOAD_LEN;

        let mut encoded = Vec::with_capacity(6 + record_type.len() + payload.len());
        let mut header = FLAG_MB | FLAG_ME | self.tnf().as_raw();
        if short {
            header |= FLAG_SR;
        }
        encoded.push(header);
        encoded.push(type_len);
        if short {
            encoded.push(payload.len() as u8);
        } else {
            let payload_len =
                u32::try_from(payload.len()).map_err(|_| TagImageError::MessageTooLong {
                    len: payload.len(),
                    max: u32::MAX as usize,
                })?;
            encoded.extend_from_slice(&payload_len.to_be_bytes());
        }
        encoded.extend_from_slice(record_type);
        encoded.extend_from_slice(&payload);
        Ok(encoded)
    }
}
