use std::fmt;

use super::image::TagImage;
use crate::ndef::PayloadKind;
use crate::utils::{format_hex, sanitised_file_stem};

/// File extension used by the Flipper NFC application.
pub const NFC_FILE_EXTENSION: &str = "nfc";

const FILE_FORMAT_VERSION: u8 = 4;
const DATA_FORMAT_VERSION: u8 = 2;
const ATQA: [u8; 2] = [0x00, 0x44];
const SAK: u8 = 0x00;
const SIGNATURE_PLACEHOLDER: [u8; 32] = [0x00; 32];
const COUNTERS: usize = 3;

/// Renders a [`TagImage`] as a Flipper NFC device file.
///
/// Signature, counters and tearing flags are fixed placeholders.
pub struct NfcDeviceFile<'a> {
    image: &'a TagImage,
}

impl<'a> NfcDeviceFile<'a> {
    /// Wraps an image for rendering.
    #[must_use]
    pub const fn new(image: &'a TagImage) -> Self {
        Self { image }
    }
}

impl fmt::Display for NfcDeviceFile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let profile = self.image.profile();
        let page_count = self.image.pages().len();

        writeln!(f, "Filetype: Flipper NFC device")?;
        writeln!(f, "Version: {FILE_FORMAT_VERSION}")?;
        writeln!(
            f,
            "# Device type can be ISO14443-3A, ISO14443-3B, ISO14443-4A, ISO14443-4B, ISO15693-3, FeliCa, NTAG/Ultralight, Mifare Classic, Mifare Plus, Mifare DESFire, SLIX, ST25TB, EMV"
        )?;
        writeln!(f, "Device type: NTAG/Ultralight")?;
        writeln!(f, "# UID is common for all formats")?;
        writeln!(f, "UID: {}", self.image.uid())?;
        writeln!(f, "# ISO14443-3A specific data")?;
        writeln!(f, "ATQA: {}", format_hex(&ATQA))?;
        writeln!(f, "SAK: {}", format_hex(&[SAK]))?;
        writeln!(f, "# NTAG/Ultralight specific data")?;
        writeln!(f, "Data format version: {DATA_FORMAT_VERSION}")?;
        writeln!(f, "NTAG/Ultralight type: {}", profile.tag_type())?;
        writeln!(f, "Signature: {}", format_hex(&SIGNATURE_PLACEHOLDER))?;
        writeln!(f, "Mifare version: {}", format_hex(&profile.mifare_version()))?;
        for counter in 0..COUNTERS {
            writeln!(f, "Counter {counter}: 0")?;
            writeln!(f, "Tearing {counter}: 00")?;
        }
        writeln!(f, "Pages total: {page_count}")?;
        writeln!(f, "Pages read: {page_count}")?;
        for (index, page) in self.image.pages().iter().enumerate() {
            writeln!(f, "Page {index}: {}", format_hex(page))?;
        }
        writeln!(f, "Failed authentication attempts: 0")
    }
}

/// Suggests a file name such as `url_https___example_com.nfc` for a payload.
///
/// ```
/// use ntag::{PayloadKind, suggested_file_name};
///
/// assert_eq!("url_https___example_com.nfc", suggested_file_name(PayloadKind::Url, "https://example.com"));
/// ```
#[must_use]
pub fn suggested_file_name(kind: PayloadKind, input: &str) -> String {
    let stem = sanitised_file_stem(&kind.to_string(), input.trim());
    format!("{stem}.{NFC_FILE_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tag::{DeviceProfile, TagImageBuilder, TagType, TagUid};

    fn blank_ntag213() -> TagImage {
        let uid = TagUid::from_bytes([0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66]).expect("NXP UID");
        let mut builder = TagImageBuilder::new(DeviceProfile::for_type(TagType::Ntag213), uid);
        builder.stamp_end_pages();
        builder.finish()
    }

    #[test]
    fn header_matches_flipper_format() {
        let rendered = blank_ntag213().render();
        let header: Vec<&str> = rendered.lines().take(22).collect();

        insta::assert_snapshot!(header.join("\n"), @r"
        Filetype: Flipper NFC device
        Version: 4
        # Device type can be ISO14443-3A, ISO14443-3B, ISO14443-4A, ISO14443-4B, ISO15693-3, FeliCa, NTAG/Ultralight, Mifare Classic, Mifare Plus, Mifare DESFire, SLIX, ST25TB, EMV
        Device type: NTAG/Ultralight
        # UID is common for all formats
        UID: 04 11 22 33 44 55 66
        # ISO14443-3A specific data
        ATQA: 00 44
        SAK: 00
        # NTAG/Ultralight specific data
        Data format version: 2
        NTAG/Ultralight type: NTAG213
        Signature: 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
        Mifare version: 00 04 04 02 01 00 0F 03
        Counter 0: 0
        Tearing 0: 00
        Counter 1: 0
        Tearing 1: 00
        Counter 2: 0
        Tearing 2: 00
        Pages total: 45
        Pages read: 45
        ");
    }

    #[test]
    fn pages_follow_header_and_end_with_auth_line() {
        let rendered = blank_ntag213().render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!("Page 0: 04 11 22 37", lines[22]);
        assert_eq!("Page 3: E1 10 12 00", lines[25]);
        assert_eq!("Page 40: 00 00 00 BD", lines[62]);
        assert_eq!("Page 44: 00 00 00 00", lines[66]);
        assert_eq!(Some(&"Failed authentication attempts: 0"), lines.last());
        assert_eq!(45, lines.iter().filter(|line| line.starts_with("Page ")).count());
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn suggested_file_name_is_truncated_before_extension() {
        let name = suggested_file_name(PayloadKind::Text, &"hello world ".repeat(10));
        assert_eq!(54, name.len());
        assert!(name.starts_with("text_hello_world_"));
        assert!(name.ends_with(".nfc"));
    }
}
