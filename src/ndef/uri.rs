use std::sync::LazyLock;

/// Code used when no abbreviation applies and the URI is carried verbatim.
pub const NO_PREFIX: u8 = 0x00;

/// `tel:` abbreviation code.
pub const TEL_PREFIX: u8 = 0x05;

/// `mailto:` abbreviation code.
pub const MAILTO_PREFIX: u8 = 0x06;

/// NFC Forum URI record abbreviation table.
///
/// Schemes outside it, such as `geo:` and `sms:`, are stored verbatim
/// under code `0x00`.
const URI_PREFIXES: [(&str, u8); 35] = [
    ("http://www.", 0x01),
    ("https://www.", 0x02),
    ("http://", 0x03),
    ("https://", 0x04),
    ("tel:", TEL_PREFIX),
    ("mailto:", MAILTO_PREFIX),
    ("ftp://anonymous:anonymous@", 0x07),
    ("ftp://ftp.", 0x08),
    ("ftps://", 0x09),
    ("sftp://", 0x0A),
    ("smb://", 0x0B),
    ("nfs://", 0x0C),
    ("ftp://", 0x0D),
    ("dav://", 0x0E),
    ("news:", 0x0F),
    ("telnet://", 0x10),
    ("imap:", 0x11),
    ("rtsp://", 0x12),
    ("urn:", 0x13),
    ("pop:", 0x14),
    ("sip:", 0x15),
    ("sips:", 0x16),
    ("tftp:", 0x17),
    ("btspp://", 0x18),
    ("btl2cap://", 0x19),
    ("btgoep://", 0x1A),
    ("tcpobex://", 0x1B),
    ("irdaobex://", 0x1C),
    ("file://", 0x1D),
    ("urn:epc:id:", 0x1E),
    ("urn:epc:tag:", 0x1F),
    ("urn:epc:pat:", 0x20),
    ("urn:epc:raw:", 0x21),
    ("urn:epc:", 0x22),
    ("urn:nfc:", 0x23),
];

/// Prefix table ordered longest first so the most specific prefix wins.
static PREFIXES_BY_LENGTH: LazyLock<Vec<(&'static str, u8)>> = LazyLock::new(|| {
    let mut prefixes = URI_PREFIXES.to_vec();
    prefixes.sort_by(|left, right| right.0.len().cmp(&left.0.len()));
    prefixes
});

/// Splits a URI into its abbreviation code and the remaining text.
///
/// Matching ignores ASCII case. Unknown schemes return [`NO_PREFIX`] with the
/// full input.
///
/// ```
/// assert_eq!((0x04, "example.com"), ntag::split_uri_prefix("https://example.com"));
/// assert_eq!((0x02, "example.com"), ntag::split_uri_prefix("HTTPS://WWW.example.com"));
/// assert_eq!((0x00, "geo:52.1,4.3"), ntag::split_uri_prefix("geo:52.1,4.3"));
/// ```
#[must_use]
pub fn split_uri_prefix(uri: &str) -> (u8, &str) {
    PREFIXES_BY_LENGTH
        .iter()
        .find(|(prefix, _code)| starts_with_ignore_case(uri, prefix))
        .map_or((NO_PREFIX, uri), |(prefix, code)| (*code, &uri[prefix.len()..]))
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}
