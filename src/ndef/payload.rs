use std::str::FromStr;

use serde_with::SerializeDisplay;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, IntoStaticStr};
use tracing::instrument;

use super::record::{MAX_RECORD_TYPE_LEN, NdefRecord, VCARD_MIME_TYPE};
use super::uri::{MAILTO_PREFIX, TEL_PREFIX, split_uri_prefix};
use super::wifi::{WifiAuth, WifiCredential};
use crate::error::TagImageError;

const MIN_PHONE_DIGITS: usize = 3;
const MAX_SSID_LEN: usize = 32;
const MAX_WIFI_PASSWORD_LEN: usize = 64;
const VCARD_BEGIN: &str = "BEGIN:VCARD";
const VCARD_END: &str = "END:VCARD";

/// User-facing payload kinds, each mapped onto one NDEF record encoder.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display, IntoStaticStr, SerializeDisplay,
)]
#[strum(serialize_all = "lowercase")]
pub enum PayloadKind {
    /// Web address or any other URI.
    Url,
    /// Telephone number, encoded as a `tel:` URI.
    Phone,
    /// E-mail address, encoded as a `mailto:` URI.
    Email,
    /// Plain English text.
    Text,
    /// Contact card.
    Vcard,
    /// Wi-Fi network credential.
    Wifi,
    /// Android application record.
    App,
    /// Arbitrary media type; the first input line names it.
    Mime,
}

impl FromStr for PayloadKind {
    type Err = TagImageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        PayloadKind::iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TagImageError::UnsupportedRecordKind {
                kind: value.to_string(),
            })
    }
}

impl PayloadKind {
    /// Validates `input` for this kind and builds the matching record.
    ///
    /// Validation runs fully before any record bytes exist, so a rejected
    /// input never yields a partial record.
    ///
    /// # Errors
    ///
    /// Returns [`TagImageError::InvalidInput`] when the input fails the
    /// kind-specific shape check.
    ///
    /// ```
    /// use ntag::{NdefRecord, PayloadKind};
    ///
    /// let record = PayloadKind::Phone.parse_record("tel:+1 555 0100")?;
    /// assert_eq!(
    ///     NdefRecord::Uri { prefix_code: 0x05, remainder: "+1 555 0100".to_string() },
    ///     record
    /// );
    /// # Ok::<(), ntag::TagImageError>(())
    /// ```
    #[instrument(level = "debug", skip(self, input), fields(kind = %self, input_len = input.len()))]
    pub fn parse_record(self, input: &str) -> Result<NdefRecord, TagImageError> {
        match self {
            Self::Url => parse_url(input),
            Self::Phone => parse_phone(input),
            Self::Email => parse_email(input),
            Self::Text => parse_text(input),
            Self::Vcard => parse_vcard(input),
            Self::Wifi => parse_wifi(input),
            Self::App => parse_app(input),
            Self::Mime => parse_mime(input),
        }
    }

    fn invalid(self, reason: impl Into<String>) -> TagImageError {
        TagImageError::InvalidInput {
            kind: self.into(),
            reason: reason.into(),
        }
    }
}

fn parse_url(input: &str) -> Result<NdefRecord, TagImageError> {
    let url = input.trim();
    if url.is_empty() {
        return Err(PayloadKind::Url.invalid("URL is empty"));
    }
    if url
        .chars()
        .any(|character| character.is_whitespace() || character.is_control())
    {
        return Err(PayloadKind::Url.invalid("URL must not contain whitespace"));
    }
    let (prefix_code, remainder) = split_uri_prefix(url);
    Ok(NdefRecord::Uri {
        prefix_code,
        remainder: remainder.to_string(),
    })
}

fn parse_phone(input: &str) -> Result<NdefRecord, TagImageError> {
    let number = strip_prefix_ignore_case(input.trim(), "tel:");
    let digits_and_separators = number.strip_prefix('+').unwrap_or(number);
    if !digits_and_separators
        .chars()
        .all(|character| character.is_ascii_digit() || matches!(character, ' ' | '-' | '(' | ')'))
    {
        return Err(PayloadKind::Phone.invalid(
            "phone numbers may only contain digits, spaces, '-', '(' and ')' after an optional '+'",
        ));
    }
    let digit_count = number
        .chars()
        .filter(|character| character.is_ascii_digit())
        .count();
    if digit_count < MIN_PHONE_DIGITS {
        return Err(PayloadKind::Phone.invalid(format!(
            "expected at least {MIN_PHONE_DIGITS} digits, got {digit_count}"
        )));
    }
    Ok(NdefRecord::Uri {
        prefix_code: TEL_PREFIX,
        remainder: number.to_string(),
    })
}

fn parse_email(input: &str) -> Result<NdefRecord, TagImageError> {
    let address = strip_prefix_ignore_case(input.trim(), "mailto:");
    if address.chars().any(char::is_whitespace) {
        return Err(PayloadKind::Email.invalid("address must not contain whitespace"));
    }
    let Some((local, domain)) = address.split_once('@') else {
        return Err(PayloadKind::Email.invalid("address must contain '@'"));
    };
    if local.is_empty() {
        return Err(PayloadKind::Email.invalid("local part is empty"));
    }
    let domain_is_dotted = domain
        .split_once('.')
        .is_some_and(|(host, rest)| !host.is_empty() && !rest.is_empty() && !rest.ends_with('.'));
    if domain.contains('@') || !domain_is_dotted {
        return Err(PayloadKind::Email.invalid(format!("`{domain}` is not a valid domain")));
    }
    Ok(NdefRecord::Uri {
        prefix_code: MAILTO_PREFIX,
        remainder: address.to_string(),
    })
}

fn parse_text(input: &str) -> Result<NdefRecord, TagImageError> {
    if input.trim().is_empty() {
        return Err(PayloadKind::Text.invalid("text is empty"));
    }
    Ok(NdefRecord::Text {
        text: input.to_string(),
    })
}

fn parse_vcard(input: &str) -> Result<NdefRecord, TagImageError> {
    let card = input.trim();
    let has_envelope = starts_with_ignore_case(card, VCARD_BEGIN)
        && card.len() >= VCARD_BEGIN.len() + VCARD_END.len()
        && card
            .get(card.len() - VCARD_END.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(VCARD_END));
    if !has_envelope {
        return Err(PayloadKind::Vcard.invalid(format!(
            "contact cards must start with {VCARD_BEGIN} and end with {VCARD_END}"
        )));
    }
    Ok(NdefRecord::Mime {
        media_type: VCARD_MIME_TYPE.to_string(),
        body: card.as_bytes().to_vec(),
    })
}

fn parse_mime(input: &str) -> Result<NdefRecord, TagImageError> {
    let (first_line, body) = input.split_once('\n').unwrap_or((input, ""));
    let media_type = first_line.trim();
    let well_formed = match media_type.split_once('/') {
        Some((main, sub)) => {
            !main.is_empty()
                && !sub.is_empty()
                && !sub.contains('/')
                && !media_type.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(PayloadKind::Mime.invalid(format!(
            "first line must be a `type/subtype` media type, got `{media_type}`"
        )));
    }
    if media_type.len() > MAX_RECORD_TYPE_LEN {
        return Err(PayloadKind::Mime.invalid(format!(
            "media type is {} bytes; the limit is {MAX_RECORD_TYPE_LEN}",
            media_type.len()
        )));
    }
    Ok(NdefRecord::Mime {
        media_type: media_type.to_string(),
        body: body.as_bytes().to_vec(),
    })
}

fn parse_app(input: &str) -> Result<NdefRecord, TagImageError> {
    let package = input.trim();
    let segments: Vec<&str> = package.split('.').collect();
    if segments.len() < 2 {
        return Err(PayloadKind::App.invalid("package names need at least two segments"));
    }
    if let Some(bad) = segments
        .iter()
        .find(|segment| !is_package_segment(segment))
    {
        return Err(PayloadKind::App.invalid(format!("`{bad}` is not a valid package segment")));
    }
    Ok(NdefRecord::android_app(package))
}

/// Parses `SSID:<name>;PASSWORD:<key>;AUTH:<type>` with optional QR-code
/// style `WIFI:` prefix and `;;` suffix.
///
/// A backslash escapes the next character, so `\;`, `\:` and `\\` can appear
/// inside values as in QR-code Wi-Fi strings.
fn parse_wifi(input: &str) -> Result<NdefRecord, TagImageError> {
    let credentials = strip_prefix_ignore_case(input.trim(), "WIFI:");

    let mut ssid = None;
    let mut password = None;
    let mut auth = None;
    for field in split_unescaped(credentials, ';')
        .into_iter()
        .filter(|field| !field.trim().is_empty())
    {
        let Some(separator) = find_unescaped(field, ':') else {
            return Err(PayloadKind::Wifi.invalid(format!("`{field}` is not a KEY:value pair")));
        };
        let key = unescape(&field[..separator]);
        let value = unescape(&field[separator + 1..]);
        match key.trim().to_ascii_uppercase().as_str() {
            "SSID" | "S" => ssid = Some(value),
            "PASSWORD" | "P" => password = Some(value),
            "AUTH" | "T" => auth = Some(WifiAuth::from_name(&value)),
            other => {
                return Err(PayloadKind::Wifi.invalid(format!("unknown Wi-Fi field `{other}`")));
            }
        }
    }

    let ssid = ssid
        .filter(|ssid| !ssid.is_empty())
        .ok_or_else(|| PayloadKind::Wifi.invalid("SSID is required"))?;
    if ssid.len() > MAX_SSID_LEN {
        return Err(PayloadKind::Wifi.invalid(format!(
            "SSID is {} bytes; the limit is {MAX_SSID_LEN}",
            ssid.len()
        )));
    }

    let auth = auth.unwrap_or(WifiAuth::Open);
    let password = password.unwrap_or_default();
    if auth != WifiAuth::Open && password.is_empty() {
        return Err(PayloadKind::Wifi.invalid(format!("{auth} networks need a password")));
    }
    if password.len() > MAX_WIFI_PASSWORD_LEN {
        return Err(PayloadKind::Wifi.invalid(format!(
            "password is {} bytes; the limit is {MAX_WIFI_PASSWORD_LEN}",
            password.len()
        )));
    }

    Ok(NdefRecord::WifiCredential(WifiCredential::new(
        ssid, password, auth,
    )))
}

fn find_unescaped(value: &str, separator: char) -> Option<usize> {
    let mut escaped = false;
    for (index, character) in value.char_indices() {
        if escaped {
            escaped = false;
        } else if character == '\\' {
            escaped = true;
        } else if character == separator {
            return Some(index);
        }
    }
    None
}

fn split_unescaped(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = value;
    while let Some(index) = find_unescaped(rest, separator) {
        parts.push(&rest[..index]);
        rest = &rest[index + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}

/// Drops each escaping backslash; a trailing lone backslash is kept.
fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut characters = value.chars();
    while let Some(character) = characters.next() {
        if character == '\\' {
            unescaped.push(characters.next().unwrap_or(character));
        } else {
            unescaped.push(character);
        }
    }
    unescaped
}

fn is_package_segment(segment: &str) -> bool {
    segment
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic())
        && segment
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || character == '_')
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .as_bytes()
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> &'a str {
    if starts_with_ignore_case(value, prefix) {
        &value[prefix.len()..]
    } else {
        value
    }
}
