const MAX_FILE_STEM_LEN: usize = 50;

/// Formats bytes as uppercase hexadecimal pairs separated by spaces.
pub(crate) fn format_hex(bytes: &[u8]) -> String {
    let mut rendered = String::with_capacity(bytes.len().saturating_mul(3));
    for (index, value) in bytes.iter().enumerate() {
        if index > 0 {
            rendered.push(' ');
        }
        rendered.push(nibble_to_hex(value >> 4));
        rendered.push(nibble_to_hex(value & 0x0F));
    }
    rendered
}

/// Parses hexadecimal text into bytes, ignoring spaces, `:` and `-` separators.
pub(crate) fn parse_hex(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let compact: String = value
        .chars()
        .filter(|character| !matches!(character, ' ' | ':' | '-'))
        .collect();
    hex::decode(compact)
}

/// Encodes text as UTF-8 bytes.
pub(crate) fn text_to_bytes(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Decodes device output, replacing invalid UTF-8 sequences.
pub(crate) fn bytes_to_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Builds a file-name stem from a prefix and free-form input.
///
/// Non-alphanumeric characters become `_`, the result is lowercase and
/// truncated to 50 characters.
pub(crate) fn sanitised_file_stem(prefix: &str, input: &str) -> String {
    let sanitised: String = input
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() {
                character.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{prefix}_{sanitised}")
        .chars()
        .take(MAX_FILE_STEM_LEN)
        .collect()
}

fn nibble_to_hex(value: u8) -> char {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    HEX[usize::from(value & 0x0F)] as char
}
