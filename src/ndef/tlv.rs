use tracing::trace;

use crate::error::TagImageError;

/// TLV tag of an NDEF message block.
pub const NDEF_MESSAGE_TAG: u8 = 0x03;

/// TLV terminator block.
pub const TERMINATOR_TAG: u8 = 0xFE;

/// Escape byte announcing a three-byte length field.
const EXTENDED_LENGTH_ESCAPE: u8 = 0xFF;

/// Largest message length a TLV length field can declare.
pub const MAX_MESSAGE_LEN: usize = 0xFFFE;

/// An NDEF message wrapped in its Type 2 TLV envelope.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TlvMessage {
    bytes: Vec<u8>,
}

impl TlvMessage {
    /// Frames encoded record bytes as `03 <len> <records> FE`.
    ///
    /// Messages shorter than 255 bytes use a one-byte length; longer ones use
    /// `FF` followed by a big-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`TagImageError::MessageTooLong`] when the records exceed the
    /// largest declarable length.
    ///
    /// ```
    /// let framed = ntag::TlvMessage::frame(&[0xD1, 0x01, 0x00, b'T'])?;
    /// assert_eq!(&[0x03, 0x04, 0xD1, 0x01, 0x00, b'T', 0xFE], framed.as_bytes());
    /// # Ok::<(), ntag::TagImageError>(())
    /// ```
    pub fn frame(records: &[u8]) -> Result<Self, TagImageError> {
        let len = records.len();
        if len > MAX_MESSAGE_LEN {
            return Err(TagImageError::MessageTooLong {
                len,
                max: MAX_MESSAGE_LEN,
            });
        }

        let mut bytes = Vec::with_capacity(len + 5);
        bytes.push(NDEF_MESSAGE_TAG);
        match u8::try_from(len) {
            Ok(short) if short < EXTENDED_LENGTH_ESCAPE => bytes.push(short),
            _extended => {
                bytes.push(EXTENDED_LENGTH_ESCAPE);
                let extended = u16::try_from(len).unwrap_or(u16::MAX);
                bytes.extend_from_slice(&extended.to_be_bytes());
            }
        }
        bytes.extend_from_slice(records);
        bytes.push(TERMINATOR_TAG);

        trace!(record_len = len, framed_len = bytes.len(), "framed NDEF message");
        Ok(Self { bytes })
    }

    /// Returns the framed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the framed length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; a framed message carries at least its tag and terminator.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the message and returns its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    /// Reads the envelope back and returns the enclosed record bytes.
    fn unframe(bytes: &[u8]) -> &[u8] {
        assert_eq!(NDEF_MESSAGE_TAG, bytes[0]);
        let (len, start) = if bytes[1] == EXTENDED_LENGTH_ESCAPE {
            (usize::from(u16::from_be_bytes([bytes[2], bytes[3]])), 4)
        } else {
            (usize::from(bytes[1]), 2)
        };
        assert_eq!(TERMINATOR_TAG, bytes[start + len]);
        assert_eq!(start + len + 1, bytes.len());
        &bytes[start..start + len]
    }

    #[rstest]
    #[case::empty(0, 2)]
    #[case::largest_short(254, 2)]
    #[case::smallest_extended(255, 4)]
    #[case::extended(256, 4)]
    #[case::largest(MAX_MESSAGE_LEN, 4)]
    fn frame_recovers_records_across_length_forms(
        #[case] len: usize,
        #[case] header_len: usize,
    ) {
        let records: Vec<u8> = (0..len).map(|index| (index % 251) as u8).collect();
        let framed = TlvMessage::frame(&records).expect("records should fit");

        assert_eq!(header_len + len + 1, framed.len());
        assert_eq!(records.as_slice(), unframe(framed.as_bytes()));
    }

    #[test]
    fn extended_length_is_big_endian() {
        let framed = TlvMessage::frame(&[0u8; 0x0123]).expect("records should fit");
        assert_eq!([0x03, 0xFF, 0x01, 0x23], framed.as_bytes()[..4]);
    }

    #[test]
    fn frame_rejects_undeclarable_lengths() {
        assert_matches!(
            TlvMessage::frame(&vec![0u8; MAX_MESSAGE_LEN + 1]),
            Err(TagImageError::MessageTooLong { len, max: MAX_MESSAGE_LEN })
                if len == MAX_MESSAGE_LEN + 1
        );
    }
}
