use std::fmt;
use std::str::FromStr;

use rand::RngCore;

use crate::error::TagImageError;
use crate::utils::{format_hex, parse_hex};

/// NXP Semiconductors manufacturer code, always the first UID byte.
pub const NXP_MANUFACTURER_CODE: u8 = 0x04;

const UID_LEN: usize = 7;

/// A 7-byte ISO14443-3A double-size UID.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TagUid([u8; UID_LEN]);

impl TagUid {
    /// Generates a fresh UID with the NXP manufacturer code and six random bytes.
    ///
    /// ```
    /// let uid = ntag::TagUid::generate(&mut rand::rng());
    /// assert_eq!(0x04, uid.as_bytes()[0]);
    /// ```
    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: RngCore + ?Sized,
    {
        let mut bytes = [0u8; UID_LEN];
        bytes[0] = NXP_MANUFACTURER_CODE;
        rng.fill_bytes(&mut bytes[1..]);
        Self(bytes)
    }

    /// Creates a UID from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TagImageError::InvalidUid`] when the first byte is not the
    /// NXP manufacturer code.
    pub fn from_bytes(bytes: [u8; UID_LEN]) -> Result<Self, TagImageError> {
        if bytes[0] != NXP_MANUFACTURER_CODE {
            return Err(TagImageError::InvalidUid {
                reason: format!(
                    "first byte must be the NXP manufacturer code 0x{NXP_MANUFACTURER_CODE:02X}, got 0x{:02X}",
                    bytes[0]
                ),
            });
        }
        Ok(Self(bytes))
    }

    /// Returns the raw UID bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; UID_LEN] {
        &self.0
    }

    /// Check byte over the first three UID bytes: `uid0 ^ uid1 ^ uid2`.
    #[must_use]
    pub const fn bcc0(&self) -> u8 {
        self.0[0] ^ self.0[1] ^ self.0[2]
    }

    /// Check byte over the last four UID bytes: `uid3 ^ uid4 ^ uid5 ^ uid6`.
    #[must_use]
    pub const fn bcc1(&self) -> u8 {
        self.0[3] ^ self.0[4] ^ self.0[5] ^ self.0[6]
    }
}

impl FromStr for TagUid {
    type Err = TagImageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = parse_hex(value).map_err(|error| TagImageError::InvalidUid {
            reason: error.to_string(),
        })?;
        let bytes: [u8; UID_LEN] =
            bytes
                .try_into()
                .map_err(|bytes: Vec<u8>| TagImageError::InvalidUid {
                    reason: format!("expected {UID_LEN} bytes, got {}", bytes.len()),
                })?;
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hex(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;

    use super::*;

    #[test]
    fn generated_uids_start_with_manufacturer_code_and_satisfy_check_bytes() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..256 {
            let uid = TagUid::generate(&mut rng);
            let bytes = uid.as_bytes();
            assert_eq!(NXP_MANUFACTURER_CODE, bytes[0]);
            assert_eq!(bytes[0] ^ bytes[1] ^ bytes[2], uid.bcc0());
            assert_eq!(bytes[3] ^ bytes[4] ^ bytes[5] ^ bytes[6], uid.bcc1());
        }
    }

    #[test]
    fn check_bytes_match_known_uid() {
        let uid = TagUid::from_bytes([0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
            .expect("NXP UID should be accepted");
        assert_eq!(0x04 ^ 0x11 ^ 0x22, uid.bcc0());
        assert_eq!(0x33 ^ 0x44 ^ 0x55 ^ 0x66, uid.bcc1());
    }

    #[test]
    fn parses_and_displays_spaced_hex() {
        let uid: TagUid = "04 a1 b2 c3 d4 e5 f6".parse().expect("valid UID should parse");
        assert_eq!("04 A1 B2 C3 D4 E5 F6", uid.to_string());
    }

    #[rstest]
    #[case("04A1B2")]
    #[case("05A1B2C3D4E5F6")]
    #[case("04A1B2C3D4E5F6AA")]
    #[case("not hex")]
    fn rejects_malformed_uids(#[case] input: &str) {
        assert_matches!(input.parse::<TagUid>(), Err(TagImageError::InvalidUid { .. }));
    }
}
