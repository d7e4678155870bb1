use std::str::FromStr;

use serde_with::SerializeDisplay;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::error::TagImageError;

/// Bytes per tag page.
pub const PAGE_SIZE: usize = 4;

/// Index of the first NDEF data page.
pub const FIRST_DATA_PAGE: usize = 4;

const DYNAMIC_LOCK: [u8; PAGE_SIZE] = [0x00, 0x00, 0x00, 0xBD];
const CFG0: [u8; PAGE_SIZE] = [0x04, 0x00, 0x00, 0xFF];
const CFG1: [u8; PAGE_SIZE] = [0x00, 0x05, 0x00, 0x00];
const PWD: [u8; PAGE_SIZE] = [0xFF, 0xFF, 0xFF, 0xFF];
const PACK: [u8; PAGE_SIZE] = [0x00, 0x00, 0x00, 0x00];

/// Supported NXP Type 2 tag families.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display, SerializeDisplay)]
pub enum TagType {
    /// NTAG213 with 45 pages.
    #[strum(to_string = "NTAG213")]
    Ntag213,
    /// NTAG215 with 135 pages.
    #[strum(to_string = "NTAG215")]
    Ntag215,
    /// NTAG216 with 231 pages.
    #[strum(to_string = "NTAG216")]
    Ntag216,
}

impl FromStr for TagType {
    type Err = TagImageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        TagType::iter()
            .find(|tag_type| tag_type.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TagImageError::UnknownDeviceType {
                name: value.to_string(),
            })
    }
}

/// Memory layout constants for one tag family.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DeviceProfile {
    tag_type: TagType,
    page_count: usize,
    cc_size: u8,
    mifare_version: [u8; 8],
    end_pages: [(usize, [u8; PAGE_SIZE]); 5],
}

impl DeviceProfile {
    /// Looks up a profile by name, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TagImageError::UnknownDeviceType`] for names outside the
    /// supported NTAG types.
    ///
    /// ```
    /// let profile = ntag::DeviceProfile::lookup(" ntag215 ")?;
    /// assert_eq!(135, profile.page_count());
    /// # Ok::<(), ntag::TagImageError>(())
    /// ```
    pub fn lookup(name: &str) -> Result<&'static Self, TagImageError> {
        let tag_type = name.parse::<TagType>()?;
        Ok(Self::for_type(tag_type))
    }

    /// Returns the profile for a tag type.
    #[must_use]
    pub fn for_type(tag_type: TagType) -> &'static Self {
        match tag_type {
            TagType::Ntag213 => &NTAG213,
            TagType::Ntag215 => &NTAG215,
            TagType::Ntag216 => &NTAG216,
        }
    }

    /// Returns the tag family.
    #[must_use]
    pub const fn tag_type(&self) -> TagType {
        self.tag_type
    }

    /// Returns the total number of 4-byte pages.
    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// Returns the Capability Container data-area size byte.
    #[must_use]
    pub const fn cc_size(&self) -> u8 {
        self.cc_size
    }

    /// Returns the `GET_VERSION` response bytes.
    #[must_use]
    pub const fn mifare_version(&self) -> [u8; 8] {
        self.mifare_version
    }

    /// Returns the fixed lock and configuration pages as `(index, bytes)`.
    #[must_use]
    pub fn end_pages(&self) -> &[(usize, [u8; PAGE_SIZE])] {
        &self.end_pages
    }

    /// Returns how many bytes the NDEF writer may place after the header pages.
    #[must_use]
    pub const fn data_capacity(&self) -> usize {
        (self.page_count - FIRST_DATA_PAGE) * PAGE_SIZE
    }
}

static NTAG213: DeviceProfile = profile(TagType::Ntag213, 45, 0x12, 0x0F);
static NTAG215: DeviceProfile = profile(TagType::Ntag215, 135, 0x6D, 0x11);
static NTAG216: DeviceProfile = profile(TagType::Ntag216, 231, 0x6D, 0x13);

const fn profile(
    tag_type: TagType,
    page_count: usize,
    cc_size: u8,
    storage_size: u8,
) -> DeviceProfile {
    let first_end_page = page_count - 5;
    DeviceProfile {
        tag_type,
        page_count,
        cc_size,
        mifare_version: [0x00, 0x04, 0x04, 0x02, 0x01, 0x00, storage_size, 0x03],
        end_pages: [
            (first_end_page, DYNAMIC_LOCK),
            (first_end_page + 1, CFG0),
            (first_end_page + 2, CFG1),
            (first_end_page + 3, PWD),
            (first_end_page + 4, PACK),
        ],
    }
}
