use bon::Builder;
use rand::RngCore;
use tracing::{debug, instrument};

use super::profile::{DeviceProfile, FIRST_DATA_PAGE, PAGE_SIZE, TagType};
use super::serializer::NfcDeviceFile;
use super::uid::TagUid;
use crate::error::TagImageError;
use crate::ndef::{PayloadKind, TlvMessage};

/// Fixed internal byte following BCC1 on page 2.
const INTERNAL_BYTE: u8 = 0x48;

/// Capability Container magic number announcing NDEF data.
const CC_MAGIC: u8 = 0xE1;

/// Capability Container mapping version 1.0.
const CC_VERSION: u8 = 0x10;

/// Capability Container access byte granting read and write.
const CC_ACCESS_OPEN: u8 = 0x00;

/// One 4-byte tag page.
pub type Page = [u8; PAGE_SIZE];

/// Parameters for generating one tag image.
#[derive(Debug, Clone, Eq, PartialEq, Builder)]
pub struct ImageRequest {
    #[builder(default = TagType::Ntag215)]
    tag_type: TagType,
    kind: PayloadKind,
    #[builder(into)]
    input: String,
    uid: Option<TagUid>,
}

impl ImageRequest {
    /// Returns the target tag family.
    #[must_use]
    pub const fn tag_type(&self) -> TagType {
        self.tag_type
    }

    /// Returns the payload kind.
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// Returns the raw payload input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns the caller-supplied UID, if any.
    #[must_use]
    pub const fn uid(&self) -> Option<TagUid> {
        self.uid
    }
}

/// Owns the page array of one image while it is being written.
///
/// Pages 0 to 3 are filled on creation. NDEF bytes are then written through
/// a sequential cursor starting at page 4, and the profile's end pages are
/// stamped last so they always win over NDEF content.
#[derive(Debug)]
pub struct TagImageBuilder {
    profile: &'static DeviceProfile,
    uid: TagUid,
    pages: Vec<Page>,
    cursor: usize,
}

impl TagImageBuilder {
    /// Creates a zeroed page array with the UID, check bytes and Capability
    /// Container in place.
    ///
    /// ```
    /// use ntag::{DeviceProfile, TagImageBuilder, TagType, TagUid};
    ///
    /// let uid = TagUid::from_bytes([0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06])?;
    /// let image = TagImageBuilder::new(DeviceProfile::for_type(TagType::Ntag213), uid).finish();
    /// assert_eq!(Some(&[0xE1, 0x10, 0x12, 0x00]), image.page(3));
    /// # Ok::<(), ntag::TagImageError>(())
    /// ```
    #[must_use]
    pub fn new(profile: &'static DeviceProfile, uid: TagUid) -> Self {
        let mut pages = vec![[0u8; PAGE_SIZE]; profile.page_count()];
        let bytes = uid.as_bytes();
        pages[0] = [bytes[0], bytes[1], bytes[2], uid.bcc0()];
        pages[1] = [bytes[3], bytes[4], bytes[5], bytes[6]];
        pages[2] = [uid.bcc1(), INTERNAL_BYTE, 0x00, 0x00];
        pages[3] = [CC_MAGIC, CC_VERSION, profile.cc_size(), CC_ACCESS_OPEN];

        Self {
            profile,
            uid,
            pages,
            cursor: 0,
        }
    }

    /// Writes framed bytes at the cursor and zero-pads the final partial page.
    ///
    /// # Errors
    ///
    /// Returns [`TagImageError::CapacityExceeded`] before writing anything when
    /// the bytes would run past the last page.
    pub fn write_framed(&mut self, bytes: &[u8]) -> Result<(), TagImageError> {
        let available = self.profile.data_capacity();
        let required = self.cursor + bytes.len();
        if required > available {
            return Err(TagImageError::CapacityExceeded {
                required,
                available,
            });
        }

        for byte in bytes {
            let page = FIRST_DATA_PAGE + self.cursor / PAGE_SIZE;
            self.pages[page][self.cursor % PAGE_SIZE] = *byte;
            self.cursor += 1;
        }
        if self.cursor % PAGE_SIZE != 0 {
            let page = FIRST_DATA_PAGE + self.cursor / PAGE_SIZE;
            self.pages[page][self.cursor % PAGE_SIZE..].fill(0x00);
        }
        Ok(())
    }

    /// Overwrites the profile's fixed lock and configuration pages.
    pub fn stamp_end_pages(&mut self) {
        for (index, content) in self.profile.end_pages() {
            self.pages[*index] = *content;
        }
    }

    /// Returns the finished image.
    #[must_use]
    pub fn finish(self) -> TagImage {
        TagImage {
            profile: self.profile,
            uid: self.uid,
            pages: self.pages,
        }
    }
}

/// A complete tag memory image.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TagImage {
    profile: &'static DeviceProfile,
    uid: TagUid,
    pages: Vec<Page>,
}

impl TagImage {
    /// Generates an image using the thread-local random generator for the UID.
    ///
    /// # Errors
    ///
    /// Returns an error when the input is invalid for its kind or the framed
    /// message does not fit the tag.
    ///
    /// ```
    /// use ntag::{ImageRequest, PayloadKind, TagImage, TagType};
    ///
    /// let request = ImageRequest::builder()
    ///     .tag_type(TagType::Ntag215)
    ///     .kind(PayloadKind::Url)
    ///     .input("https://example.com")
    ///     .build();
    /// let image = TagImage::generate(&request)?;
    /// assert_eq!(135, image.pages().len());
    /// # Ok::<(), ntag::TagImageError>(())
    /// ```
    pub fn generate(request: &ImageRequest) -> Result<Self, TagImageError> {
        Self::generate_with_rng(request, &mut rand::rng())
    }

    /// Generates an image drawing any random UID bytes from `rng`.
    ///
    /// The payload is validated, encoded and framed before the page array is
    /// created, so every failure leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns [`TagImageError::InvalidInput`] for malformed input,
    /// [`TagImageError::MessageTooLong`] when the message cannot be framed, and
    /// [`TagImageError::CapacityExceeded`] when it does not fit the tag.
    #[instrument(
        skip(request, rng),
        level = "debug",
        fields(tag_type = %request.tag_type, kind = %request.kind)
    )]
    pub fn generate_with_rng<R>(request: &ImageRequest, rng: &mut R) -> Result<Self, TagImageError>
    where
        R: RngCore + ?Sized,
    {
        let profile = DeviceProfile::for_type(request.tag_type);
        let record = request.kind.parse_record(&request.input)?;
        let message = TlvMessage::frame(&record.encode()?)?;
        if message.len() > profile.data_capacity() {
            return Err(TagImageError::CapacityExceeded {
                required: message.len(),
                available: profile.data_capacity(),
            });
        }

        let uid = request.uid.unwrap_or_else(|| TagUid::generate(rng));
        let mut builder = TagImageBuilder::new(profile, uid);
        builder.write_framed(message.as_bytes())?;
        builder.stamp_end_pages();

        debug!(
            uid = %uid,
            framed_len = message.len(),
            capacity = profile.data_capacity(),
            "generated tag image"
        );
        Ok(builder.finish())
    }

    /// Returns the device profile the image was built for.
    #[must_use]
    pub const fn profile(&self) -> &'static DeviceProfile {
        self.profile
    }

    /// Returns the tag UID.
    #[must_use]
    pub const fn uid(&self) -> TagUid {
        self.uid
    }

    /// Returns every page in address order.
    #[must_use]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Returns one page, or `None` past the end of memory.
    #[must_use]
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    /// Renders the image in the Flipper NFC device file format.
    #[must_use]
    pub fn render(&self) -> String {
        NfcDeviceFile::new(self).to_string()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    fn fixed_uid() -> TagUid {
        TagUid::from_bytes([0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6]).expect("NXP UID")
    }

    #[test]
    fn header_pages_carry_uid_check_bytes_and_capability_container() {
        let image =
            TagImageBuilder::new(DeviceProfile::for_type(TagType::Ntag215), fixed_uid()).finish();

        assert_eq!(
            &[
                [0x04, 0xA1, 0xB2, 0x04 ^ 0xA1 ^ 0xB2],
                [0xC3, 0xD4, 0xE5, 0xF6],
                [0xC3 ^ 0xD4 ^ 0xE5 ^ 0xF6, 0x48, 0x00, 0x00],
                [0xE1, 0x10, 0x6D, 0x00],
            ],
            &image.pages()[..4]
        );
        assert!(image.pages()[4..].iter().all(|page| *page == [0; 4]));
    }

    #[test]
    fn write_framed_advances_a_page_every_four_bytes_and_pads() {
        let mut builder =
            TagImageBuilder::new(DeviceProfile::for_type(TagType::Ntag213), fixed_uid());
        builder
            .write_framed(&[1, 2, 3, 4, 5, 6])
            .expect("bytes should fit");
        let image = builder.finish();

        assert_eq!(Some(&[1, 2, 3, 4]), image.page(4));
        assert_eq!(Some(&[5, 6, 0, 0]), image.page(5));
        assert_eq!(Some(&[0, 0, 0, 0]), image.page(6));
    }

    #[test]
    fn write_framed_fills_data_area_exactly() {
        let profile = DeviceProfile::for_type(TagType::Ntag213);
        let mut builder = TagImageBuilder::new(profile, fixed_uid());
        builder
            .write_framed(&vec![0xAA; profile.data_capacity()])
            .expect("full data area should fit");
        assert_matches!(
            builder.write_framed(&[0xBB]),
            Err(TagImageError::CapacityExceeded { required: 165, available: 164 })
        );
    }

    #[test]
    fn end_pages_override_ndef_bytes() {
        let profile = DeviceProfile::for_type(TagType::Ntag215);
        let mut builder = TagImageBuilder::new(profile, fixed_uid());
        builder
            .write_framed(&vec![0xAA; profile.data_capacity()])
            .expect("full data area should fit");
        builder.stamp_end_pages();
        let image = builder.finish();

        assert_eq!(Some(&[0xAA; 4]), image.page(129));
        assert_eq!(Some(&[0x00, 0x00, 0x00, 0xBD]), image.page(130));
        assert_eq!(Some(&[0x00, 0x00, 0x00, 0x00]), image.page(134));
        assert_eq!(None, image.page(135));
    }

    #[test]
    fn url_scenario_on_ntag215() {
        let request = ImageRequest::builder()
            .kind(PayloadKind::Url)
            .input("https://example.com")
            .build();
        let image = TagImage::generate_with_rng(&request, &mut StdRng::seed_from_u64(7))
            .expect("URL should fit");

        assert_eq!(0x04, image.uid().as_bytes()[0]);
        assert_eq!(Some(&[0xE1, 0x10, 0x6D, 0x00]), image.page(3));

        let data: Vec<u8> = image.pages()[4..9].iter().flatten().copied().collect();
        assert_eq!(
            [0x03, 0x10, 0xD1, 0x01, 0x0C, 0x55, 0x04],
            data[..7]
        );
        assert_eq!(b"example.com", &data[7..18]);
        assert_eq!(0xFE, data[18]);
        assert_eq!(Some(&[0x00; 4]), image.page(134));
    }

    #[rstest]
    fn every_profile_yields_its_page_count(
        #[values(PayloadKind::Text, PayloadKind::Phone)] kind: PayloadKind,
    ) {
        for tag_type in TagType::iter() {
            let request = ImageRequest::builder()
                .tag_type(tag_type)
                .kind(kind)
                .input("+1 555 0100")
                .uid(fixed_uid())
                .build();
            let image = TagImage::generate(&request).expect("short payload should fit");
            assert_eq!(DeviceProfile::for_type(tag_type).page_count(), image.pages().len());
            assert_eq!(fixed_uid(), image.uid());
        }
    }

    #[test]
    fn oversized_payload_fails_before_building() {
        let request = ImageRequest::builder()
            .tag_type(TagType::Ntag213)
            .kind(PayloadKind::Text)
            .input("x".repeat(200))
            .build();
        assert_matches!(
            TagImage::generate(&request),
            Err(TagImageError::CapacityExceeded { available: 164, .. })
        );
    }

    #[test]
    fn invalid_input_is_reported_before_capacity() {
        let request = ImageRequest::builder()
            .kind(PayloadKind::Email)
            .input("not-an-address")
            .build();
        assert_matches!(
            TagImage::generate(&request),
            Err(TagImageError::InvalidInput { kind: "email", .. })
        );
    }
}
