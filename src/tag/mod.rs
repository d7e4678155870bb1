//! Type 2 tag memory images: profiles, UIDs, page layout and rendering.

mod image;
mod profile;
mod serializer;
mod uid;

pub use image::{ImageRequest, Page, TagImage, TagImageBuilder};
pub use profile::{DeviceProfile, FIRST_DATA_PAGE, PAGE_SIZE, TagType};
pub use serializer::{NFC_FILE_EXTENSION, NfcDeviceFile, suggested_file_name};
pub use uid::{NXP_MANUFACTURER_CODE, TagUid};
