use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rstest::rstest;

use ntag::{DeviceProfile, ImageRequest, PayloadKind, TagImage, TagImageError, TagType, TagUid};

fn fixed_uid() -> TagUid {
    "04 11 22 33 44 55 66".parse().expect("valid uid")
}

fn request(tag_type: TagType, kind: PayloadKind, input: &str) -> ImageRequest {
    ImageRequest::builder()
        .tag_type(tag_type)
        .kind(kind)
        .input(input)
        .uid(fixed_uid())
        .build()
}

#[test]
fn text_image_lays_out_header_message_and_config_pages() {
    let image = TagImage::generate(&request(TagType::Ntag213, PayloadKind::Text, "hi"))
        .expect("short text fits");

    let pages: Vec<[u8; 4]> = image.pages()[..8].to_vec();
    assert_eq!(
        vec![
            [0x04, 0x11, 0x22, 0x37],
            [0x33, 0x44, 0x55, 0x66],
            [0x44, 0x48, 0x00, 0x00],
            [0xE1, 0x10, 0x12, 0x00],
            [0x03, 0x09, 0xD1, 0x01],
            [0x05, 0x54, 0x02, 0x65],
            [0x6E, 0x68, 0x69, 0xFE],
            [0x00, 0x00, 0x00, 0x00],
        ],
        pages
    );
    assert_eq!(Some(&[0x00, 0x00, 0x00, 0xBD]), image.page(40));
    assert_eq!(Some(&[0x04, 0x00, 0x00, 0xFF]), image.page(41));
    assert_eq!(Some(&[0xFF, 0xFF, 0xFF, 0xFF]), image.page(43));
    assert_eq!(None, image.page(45));
}

#[test]
fn rendered_file_lists_every_page() {
    let image = TagImage::generate(&request(
        TagType::Ntag215,
        PayloadKind::Url,
        "https://example.com",
    ))
    .expect("url fits");
    let rendered = image.render();
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!("Filetype: Flipper NFC device", lines[0]);
    assert!(lines.contains(&"UID: 04 11 22 33 44 55 66"));
    assert!(lines.contains(&"NTAG/Ultralight type: NTAG215"));
    assert!(lines.contains(&"Pages total: 135"));
    assert!(lines.contains(&"Page 4: 03 10 D1 01"));
    assert!(lines.contains(&"Page 5: 0C 55 04 65"));
    assert!(lines.contains(&"Page 130: 00 00 00 BD"));
    assert_eq!(Some(&"Failed authentication attempts: 0"), lines.last());
    assert!(rendered.ends_with('\n'));
}

#[rstest]
#[case(TagType::Ntag213, 164)]
#[case(TagType::Ntag215, 524)]
#[case(TagType::Ntag216, 908)]
fn capacity_matches_data_pages(#[case] tag_type: TagType, #[case] capacity: usize) {
    assert_eq!(capacity, DeviceProfile::for_type(tag_type).data_capacity());
}

#[test]
fn long_text_fits_larger_tags_only() {
    let text = "x".repeat(400);

    assert_matches!(
        TagImage::generate(&request(TagType::Ntag213, PayloadKind::Text, &text)),
        Err(TagImageError::CapacityExceeded { available: 164, .. })
    );
    let image = TagImage::generate(&request(TagType::Ntag216, PayloadKind::Text, &text))
        .expect("400 bytes of text fit an NTAG216");
    assert_eq!(231, image.pages().len());
}

#[test]
fn seeded_rng_gives_reproducible_uids() {
    let request = ImageRequest::builder()
        .kind(PayloadKind::Phone)
        .input("+1 555 0100")
        .build();

    let first = TagImage::generate_with_rng(&request, &mut StdRng::seed_from_u64(7))
        .expect("phone number is valid");
    let second = TagImage::generate_with_rng(&request, &mut StdRng::seed_from_u64(7))
        .expect("phone number is valid");

    assert_eq!(first, second);
    assert_eq!(0x04, first.uid().as_bytes()[0]);
    assert_eq!(TagType::Ntag215, first.profile().tag_type());
}

#[rstest]
#[case(PayloadKind::Email, "not-an-email")]
#[case(PayloadKind::Phone, "call me")]
#[case(PayloadKind::Vcard, "FN:Ada")]
#[case(PayloadKind::App, "nodots")]
#[case(PayloadKind::Wifi, "WIFI:T:WPA;P:secret;;")]
fn malformed_input_is_rejected_before_building(#[case] kind: PayloadKind, #[case] input: &str) {
    assert_matches!(
        TagImage::generate(&request(TagType::Ntag215, kind, input)),
        Err(TagImageError::InvalidInput { .. })
    );
}

#[test]
fn every_kind_builds_an_image() {
    let inputs = [
        (PayloadKind::Url, "https://example.com"),
        (PayloadKind::Phone, "+44 20 7946 0000"),
        (PayloadKind::Email, "ada@example.com"),
        (PayloadKind::Text, "hello"),
        (PayloadKind::Vcard, "BEGIN:VCARD\nVERSION:3.0\nFN:Ada\nEND:VCARD"),
        (PayloadKind::Wifi, "WIFI:S:home;T:WPA;P:secret;;"),
        (PayloadKind::App, "com.example.app"),
        (PayloadKind::Mime, "text/plain\nbody"),
    ];

    for (kind, input) in inputs {
        let image = TagImage::generate(&request(TagType::Ntag215, kind, input))
            .unwrap_or_else(|error| panic!("{kind} should build: {error}"));
        assert_eq!(Some(&[0xE1, 0x10, 0x6D, 0x00]), image.page(3));
        assert_eq!(0x03, image.pages()[4][0], "{kind} starts with an NDEF TLV");
    }
}

#[test]
fn unknown_device_names_are_rejected() {
    assert_matches!(
        DeviceProfile::lookup("NTAG214"),
        Err(TagImageError::UnknownDeviceType { name }) if name == "NTAG214"
    );
    assert_eq!(
        TagType::Ntag216,
        DeviceProfile::lookup(" ntag216 ")
            .expect("lookup ignores case and whitespace")
            .tag_type()
    );
}

#[test]
fn uids_must_start_with_manufacturer_code() {
    assert_matches!(
        "05 11 22 33 44 55 66".parse::<TagUid>(),
        Err(TagImageError::InvalidUid { .. })
    );
    assert_matches!(
        "04 11 22".parse::<TagUid>(),
        Err(TagImageError::InvalidUid { .. })
    );
}

#[test]
fn oversized_media_type_is_rejected_even_when_it_would_fit() {
    let media_type = format!("application/{}", "x".repeat(288));
    let input = format!("{media_type}\nbody");

    assert_matches!(
        TagImage::generate(&request(TagType::Ntag216, PayloadKind::Mime, &input)),
        Err(TagImageError::InvalidInput { kind: "mime", .. })
    );
}
