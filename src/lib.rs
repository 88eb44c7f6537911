pub mod cli;
pub mod descriptor;
pub mod dump;
pub mod error;
pub mod ifd;
pub mod inject;
pub mod layout;
pub mod locator;
pub mod mutate;
pub mod region;
pub mod version;

pub use error::{Error, Result};
pub use ifd::Descriptor;

/// End-to-end scenarios spanning locate/dump/inject/layout together,
/// using the concrete offsets a real descriptor would carry rather than
/// the toy values the per-module tests use.
#[cfg(test)]
mod scenarios {
    use crate::ifd::test_images::make_test_image;
    use crate::version::Version;

    #[test]
    fn detect_v1_reports_20mhz_and_five_regions() {
        let data = make_test_image(0, &[(0, 0xfff), (0x1000, 0x1fff)]);
        let desc = Descriptor::locate(&data).unwrap();
        assert_eq!(desc.version, Version::V1);
        assert_eq!(desc.max_regions(), 5);
        let report = crate::dump::full_dump(&data, &desc).unwrap();
        assert!(report.contains("Read Clock Frequency:      20MHz"));
    }

    #[test]
    fn detect_v2_reports_nine_regions_and_ec_row() {
        let data = make_test_image(
            4,
            &[
                (0, 0xfff),
                (0x1000, 0x1fff),
                (0x2000, 0x2fff),
                (0x3000, 0x3fff),
                (0x4000, 0x4fff),
                (0x5000, 0x5fff),
                (0x6000, 0x6fff),
                (0x7000, 0x7fff),
                (0x8000, 0x8fff),
            ],
        );
        let desc = Descriptor::locate(&data).unwrap();
        assert_eq!(desc.version, Version::V2);
        assert_eq!(desc.max_regions(), 9);
        let report = crate::dump::full_dump(&data, &desc).unwrap();
        let master_section = report.split("Found Master Section").nth(1).unwrap();
        let master_section = master_section.split("Found VSCC").next().unwrap();
        assert!(master_section.contains("EC"));
    }

    #[test]
    fn inject_bios_fills_region_with_ff_and_places_payload_at_the_top() {
        let mut data = make_test_image(0, &[(0, 0x1fffff), (0x200000, 0x3fffff)]);
        let payload = vec![0xabu8; 32];
        let desc = Descriptor::locate(&data).unwrap();
        crate::inject::inject_region(&desc, &mut data, 1, &payload).unwrap();

        assert!(data[0x200000..0x3fffe0].iter().all(|&b| b == 0xff));
        assert_eq!(&data[0x3fffe0..0x400000], payload.as_slice());
    }

    #[test]
    fn inject_me_leaves_the_rest_of_the_region_untouched() {
        // index 1 is an explicit disabled placeholder so ME lands at index 2.
        let mut data = make_test_image(0, &[(0, 0xfff), (0x1000, 0xfff), (0x1000, 0x100fff)]);
        let payload = vec![0xcdu8; 256];
        let desc = Descriptor::locate(&data).unwrap();
        crate::inject::inject_region(&desc, &mut data, 2, &payload).unwrap();

        assert_eq!(&data[0x1000..0x1100], payload.as_slice());
        assert!(data[0x1100..0x101000].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn relayout_growing_bios_rounds_image_up_to_next_power_of_two() {
        let mut data = make_test_image(0, &[(0, 0xfff), (0x400000, 0x7fffff)]);
        data[0x400000..0x400010].copy_from_slice(&[0x11u8; 16]);

        let desc = Descriptor::locate(&data).unwrap();
        let layout = "00000000:00000fff fd\n00800000:00ffffff bios\n";
        let new_image = crate::layout::relayout(&desc, &data, layout).unwrap();
        assert_eq!(new_image.len(), 0x0100_0000);

        let new_desc = Descriptor::locate(&new_image).unwrap();
        let bios = new_desc.region(&new_image, 1).unwrap();
        assert_eq!(bios, crate::region::Region::new(0x800000, 0xffffff));
        assert!(new_image[0x800000..0xc00000].iter().all(|&b| b == 0xff));
        assert_eq!(&new_image[0xc00000..0xc00010], &[0x11u8; 16]);
    }

    #[test]
    fn relayout_rejects_an_overlapping_layout_file() {
        let data = make_test_image(0, &[(0, 0xfff), (0x100000, 0x1fffff), (0x1000, 0xfffff)]);
        let desc = Descriptor::locate(&data).unwrap();
        let layout = "00000000:00000fff fd\n00100000:00200000 bios\n00180000:00280000 me\n";
        let err = crate::layout::relayout(&desc, &data, layout);
        assert!(matches!(err, Err(Error::Overlap { .. })));
    }
}
