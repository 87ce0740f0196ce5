//! Document assembly: place every normalised slide on its own page.
//!
//! The page size is taken from slide 1 alone, converted from pixels to
//! inches at 72 pixels per inch. Every later slide is stretched over the
//! full page even when its own dimensions differ.

use crate::error::DeckError;
use crate::pipeline::normalize::NormalizedImage;
use crate::pptx::{inches_to_emu, PresentationWriter};
use std::collections::HashMap;
use tracing::debug;

/// Build the `.pptx` package for slides `1..=slide_count`.
///
/// Fails with [`DeckError::MissingSlide`] if any index in range is absent.
pub fn assemble(
    title: &str,
    mut slides: HashMap<u32, NormalizedImage>,
    slide_count: u32,
) -> Result<Vec<u8>, DeckError> {
    let first = slides.get(&1).ok_or(DeckError::MissingSlide { slide: 1 })?;
    let width = inches_to_emu(first.width_inches());
    let height = inches_to_emu(first.height_inches());

    let mut writer = PresentationWriter::new(title, width, height);
    if writer.slide_width() != width || writer.slide_height() != height {
        debug!(
            "Page size {}x{} EMU scaled to {}x{}",
            width,
            height,
            writer.slide_width(),
            writer.slide_height()
        );
    }

    let page = writer.full_page();
    for index in 1..=slide_count {
        let slide = slides
            .remove(&index)
            .ok_or(DeckError::MissingSlide { slide: index })?;
        writer.add_picture_slide(slide.bytes, page);
    }

    writer.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn slide(tag: u8, w: u32, h: u32) -> NormalizedImage {
        NormalizedImage {
            bytes: vec![0xFF, 0xD8, tag],
            pixel_width: w,
            pixel_height: h,
        }
    }

    fn part(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn first_slide_sets_page_size() {
        let slides = HashMap::from([
            (1, slide(1, 720, 540)),
            (2, slide(2, 1024, 768)),
            (3, slide(3, 300, 300)),
        ]);
        let bytes = assemble("Deck", slides, 3).unwrap();

        let presentation = String::from_utf8(part(&bytes, "ppt/presentation.xml")).unwrap();
        assert!(presentation.contains(r#"cx="9144000" cy="6858000""#));

        let slide3 = String::from_utf8(part(&bytes, "ppt/slides/slide3.xml")).unwrap();
        assert!(slide3.contains(r#"cx="9144000" cy="6858000""#));
    }

    #[test]
    fn slides_keep_index_order() {
        let slides = HashMap::from([
            (2, slide(2, 720, 540)),
            (3, slide(3, 720, 540)),
            (1, slide(1, 720, 540)),
        ]);
        let bytes = assemble("Deck", slides, 3).unwrap();
        for i in 1..=3u8 {
            assert_eq!(part(&bytes, &format!("ppt/media/image{i}.jpeg")), vec![0xFF, 0xD8, i]);
        }
    }

    #[test]
    fn wide_first_slide_keeps_its_shape() {
        // 4320 x 2430 px is 60 x 33.75 in, past the 56 in limit.
        let slides = HashMap::from([(1, slide(1, 4320, 2430))]);
        let bytes = assemble("Deck", slides, 1).unwrap();
        let presentation = String::from_utf8(part(&bytes, "ppt/presentation.xml")).unwrap();
        assert!(presentation.contains(r#"cx="51206400" cy="28803600""#));
    }

    #[test]
    fn tiny_first_slide_keeps_its_shape() {
        let slides = HashMap::from([(1, slide(1, 36, 24))]);
        let bytes = assemble("Deck", slides, 1).unwrap();
        let presentation = String::from_utf8(part(&bytes, "ppt/presentation.xml")).unwrap();
        assert!(presentation.contains(r#"cx="1371600" cy="914400""#));
    }

    #[test]
    fn missing_first_slide_fails() {
        let slides = HashMap::from([(2, slide(2, 720, 540))]);
        let err = assemble("Deck", slides, 2).unwrap_err();
        assert!(matches!(err, DeckError::MissingSlide { slide: 1 }));
    }

    #[test]
    fn gap_in_range_fails() {
        let slides = HashMap::from([(1, slide(1, 720, 540)), (3, slide(3, 720, 540))]);
        let err = assemble("Deck", slides, 3).unwrap_err();
        assert!(matches!(err, DeckError::MissingSlide { slide: 2 }));
    }
}
