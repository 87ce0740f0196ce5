//! In-memory writer for picture-only `.pptx` packages.
//!
//! A `.pptx` file is a zip of OOXML parts. This writer knows exactly one
//! kind of slide: a blank slide holding one JPEG picture at a given
//! rectangle.
//!
//! # Example
//!
//! ```no_run
//! use slidedeck_dl::pptx::{PresentationWriter, Rect};
//!
//! # fn example(jpeg: Vec<u8>) -> Result<(), slidedeck_dl::DeckError> {
//! let mut writer = PresentationWriter::new("Quarterly Review", 9_144_000, 6_858_000);
//! writer.add_picture_slide(jpeg, writer.full_page());
//! let bytes = writer.to_bytes()?;
//! std::fs::write("deck.pptx", bytes).unwrap();
//! # Ok(())
//! # }
//! ```

mod parts;

pub use parts::escape_xml;

use crate::error::DeckError;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// English Metric Units per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Smallest slide edge PresentationML accepts (1 inch).
pub const MIN_SLIDE_EMU: i64 = 914_400;

/// Largest slide edge PresentationML accepts (56 inches).
pub const MAX_SLIDE_EMU: i64 = 51_206_400;

/// Media type of the generated package.
pub const PPTX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// A rectangle on the slide, in EMU, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Convert inches to EMU, rounding to the nearest unit.
pub fn inches_to_emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Scale a page size into the range PresentationML allows.
///
/// Both edges are multiplied by the same factor, so the aspect ratio is
/// kept. Only a ratio wider than the range itself (56:1) is clamped.
pub fn fit_slide_size(width: i64, height: i64) -> (i64, i64) {
    let (w, h) = (width.max(1) as f64, height.max(1) as f64);
    let (min, max) = (MIN_SLIDE_EMU as f64, MAX_SLIDE_EMU as f64);

    let scale = if w.max(h) > max {
        max / w.max(h)
    } else if w.min(h) < min {
        min / w.min(h)
    } else {
        1.0
    };

    let fit = |edge: f64| ((edge * scale).round() as i64).clamp(MIN_SLIDE_EMU, MAX_SLIDE_EMU);
    (fit(w), fit(h))
}

#[derive(Debug)]
struct PictureSlide {
    jpeg: Vec<u8>,
    rect: Rect,
}

/// Builds a presentation in memory and serialises it with [`Self::to_bytes`].
#[derive(Debug)]
pub struct PresentationWriter {
    title: String,
    slide_width: i64,
    slide_height: i64,
    slides: Vec<PictureSlide>,
}

impl PresentationWriter {
    /// Create an empty presentation. Sizes are in EMU and are scaled into
    /// the range PresentationML allows (see [`fit_slide_size`]).
    pub fn new(title: impl Into<String>, slide_width: i64, slide_height: i64) -> Self {
        let (slide_width, slide_height) = fit_slide_size(slide_width, slide_height);
        Self {
            title: title.into(),
            slide_width,
            slide_height,
            slides: Vec::new(),
        }
    }

    pub fn slide_width(&self) -> i64 {
        self.slide_width
    }

    pub fn slide_height(&self) -> i64 {
        self.slide_height
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// The rectangle covering the whole page.
    pub fn full_page(&self) -> Rect {
        Rect {
            x: 0,
            y: 0,
            width: self.slide_width,
            height: self.slide_height,
        }
    }

    /// Append a slide showing `jpeg` stretched over `rect`.
    pub fn add_picture_slide(&mut self, jpeg: Vec<u8>, rect: Rect) {
        self.slides.push(PictureSlide { jpeg, rect });
    }

    /// Serialise the package.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DeckError> {
        let n = self.slides.len();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let xml = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        // JPEG data does not shrink further.
        let media = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        write_part(&mut zip, "[Content_Types].xml", parts::content_types(n).as_bytes(), xml)?;
        write_part(&mut zip, "_rels/.rels", parts::package_rels().as_bytes(), xml)?;
        write_part(&mut zip, "docProps/core.xml", parts::core_props(&self.title).as_bytes(), xml)?;
        write_part(&mut zip, "docProps/app.xml", parts::app_props(n).as_bytes(), xml)?;
        write_part(
            &mut zip,
            "ppt/presentation.xml",
            parts::presentation(n, self.slide_width, self.slide_height).as_bytes(),
            xml,
        )?;
        write_part(&mut zip, "ppt/_rels/presentation.xml.rels", parts::presentation_rels(n).as_bytes(), xml)?;
        write_part(&mut zip, "ppt/presProps.xml", parts::pres_props().as_bytes(), xml)?;
        write_part(&mut zip, "ppt/viewProps.xml", parts::view_props().as_bytes(), xml)?;
        write_part(&mut zip, "ppt/tableStyles.xml", parts::table_styles().as_bytes(), xml)?;
        write_part(&mut zip, "ppt/theme/theme1.xml", parts::theme().as_bytes(), xml)?;
        write_part(&mut zip, "ppt/slideMasters/slideMaster1.xml", parts::slide_master().as_bytes(), xml)?;
        write_part(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            parts::slide_master_rels().as_bytes(),
            xml,
        )?;
        write_part(&mut zip, "ppt/slideLayouts/slideLayout1.xml", parts::blank_layout().as_bytes(), xml)?;
        write_part(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            parts::blank_layout_rels().as_bytes(),
            xml,
        )?;

        for (i, slide) in self.slides.iter().enumerate() {
            let number = i + 1;
            write_part(
                &mut zip,
                &format!("ppt/slides/slide{number}.xml"),
                parts::picture_slide(number, slide.rect).as_bytes(),
                xml,
            )?;
            write_part(
                &mut zip,
                &format!("ppt/slides/_rels/slide{number}.xml.rels"),
                parts::picture_slide_rels(number).as_bytes(),
                xml,
            )?;
            write_part(&mut zip, &format!("ppt/media/image{number}.jpeg"), &slide.jpeg, media)?;
        }

        let bytes = zip.finish()?.into_inner();
        debug!("Wrote presentation: {} slides, {} bytes", n, bytes.len());
        Ok(bytes)
    }
}

fn write_part(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    path: &str,
    body: &[u8],
    options: SimpleFileOptions,
) -> Result<(), DeckError> {
    zip.start_file(path, options)?;
    zip.write_all(body)
        .map_err(|e| DeckError::DocumentWrite(format!("{path}: {e}")))
}
