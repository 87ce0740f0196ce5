//! Metadata extraction: slide count, title and the highest-resolution image
//! descriptor of a deck's viewer page.
//!
//! The viewer markup is not an API. Everything here is a best-effort reading
//! of one markup version:
//!
//! * `<span data-cy="page-number">1 of 57</span>` carries the slide count;
//! * `<img id="slide-image-0" srcset="url 320w, url 638w, url 2048w">` carries
//!   the available resolutions of the first slide, lowest first.
//!
//! Absence of either element is an expected outcome ([`Lookup::NotFound`]);
//! a descriptor entry that exists but cannot be parsed is [`Lookup::Malformed`].

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

static PAGE_NUMBER: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"span[data-cy="page-number"]"#).unwrap());
static FIRST_SLIDE_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"img[id="slide-image-0"]"#).unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Separator between the current and total page in the page-number span.
const PAGE_OF: &str = " of ";

/// Separator between the deck title and the site name in `<title>`.
const TITLE_SUFFIX: &str = " | ";

/// Outcome of one scrape lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The value was present and well-formed.
    Found(T),
    /// The markup does not contain what we look for; the reason says which part.
    NotFound(&'static str),
    /// The markup contains the element but its content cannot be parsed.
    Malformed(String),
}

/// One entry of a `srcset` descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideImageVariant {
    pub pixel_width: u32,
    pub url: String,
}

/// Everything the pipeline reads from a viewer page.
///
/// [`Html`] is not `Send`, so the page is parsed and fully read in one
/// synchronous call and only owned values leave this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageScrape {
    pub title: String,
    pub slide_count: Lookup<u32>,
    pub variant: Lookup<SlideImageVariant>,
}

/// Parse a viewer page and run every extractor over it.
pub fn scrape(html: &str) -> PageScrape {
    let doc = Html::parse_document(html);
    let scrape = PageScrape {
        title: extract_title(&doc),
        slide_count: extract_slide_count(&doc),
        variant: extract_highest_variant(&doc),
    };
    debug!(
        "Scraped viewer page: title={:?} slide_count={:?} variant={:?}",
        scrape.title, scrape.slide_count, scrape.variant
    );
    scrape
}

/// Read the total slide count from the first page-number indicator.
pub fn extract_slide_count(doc: &Html) -> Lookup<u32> {
    let Some(span) = doc.select(&PAGE_NUMBER).next() else {
        return Lookup::NotFound("no page-number indicator");
    };
    let text: String = span.text().collect();

    let Some((_, total)) = text.split_once(PAGE_OF) else {
        return Lookup::NotFound("page-number indicator has no ' of ' separator");
    };

    match total.trim().parse::<u32>() {
        Ok(n) => Lookup::Found(n),
        Err(e) => Lookup::Malformed(format!("slide total {:?}: {e}", total.trim())),
    }
}

/// Select the highest-resolution variant of the first slide image.
pub fn extract_highest_variant(doc: &Html) -> Lookup<SlideImageVariant> {
    let Some(img) = doc.select(&FIRST_SLIDE_IMAGE).next() else {
        return Lookup::NotFound("no image with id 'slide-image-0'");
    };
    let Some(srcset) = img.value().attr("srcset") else {
        return Lookup::NotFound("first slide image has no srcset");
    };
    highest_variant(srcset)
}

/// Pick the last (highest) entry of a `srcset` value and parse it.
pub fn highest_variant(srcset: &str) -> Lookup<SlideImageVariant> {
    if !srcset.contains(',') {
        return Lookup::NotFound("srcset lists a single resolution");
    }

    let last = srcset.rsplit(',').next().unwrap_or_default();
    if last.trim().is_empty() {
        return Lookup::Malformed("last srcset entry is empty".into());
    }

    match parse_variant(last) {
        Ok(v) => Lookup::Found(v),
        Err(reason) => Lookup::Malformed(format!("{:?}: {reason}", last.trim())),
    }
}

/// Parse one `"<url> <width>w"` entry.
pub fn parse_variant(entry: &str) -> Result<SlideImageVariant, String> {
    let tokens: Vec<&str> = entry.split_whitespace().collect();
    let &[url, width] = tokens.as_slice() else {
        return Err(format!("expected '<url> <width>w', got {} tokens", tokens.len()));
    };

    let digits = width.strip_suffix('w').unwrap_or(width);
    let pixel_width = digits
        .parse::<u32>()
        .map_err(|e| format!("width {width:?} is not numeric: {e}"))?;

    Ok(SlideImageVariant {
        pixel_width,
        url: url.to_string(),
    })
}

/// The deck title: `<title>` text up to the first `" | "`.
pub fn extract_title(doc: &Html) -> String {
    doc.select(&TITLE)
        .next()
        .map(|t| {
            let text: String = t.text().collect();
            text.split(TITLE_SUFFIX).next().unwrap_or_default().trim().to_string()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SRCSET: &str = "https://image.slidesharecdn.com/deck/85/deck-1-320.jpg 320w, \
https://image.slidesharecdn.com/deck/85/deck-1-638.jpg 638w, \
https://image.slidesharecdn.com/deck/85/deck-1-2048.jpg 2048w";

    fn page(body: &str) -> Html {
        Html::parse_document(&format!(
            "<html><head><title>Quarterly Review | SlideShare</title></head><body>{body}</body></html>"
        ))
    }

    #[test]
    fn slide_count_from_page_number() {
        let doc = page(r#"<span data-cy="page-number">3 of 57</span>"#);
        assert_eq!(extract_slide_count(&doc), Lookup::Found(57));
    }

    #[test]
    fn slide_count_uses_first_indicator() {
        let doc = page(
            r#"<span data-cy="page-number">1 of 12</span><span data-cy="page-number">1 of 99</span>"#,
        );
        assert_eq!(extract_slide_count(&doc), Lookup::Found(12));
    }

    #[test]
    fn slide_count_absent() {
        let doc = page("<p>nothing here</p>");
        assert!(matches!(extract_slide_count(&doc), Lookup::NotFound(_)));
    }

    #[test]
    fn slide_count_without_separator() {
        let doc = page(r#"<span data-cy="page-number">57</span>"#);
        assert!(matches!(extract_slide_count(&doc), Lookup::NotFound(_)));
    }

    #[test]
    fn slide_count_not_numeric() {
        let doc = page(r#"<span data-cy="page-number">3 of many</span>"#);
        assert!(matches!(extract_slide_count(&doc), Lookup::Malformed(_)));
    }

    #[test]
    fn highest_variant_is_last_entry() {
        let doc = page(&format!(r#"<img id="slide-image-0" srcset="{SRCSET}">"#));
        assert_eq!(
            extract_highest_variant(&doc),
            Lookup::Found(SlideImageVariant {
                pixel_width: 2048,
                url: "https://image.slidesharecdn.com/deck/85/deck-1-2048.jpg".into(),
            })
        );
    }

    #[test]
    fn highest_variant_with_three_widths() {
        let lookup =
            highest_variant("https://a/x-1-100 100w, https://a/x-1-640 640w, https://a/x-1-1200 1200w");
        let Lookup::Found(v) = lookup else {
            panic!("expected a variant, got {lookup:?}");
        };
        assert_eq!(v.pixel_width, 1200);
        assert_eq!(v.url, "https://a/x-1-1200");
    }

    #[test]
    fn trailing_empty_entry_is_malformed() {
        assert!(matches!(
            highest_variant("https://a/x-1-100 100w, https://a/x-1-640 640w,"),
            Lookup::Malformed(_)
        ));
    }

    #[test]
    fn missing_image_is_not_found() {
        let doc = page(r#"<img id="slide-image-1" srcset="a 1w, b 2w">"#);
        assert!(matches!(extract_highest_variant(&doc), Lookup::NotFound(_)));
    }

    #[test]
    fn missing_srcset_is_not_found() {
        let doc = page(r#"<img id="slide-image-0" src="a.jpg">"#);
        assert!(matches!(extract_highest_variant(&doc), Lookup::NotFound(_)));
    }

    #[test]
    fn single_resolution_is_not_found() {
        assert!(matches!(highest_variant("https://a/x-1-638 638w"), Lookup::NotFound(_)));
    }

    #[test]
    fn non_numeric_width_is_malformed() {
        assert!(matches!(
            highest_variant("https://a/x 1w, https://a/y widew"),
            Lookup::Malformed(_)
        ));
    }

    #[test]
    fn wrong_token_count_is_malformed() {
        assert!(matches!(
            highest_variant("https://a/x 1w, https://a/y 2x 2048w"),
            Lookup::Malformed(_)
        ));
    }

    #[test]
    fn title_drops_site_suffix() {
        let doc = page("");
        assert_eq!(extract_title(&doc), "Quarterly Review");
    }

    #[test]
    fn missing_title_is_empty() {
        let doc = Html::parse_document("<html><body></body></html>");
        assert_eq!(extract_title(&doc), "");
    }

    #[test]
    fn scrape_reads_everything() {
        let html = format!(
            r#"<html><head><title>Deck | Site</title></head><body>
            <span data-cy="page-number">1 of 3</span>
            <img id="slide-image-0" srcset="{SRCSET}"></body></html>"#
        );
        let s = scrape(&html);
        assert_eq!(s.title, "Deck");
        assert_eq!(s.slide_count, Lookup::Found(3));
        assert!(matches!(s.variant, Lookup::Found(ref v) if v.pixel_width == 2048));
    }
}
