//! Result types handed back by the entry points in [`crate::convert`].

use crate::pipeline::template::SlideUrlTemplate;
use serde::{Deserialize, Serialize};

/// What can be learned about a deck from its viewer page alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckMetadata {
    /// The viewer page URL the metadata was read from.
    pub url: String,

    /// Deck title, empty when the page has none.
    pub title: String,

    /// Total slide count, `None` when the page does not state it.
    pub slide_count: Option<u32>,

    /// URL template for the highest-resolution slide images, `None` when
    /// the page carries no multi-resolution descriptor.
    pub template: Option<SlideUrlTemplate>,

    /// Rough download time, `slide_count × seconds_per_slide`.
    pub estimated_seconds: u64,
}

impl DeckMetadata {
    /// The template pattern, or `""` when none was found.
    pub fn template_url(&self) -> &str {
        self.template.as_ref().map_or("", |t| t.pattern.as_str())
    }
}

/// Timing and size figures for one completed download.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub slide_count: u32,

    /// Number of proxy-sharing chunks the slides were split into.
    pub chunks: usize,

    /// Wall-clock time spent fetching and normalising slides.
    pub fetch_duration_ms: u64,

    /// Wall-clock time of the whole request, page fetch to package bytes.
    pub total_duration_ms: u64,

    /// Size of the generated `.pptx` package.
    pub output_bytes: usize,
}

/// A finished presentation.
#[derive(Debug, Clone)]
pub struct DeckOutput {
    /// The `.pptx` package.
    pub bytes: Vec<u8>,
    pub metadata: DeckMetadata,
    pub stats: DownloadStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::SlideImageVariant;

    fn metadata(template: Option<SlideUrlTemplate>) -> DeckMetadata {
        DeckMetadata {
            url: "https://www.slideshare.net/someone/deck".into(),
            title: "Deck".into(),
            slide_count: Some(3),
            template,
            estimated_seconds: 6,
        }
    }

    #[test]
    fn template_url_is_empty_without_template() {
        assert_eq!(metadata(None).template_url(), "");
    }

    #[test]
    fn template_url_is_the_pattern() {
        let t = SlideUrlTemplate::derive(&SlideImageVariant {
            pixel_width: 1200,
            url: "https://cdn.example.com/deck-1-1200.jpg".into(),
        })
        .unwrap();
        assert_eq!(
            metadata(Some(t)).template_url(),
            "https://cdn.example.com/deck-SLIDE_NUMBER-1200.jpg"
        );
    }

    #[test]
    fn metadata_serialises_to_json() {
        let json = serde_json::to_value(metadata(None)).unwrap();
        assert_eq!(json["slide_count"], 3);
        assert!(json["template"].is_null());
    }
}
