//! Slide URL templates: turn the sampled slide-1 URL into a pattern valid
//! for every slide of the deck.
//!
//! Slide image URLs encode the 1-based slide index immediately followed by
//! the pixel width, e.g. `…/deck-1-2048.jpg` for slide 1 and
//! `…/deck-17-2048.jpg` for slide 17. Replacing the single `-1-<width>`
//! occurrence with a placeholder yields the template.

use crate::error::DeckError;
use crate::pipeline::extract::SlideImageVariant;
use serde::{Deserialize, Serialize};

/// Token standing in for the slide index inside [`SlideUrlTemplate::pattern`].
pub const PLACEHOLDER: &str = "SLIDE_NUMBER";

/// A parametrised slide image URL. Immutable once derived.
///
/// [`Self::pattern`] is the display form; URLs are built from the text
/// around the index, so a literal [`PLACEHOLDER`] elsewhere in the URL is
/// left alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlideUrlTemplate {
    pub pixel_width: u32,
    pub pattern: String,
    prefix: String,
    suffix: String,
}

/// One slide to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    /// 1-based slide index.
    pub index: u32,
    pub url: String,
}

impl SlideUrlTemplate {
    /// Derive the template from the highest-resolution variant of slide 1.
    ///
    /// Fails with [`DeckError::TemplateMismatch`] when `-1-<width>` does not
    /// occur exactly once in the URL.
    pub fn derive(variant: &SlideImageVariant) -> Result<Self, DeckError> {
        let marker = format!("-1-{}", variant.pixel_width);
        let pieces: Vec<&str> = variant.url.split(marker.as_str()).collect();

        let &[prefix, suffix] = pieces.as_slice() else {
            return Err(DeckError::TemplateMismatch {
                url: variant.url.clone(),
                marker,
            });
        };

        Ok(Self {
            pixel_width: variant.pixel_width,
            pattern: format!("{prefix}-{PLACEHOLDER}-{}{suffix}", variant.pixel_width),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// The image URL of slide `index` (1-based).
    pub fn url_for(&self, index: u32) -> String {
        format!("{}-{index}-{}{}", self.prefix, self.pixel_width, self.suffix)
    }

    /// One job per slide, in index order `1..=slide_count`.
    pub fn jobs(&self, slide_count: u32) -> Vec<FetchJob> {
        (1..=slide_count)
            .map(|index| FetchJob {
                index,
                url: self.url_for(index),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "https://image.slidesharecdn.com/deck-230101/85/deck-1-1200.jpg?cb=1672531200";

    fn variant(url: &str, width: u32) -> SlideImageVariant {
        SlideImageVariant {
            pixel_width: width,
            url: url.to_string(),
        }
    }

    #[test]
    fn derive_replaces_marker() {
        let t = SlideUrlTemplate::derive(&variant(SAMPLE, 1200)).unwrap();
        assert_eq!(t.pixel_width, 1200);
        assert_eq!(
            t.pattern,
            "https://image.slidesharecdn.com/deck-230101/85/deck-SLIDE_NUMBER-1200.jpg?cb=1672531200"
        );
    }

    #[test]
    fn substitution_changes_only_the_index() {
        let t = SlideUrlTemplate::derive(&variant(SAMPLE, 1200)).unwrap();
        assert_eq!(t.url_for(5), SAMPLE.replace("-1-1200", "-5-1200"));
    }

    #[test]
    fn placeholder_text_in_url_is_kept() {
        let url = "https://cdn.example.com/SLIDE_NUMBER/deck-1-800.jpg";
        let t = SlideUrlTemplate::derive(&variant(url, 800)).unwrap();
        assert_eq!(t.url_for(7), "https://cdn.example.com/SLIDE_NUMBER/deck-7-800.jpg");
        assert_eq!(t.url_for(1), url);
    }

    #[test]
    fn index_one_round_trips() {
        let t = SlideUrlTemplate::derive(&variant(SAMPLE, 1200)).unwrap();
        assert_eq!(t.url_for(1), SAMPLE);
    }

    #[test]
    fn derive_is_deterministic() {
        let v = variant(SAMPLE, 1200);
        assert_eq!(
            SlideUrlTemplate::derive(&v).unwrap(),
            SlideUrlTemplate::derive(&v).unwrap()
        );
    }

    #[test]
    fn missing_marker_fails() {
        let err = SlideUrlTemplate::derive(&variant(
            "https://image.slidesharecdn.com/deck/85/deck-2-1200.jpg",
            1200,
        ))
        .unwrap_err();
        assert!(matches!(err, DeckError::TemplateMismatch { .. }));
    }

    #[test]
    fn marker_with_other_width_fails() {
        assert!(SlideUrlTemplate::derive(&variant(SAMPLE, 638)).is_err());
    }

    #[test]
    fn repeated_marker_fails() {
        let url = "https://cdn.example.com/a-1-1200/deck-1-1200.jpg";
        assert!(SlideUrlTemplate::derive(&variant(url, 1200)).is_err());
    }

    #[test]
    fn jobs_cover_every_index_once() {
        let t = SlideUrlTemplate::derive(&variant(SAMPLE, 1200)).unwrap();
        let jobs = t.jobs(10);
        let indices: Vec<u32> = jobs.iter().map(|j| j.index).collect();
        assert_eq!(indices, (1..=10).collect::<Vec<_>>());
        assert!(jobs[9].url.contains("-10-1200"));
    }

    #[test]
    fn zero_slides_means_no_jobs() {
        let t = SlideUrlTemplate::derive(&variant(SAMPLE, 1200)).unwrap();
        assert!(t.jobs(0).is_empty());
    }
}
