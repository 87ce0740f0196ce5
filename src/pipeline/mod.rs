//! Pipeline stages for deck-to-presentation conversion.
//!
//! Each submodule implements exactly one step, so each can be tested
//! without the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ template ──▶ fetch ──▶ normalize ──▶ assemble
//! (URL/page) (scraper)   (pattern)   (chunks)   (RGB JPEG)    (.pptx)
//! ```
//!
//! 1. [`input`]     decode the caller's address and download the viewer page
//! 2. [`extract`]   read title, slide count and the widest image variant
//! 3. [`template`]  turn slide 1's URL into a per-slide URL pattern
//! 4. [`fetch`]     download every slide in proxy-sharing chunks; the only
//!    stage besides `input` with network I/O
//! 5. [`normalize`] decode any supported format and re-encode as RGB JPEG;
//!    runs in `spawn_blocking`
//! 6. [`assemble`]  size the pages from slide 1 and write the package

pub mod assemble;
pub mod extract;
pub mod fetch;
pub mod input;
pub mod normalize;
pub mod template;
