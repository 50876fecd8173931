//! Pipeline stages for document-to-Markdown conversion.
//!
//! Each submodule implements one step; the [`crate::Converter`] wires them
//! together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ slides ──▶ render ──▶ units ──▶ batch ──▶ assemble
//! (validate) (soffice)  (pdfium)  (extract)  (enhance)  (markdown)
//! ```
//!
//! 1. [`input`]: validate the file and derive a [`input::ConversionJob`]
//! 2. [`slides`]: LibreOffice → PDF in a temp dir (presentations only)
//! 3. [`render`]: rasterise every page; runs in `spawn_blocking`
//! 4. [`units`]: per page: [`normalize`] → [`encode`] → [`client`]
//!    (decoded by [`response`]) → [`postprocess`]
//! 5. [`batch`]: group enhancement (presentations only)
//! 6. [`assemble`]: title, provenance and separators
//!
//! Every loop that talks to the endpoint is paced by [`pace::run_paced`].

pub mod assemble;
pub mod batch;
pub mod client;
pub mod encode;
pub mod input;
pub mod normalize;
pub mod pace;
pub mod postprocess;
pub mod render;
pub mod response;
pub mod slides;
pub mod units;
