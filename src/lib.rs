//! # edgequake-docvision
//!
//! Convert PDF documents and slide decks to Markdown through a rate-limited
//! enterprise vision-model endpoint.
//!
//! ## Why this crate?
//!
//! Text extraction tools lose structure on scanned pages, slides and
//! multi-column layouts. This crate rasterises every page, asks a vision
//! model to transcribe it, and assembles the answers into one Markdown file.
//! The endpoint it targets is shared and rate limited, so the whole pipeline
//! runs strictly one request at a time with a fixed pause between requests,
//! and a failed page never costs the rest of the document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file (.pdf / .pptx / .ppt / .odp)
//!  │
//!  ├─ 1. Validate  size, extension, %PDF magic
//!  ├─ 2. Slides    LibreOffice → PDF (presentations only)
//!  ├─ 3. Render    rasterise pages via pdfium (spawn_blocking)
//!  ├─ 4. Extract   one paced request per page, placeholder on failure
//!  ├─ 5. Enhance   paced group rewrites (presentations only)
//!  └─ 6. Assemble  title + provenance + sections joined by `---`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docvision::{Converter, Credentials, PipelineConfig};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // model_url.txt / JWT_token.txt in the current directory, or
//!     // DOCVISION_ENDPOINT / DOCVISION_TOKEN
//!     let creds = Credentials::load(Path::new("."))?;
//!     let config = PipelineConfig::builder(creds).build()?;
//!     let converter = Converter::new(config)?;
//!     let written = converter.convert_file(Path::new("deck.pptx"), None).await?;
//!     println!("wrote {}", written.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docvision` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docvision = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Credentials, PipelineConfig, PipelineConfigBuilder};
pub use convert::Converter;
pub use error::{DocVisionError, UnitError};
pub use output::{
    ConversionOutput, ConversionReport, ConversionStats, DocumentKind, EnhancementOutcome,
    ExtractedUnit, ExtractionContext, PageImage, ReportEntry,
};
pub use pipeline::client::{EnterpriseClient, VisionService};
pub use pipeline::input::{ConversionJob, SUPPORTED_EXTENSIONS};
pub use pipeline::pace::{Cancellation, Cancelled};
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use pipeline::slides::{LibreOfficeConverter, PresentationConverter};
pub use progress::{NoopReporter, ProgressReporter, Reporter};
