//! Result types produced by the conversion pipeline.
//!
//! Per-unit results ([`ExtractedUnit`]) keep their own error so that a single
//! bad page never costs the rest of the document; [`ConversionReport`]
//! plays the same role one level up, for files in directory mode.

use crate::error::UnitError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One rendered page or slide, 1-based `ordinal` within its document.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub ordinal: usize,
    pub image: DynamicImage,
}

impl PageImage {
    pub fn new(ordinal: usize, image: DynamicImage) -> Self {
        Self { ordinal, image }
    }
}

/// Which instruction set and unit marker apply to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionContext {
    /// A page rendered from a PDF.
    PdfPage,
    /// A slide rendered from a presentation.
    Slide,
    /// Anything else.
    Generic,
}

impl ExtractionContext {
    /// Parse a context tag; unrecognised tags map to [`ExtractionContext::Generic`].
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "pdf" | "pdf_page" | "page" => Self::PdfPage,
            "slide" | "powerpoint" | "presentation" => Self::Slide,
            _ => Self::Generic,
        }
    }

    /// Noun used in placeholders and progress messages.
    pub fn unit_noun(self) -> &'static str {
        match self {
            Self::Slide => "slide",
            Self::PdfPage | Self::Generic => "page",
        }
    }

    /// Marker that opens a unit section.
    pub fn marker(self, ordinal: usize) -> String {
        match self {
            Self::Slide => format!("<!-- Slide {ordinal} -->"),
            Self::PdfPage | Self::Generic => format!("## Page {ordinal}"),
        }
    }

    /// Italic text substituted for a unit whose extraction failed.
    pub fn placeholder(self) -> String {
        format!("*[Could not extract text from this {}]*", self.unit_noun())
    }
}

/// Result of extracting one page or slide.
///
/// `text` always begins with the unit marker; on failure the body is the
/// context's placeholder and `error` carries the diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedUnit {
    pub ordinal: usize,
    pub context: ExtractionContext,
    pub text: String,
    pub error: Option<UnitError>,
}

impl ExtractedUnit {
    /// A unit whose body came back from the endpoint.
    pub fn extracted(ordinal: usize, context: ExtractionContext, body: &str) -> Self {
        Self {
            ordinal,
            context,
            text: format!("{}\n\n{}", context.marker(ordinal), body),
            error: None,
        }
    }

    /// A unit whose extraction failed; the body is the placeholder.
    pub fn failed(ordinal: usize, context: ExtractionContext, error: UnitError) -> Self {
        Self {
            ordinal,
            context,
            text: format!("{}\n\n{}", context.marker(ordinal), context.placeholder()),
            error: Some(error),
        }
    }

    pub fn is_extracted(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of enhancing one group of units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementOutcome {
    /// Enhanced Markdown, or the unmodified input when `applied` is false.
    pub text: String,
    /// Whether the endpoint's answer replaced the input.
    pub applied: bool,
}

impl EnhancementOutcome {
    pub fn applied(text: String) -> Self {
        Self { text, applied: true }
    }

    pub fn fallback(original: &str) -> Self {
        Self {
            text: original.to_string(),
            applied: false,
        }
    }
}

/// Coarse document type, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Presentation,
}

impl DocumentKind {
    /// Context used for every unit of this kind of document.
    pub fn context(self) -> ExtractionContext {
        match self {
            Self::Pdf => ExtractionContext::PdfPage,
            Self::Presentation => ExtractionContext::Slide,
        }
    }
}

/// Statistics for one converted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_units: usize,
    pub extracted_units: usize,
    pub failed_units: usize,
    /// Enhancement groups sent (0 when enhancement did not run).
    pub groups: usize,
    /// Groups whose enhanced text replaced the raw text.
    pub groups_enhanced: usize,
    /// Pacing pauses taken while converting this document.
    pub pauses: usize,
    pub duration_ms: u64,
}

/// Full result of converting one document in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub markdown: String,
    pub units: Vec<ExtractedUnit>,
    pub stats: ConversionStats,
}

/// Outcome for one file of a directory run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub input: PathBuf,
    /// Written Markdown file; `None` when the file failed.
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

/// Ordered per-file outcomes of a directory run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub entries: Vec<ReportEntry>,
}

impl ConversionReport {
    pub fn record_success(&mut self, input: PathBuf, output: PathBuf) {
        self.entries.push(ReportEntry {
            input,
            output: Some(output),
            error: None,
        });
    }

    pub fn record_failure(&mut self, input: PathBuf, error: String) {
        self.entries.push(ReportEntry {
            input,
            output: None,
            error: Some(error),
        });
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.output.is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }
}
