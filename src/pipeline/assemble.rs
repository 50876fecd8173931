//! Final document assembly.
//!
//! ```text
//! # <file name>
//!
//! *<provenance>*
//!
//! <section 1>
//!
//! ---
//!
//! <section 2>
//! ```
//!
//! No trailing newline is appended after the last section.

use crate::output::DocumentKind;

/// Separator between sections of the final document.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Title line and provenance note for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    /// Source file name including its extension.
    pub file_name: String,
    pub kind: DocumentKind,
    /// Whether the enhancement stage ran.
    pub enhanced: bool,
}

impl DocumentHeader {
    pub fn provenance(&self) -> &'static str {
        match (self.kind, self.enhanced) {
            (DocumentKind::Pdf, _) => "Converted from PDF",
            (DocumentKind::Presentation, false) => "Converted from PowerPoint presentation",
            (DocumentKind::Presentation, true) => {
                "Converted from PowerPoint presentation with enhancement"
            }
        }
    }
}

/// Build the final Markdown document from ordered section texts.
pub fn assemble_document(header: &DocumentHeader, sections: &[String]) -> String {
    let mut doc = format!("# {}\n\n*{}*\n\n", header.file_name, header.provenance());
    doc.push_str(&sections.join(SECTION_SEPARATOR));
    doc
}
