//! Instruction sets sent as the system message to the remote model.
//!
//! One constant per [`ExtractionContext`] plus the batch-enhancement prompt.
//! Keeping them together means wording changes touch exactly one file, and
//! tests can inspect them without a live endpoint.

use crate::output::ExtractionContext;

/// Fallback instructions for a page of unknown provenance.
pub const GENERIC_PROMPT: &str = r#"You convert an image of a document page into clean Markdown.

- Transcribe ALL visible text, in reading order.
- Keep the document's structure: headings, paragraphs, lists.
- Render tables with Markdown pipe syntax.
- Describe diagrams or pictures briefly in italics.
- Output only the Markdown. No commentary, no surrounding code fence."#;

/// Instructions for one rendered PDF page.
pub const PDF_PAGE_PROMPT: &str = r#"You convert one page of a PDF document into Markdown.

- Transcribe ALL visible text; merge multi-column layouts into a single logical flow.
- Use heading levels that reflect the page hierarchy.
- Keep bold, italic and code formatting; use fenced blocks for code.
- Render tables with Markdown pipe syntax.
- Keep footnotes and references, placed after the text that cites them.
- Output only the Markdown. No commentary, no surrounding code fence."#;

/// Instructions for one rendered presentation slide.
pub const SLIDE_PROMPT: &str = r#"You convert an image of a single presentation slide into Markdown.

1. Transcribe ALL visible text; do not invent content that is not on the slide.
2. Use exactly one # heading for the slide title.
3. Use ### (never ##) for sub-headings and section labels.
4. Turn bullets into Markdown lists; indent nested bullets by two spaces.
5. Render tables with | separators and numbered lists as 1. 2. 3.
6. Keep links, captions, annotations and speaker-visible footnotes.
7. When boxes are joined by arrows or connectors, draw the diagram as a ```mermaid block.
   Boxes without connectors are not a diagram.

The output is written straight into a .md file: do NOT wrap it in ```markdown."#;

/// Instructions for cleaning up a group of already-extracted slides.
pub const BATCH_ENHANCEMENT_PROMPT: &str = r#"You receive the raw Markdown of several consecutive presentation slides.
Each slide starts with a marker such as <!-- Slide 3 -->.

Rewrite them into consistent, well-structured Markdown:

1. Keep EVERY piece of text; drop nothing.
2. Keep every <!-- Slide N --> marker exactly as given, in the same order.
3. One # heading per slide; ### for sub-headings (never ##).
4. Repair bullet nesting using two-space indentation; fix broken numbered lists.
5. Align tables with | separators.
6. Keep hyperlinks, bold, italic, code and mermaid blocks intact.
7. Normalise spacing without changing meaning.

The output is written straight into a .md file: do NOT wrap it in ```markdown."#;

/// Select the system prompt for a unit's context.
pub fn instructions_for(context: ExtractionContext) -> &'static str {
    match context {
        ExtractionContext::PdfPage => PDF_PAGE_PROMPT,
        ExtractionContext::Slide => SLIDE_PROMPT,
        ExtractionContext::Generic => GENERIC_PROMPT,
    }
}

/// Lead-in placed before the encoded image in the user message.
pub const EXTRACTION_USER_PREFIX: &str = "Convert this image to Markdown:";
