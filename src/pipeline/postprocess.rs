//! Deterministic cleanup of model output before it enters the document.
//!
//! Even with explicit instructions, vision models occasionally wrap the
//! answer in a ```` ```markdown ```` fence, answer with CRLF line endings or
//! pad lines with spaces. These rules undo that without touching content.
//! They run on each unit body (and each enhanced group) when
//! [`crate::PipelineConfig::clean_output`] is set.
//!
//! Order matters: fences are detected on the raw answer, line endings are
//! normalised before per-line trimming, and blank-line collapsing runs last
//! so it sees the already trimmed lines.

use once_cell::sync::Lazy;
use regex::Regex;

/// A single cleanup rule.
type Rule = fn(&str) -> String;

const RULES: &[(&str, Rule)] = &[
    ("strip outer fence", strip_outer_fence),
    ("normalise line endings", normalise_line_endings),
    ("drop invisible characters", drop_invisible_chars),
    ("trim line ends", trim_line_ends),
    ("collapse blank runs", collapse_blank_runs),
];

/// Apply every cleanup rule in order, then trim the result.
///
/// Unlike a whole-file formatter this never appends a trailing newline: the
/// assembler owns the separators between units.
pub fn clean_unit_text(input: &str) -> String {
    let cleaned = RULES
        .iter()
        .fold(input.to_string(), |text, (_, rule)| rule(&text));
    cleaned.trim().to_string()
}

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[ \t]*(markdown|md)?[ \t]*\r?\n(.*?)\r?\n```[ \t]*$")
        .expect("fence regex is valid")
});

/// An unlabelled fence is only an outer wrapper when nothing inside it
/// opens or closes another block; otherwise the answer is two code blocks
/// with prose between them.
fn strip_outer_fence(input: &str) -> String {
    let Some(caps) = RE_OUTER_FENCE.captures(input.trim()) else {
        return input.to_string();
    };
    let labelled = caps.get(1).is_some();
    let body = &caps[2];
    let nested = body.lines().any(|l| l.trim_start().starts_with("```"));
    if labelled || !nested {
        body.to_string()
    } else {
        input.to_string()
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// Zero-width space, BOM, soft hyphen, zero-width (non-)joiner, word joiner.
const INVISIBLE: [char; 6] = [
    '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
];

fn drop_invisible_chars(input: &str) -> String {
    input.replace(INVISIBLE, "")
}

fn trim_line_ends(input: &str) -> String {
    input
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank-run regex is valid"));

/// At most one empty line between paragraphs.
fn collapse_blank_runs(input: &str) -> String {
    RE_BLANK_RUN.replace_all(input, "\n\n").into_owned()
}
