//! Integration tests for the conversion pipeline.
//!
//! The remote endpoint, pdfium and LibreOffice are replaced by scripted
//! in-process doubles, so these tests need neither network nor native
//! libraries. Tokio's clock is paused: the 10-second rate-limit pauses
//! complete instantly while still being counted.

use async_trait::async_trait;
use edgequake_docvision::pipeline::input::prepare_job;
use edgequake_docvision::{
    Cancellation, Converter, Credentials, DocVisionError, EnhancementOutcome, ExtractionContext,
    PageImage, PageRenderer, PipelineConfig, PresentationConverter, ProgressReporter, UnitError,
};
use image::{DynamicImage, RgbImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Answers `A`, `B`, `C`, … by ordinal; fails the listed ordinals.
#[derive(Default)]
struct ScriptedService {
    fail_ordinals: Vec<usize>,
    /// `None` → enhancement falls back; `Some(prefix)` → prefix + input.
    enhance_prefix: Option<&'static str>,
    /// Cancel this handle after the given number of extract calls.
    cancel_after: Option<(usize, Cancellation)>,
    extract_calls: AtomicUsize,
    enhance_inputs: Mutex<Vec<String>>,
}

#[async_trait]
impl edgequake_docvision::VisionService for ScriptedService {
    async fn extract(
        &self,
        page: &PageImage,
        _context: ExtractionContext,
    ) -> Result<String, UnitError> {
        let calls = self.extract_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((n, cancel)) = &self.cancel_after {
            if calls == *n {
                cancel.cancel();
            }
        }
        if self.fail_ordinals.contains(&page.ordinal) {
            return Err(UnitError::Timeout { secs: 120 });
        }
        let letter = (b'A' + (page.ordinal as u8 - 1)) as char;
        Ok(letter.to_string())
    }

    async fn enhance(&self, group_text: &str) -> EnhancementOutcome {
        self.enhance_inputs
            .lock()
            .unwrap()
            .push(group_text.to_string());
        match self.enhance_prefix {
            Some(prefix) => EnhancementOutcome::applied(format!("{prefix}{group_text}")),
            None => EnhancementOutcome::fallback(group_text),
        }
    }
}

/// Renders `pages[stem]` blank pages; stems in `broken` fail.
#[derive(Default)]
struct FakeRenderer {
    pages: HashMap<String, usize>,
    broken: Vec<String>,
    rendered: Mutex<Vec<String>>,
}

impl FakeRenderer {
    fn with(pages: &[(&str, usize)]) -> Self {
        Self {
            pages: pages.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, path: &Path, _dpi: u32) -> Result<Vec<PageImage>, DocVisionError> {
        let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
        self.rendered.lock().unwrap().push(stem.clone());

        if self.broken.contains(&stem) {
            return Err(DocVisionError::CorruptPdf {
                path: path.to_path_buf(),
                detail: "trailer not found".into(),
            });
        }
        let n = self.pages.get(&stem).copied().unwrap_or(0);
        if n == 0 {
            return Err(DocVisionError::NoPages {
                path: path.to_path_buf(),
            });
        }
        Ok((1..=n)
            .map(|i| PageImage::new(i, DynamicImage::ImageRgb8(RgbImage::new(64, 48))))
            .collect())
    }
}

/// Writes `<stem>.pdf` into the scratch directory.
#[derive(Default)]
struct FakeSlides {
    calls: AtomicUsize,
}

#[async_trait]
impl PresentationConverter for FakeSlides {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, DocVisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
        let pdf = out_dir.join(format!("{stem}.pdf"));
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        Ok(pdf)
    }
}

#[derive(Default)]
struct Recorder {
    pauses: AtomicUsize,
    events: Mutex<Vec<String>>,
}

impl ProgressReporter for Recorder {
    fn on_pause(&self, _duration: Duration) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unit_error(&self, ordinal: usize, _total: usize, _error: &str) {
        self.events.lock().unwrap().push(format!("unit-error {ordinal}"));
    }

    fn on_document_start(&self, path: &Path, index: usize, total: usize) {
        let name = path.file_name().unwrap().to_string_lossy();
        self.events
            .lock()
            .unwrap()
            .push(format!("start {name} {index}/{total}"));
    }

    fn on_document_error(&self, input: &Path, _error: &str) {
        let name = input.file_name().unwrap().to_string_lossy();
        self.events.lock().unwrap().push(format!("error {name}"));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn config() -> PipelineConfig {
    let creds = Credentials::new("https://llm.internal.example/v1/chat", "token").unwrap();
    PipelineConfig::builder(creds)
        .pause(Duration::from_secs(10))
        .batch_size(2)
        .build()
        .unwrap()
}

fn converter(
    config: PipelineConfig,
    service: Arc<ScriptedService>,
    renderer: Arc<FakeRenderer>,
) -> Converter {
    Converter::with_components(config, service, renderer, Arc::new(FakeSlides::default()))
}

fn write_pdf(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"%PDF-1.4\n%fake\n").unwrap();
    path
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn two_page_pdf_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(&dir, "report.pdf");
    let recorder = Arc::new(Recorder::default());

    let conv = converter(
        config(),
        Arc::new(ScriptedService::default()),
        Arc::new(FakeRenderer::with(&[("report", 2)])),
    )
    .with_reporter(recorder.clone());

    let written = conv.convert_file(&pdf, None).await.unwrap();

    assert_eq!(written, dir.path().join("report.md"));
    assert_eq!(
        std::fs::read_to_string(&written).unwrap(),
        "# report.pdf\n\n*Converted from PDF*\n\n## Page 1\n\nA\n\n---\n\n## Page 2\n\nB"
    );
    assert_eq!(recorder.pauses.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_page_keeps_its_place() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(&dir, "scan.pdf");
    let cfg = config();
    let job = prepare_job(&pdf, None, &cfg).unwrap();

    let recorder = Arc::new(Recorder::default());
    let conv = converter(
        cfg,
        Arc::new(ScriptedService {
            fail_ordinals: vec![3],
            ..Default::default()
        }),
        Arc::new(FakeRenderer::with(&[("scan", 5)])),
    )
    .with_reporter(recorder.clone());

    let out = conv.convert_document(&job).await.unwrap();

    let sections: Vec<&str> = out
        .markdown
        .split_once("*Converted from PDF*\n\n")
        .unwrap()
        .1
        .split("\n\n---\n\n")
        .collect();
    assert_eq!(
        sections,
        vec![
            "## Page 1\n\nA",
            "## Page 2\n\nB",
            "## Page 3\n\n*[Could not extract text from this page]*",
            "## Page 4\n\nD",
            "## Page 5\n\nE",
        ]
    );
    assert_eq!(out.stats.total_units, 5);
    assert_eq!(out.stats.extracted_units, 4);
    assert_eq!(out.stats.failed_units, 1);
    assert_eq!(out.stats.pauses, 4);
    assert_eq!(recorder.pauses.load(Ordering::SeqCst), 4);
    assert_eq!(*recorder.events.lock().unwrap(), vec!["unit-error 3"]);
}

#[tokio::test(start_paused = true)]
async fn conversion_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(&dir, "same.pdf");
    let cfg = config();
    let job = prepare_job(&pdf, None, &cfg).unwrap();
    let conv = converter(
        cfg,
        Arc::new(ScriptedService::default()),
        Arc::new(FakeRenderer::with(&[("same", 3)])),
    );

    let first = conv.convert_document(&job).await.unwrap();
    let second = conv.convert_document(&job).await.unwrap();
    assert_eq!(first.markdown, second.markdown);
    assert_eq!(first.units, second.units);
}

#[tokio::test(start_paused = true)]
async fn slide_enhancement_fallback_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let deck = dir.path().join("deck.pptx");
    std::fs::write(&deck, b"PK\x03\x04").unwrap();
    let cfg = config();
    let job = prepare_job(&deck, None, &cfg).unwrap();

    let service = Arc::new(ScriptedService::default());
    let conv = converter(
        cfg,
        service.clone(),
        Arc::new(FakeRenderer::with(&[("deck", 3)])),
    );

    let out = conv.convert_document(&job).await.unwrap();

    let inputs = service.enhance_inputs.lock().unwrap().clone();
    assert_eq!(
        inputs,
        vec![
            "<!-- Slide 1 -->\n\nA\n\n<!-- Slide 2 -->\n\nB".to_string(),
            "<!-- Slide 3 -->\n\nC".to_string(),
        ]
    );
    assert_eq!(
        out.markdown,
        format!(
            "# deck.pptx\n\n*Converted from PowerPoint presentation with enhancement*\n\n{}\n\n---\n\n{}",
            inputs[0], inputs[1]
        )
    );
    assert_eq!(out.stats.groups, 2);
    assert_eq!(out.stats.groups_enhanced, 0);
    // 2 between slides + 1 between groups
    assert_eq!(out.stats.pauses, 3);
}

#[tokio::test(start_paused = true)]
async fn applied_enhancement_replaces_group_text() {
    let dir = tempfile::tempdir().unwrap();
    let deck = dir.path().join("talk.odp");
    std::fs::write(&deck, b"PK\x03\x04").unwrap();

    let conv = converter(
        config(),
        Arc::new(ScriptedService {
            enhance_prefix: Some("polished: "),
            ..Default::default()
        }),
        Arc::new(FakeRenderer::with(&[("talk", 2)])),
    );

    let written = conv.convert_file(&deck, None).await.unwrap();
    let md = std::fs::read_to_string(written).unwrap();
    assert!(md.ends_with("polished: <!-- Slide 1 -->\n\nA\n\n<!-- Slide 2 -->\n\nB"));
    assert!(!md.contains("\n\n---\n\n"));
}

#[tokio::test(start_paused = true)]
async fn no_enhance_uses_plain_slide_sections() {
    let dir = tempfile::tempdir().unwrap();
    let deck = dir.path().join("deck.ppt");
    std::fs::write(&deck, b"\xD0\xCF\x11\xE0").unwrap();
    let creds = Credentials::new("https://llm.internal.example/v1/chat", "token").unwrap();
    let cfg = PipelineConfig::builder(creds)
        .enhance(false)
        .build()
        .unwrap();

    let service = Arc::new(ScriptedService::default());
    let conv = converter(
        cfg,
        service.clone(),
        Arc::new(FakeRenderer::with(&[("deck", 2)])),
    );
    let written = conv.convert_file(&deck, None).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(written).unwrap(),
        "# deck.ppt\n\n*Converted from PowerPoint presentation*\n\n\
         <!-- Slide 1 -->\n\nA\n\n---\n\n<!-- Slide 2 -->\n\nB"
    );
    assert!(service.enhance_inputs.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn directory_run_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        write_pdf(&dir, name);
    }
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let renderer = Arc::new(FakeRenderer {
        broken: vec!["b".into()],
        ..FakeRenderer::with(&[("a", 1), ("c", 1)])
    });
    let recorder = Arc::new(Recorder::default());
    let conv = converter(config(), Arc::new(ScriptedService::default()), renderer.clone())
        .with_reporter(recorder.clone());

    let report = conv
        .convert_directory(dir.path(), Some(out.path()))
        .await
        .unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.entries[0].output, Some(out.path().join("a.md")));
    assert_eq!(report.entries[1].output, None);
    assert!(report.entries[1].error.as_deref().unwrap().contains("trailer"));
    assert_eq!(report.entries[2].output, Some(out.path().join("c.md")));

    assert_eq!(*renderer.rendered.lock().unwrap(), vec!["a", "b", "c"]);
    assert!(!out.path().join("b.md").exists());
    // One pause between each pair of files, single-page documents add none.
    assert_eq!(recorder.pauses.load(Ordering::SeqCst), 2);
    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start a.pdf 1/3", "start b.pdf 2/3", "error b.pdf", "start c.pdf 3/3"]
    );
}

#[tokio::test(start_paused = true)]
async fn empty_directory_gives_empty_report() {
    let dir = tempfile::tempdir().unwrap();
    let conv = converter(
        config(),
        Arc::new(ScriptedService::default()),
        Arc::new(FakeRenderer::default()),
    );
    let report = conv.convert_directory(dir.path(), None).await.unwrap();
    assert_eq!(report.total(), 0);
}

#[tokio::test(start_paused = true)]
async fn directory_mode_rejects_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(&dir, "a.pdf");
    let conv = converter(
        config(),
        Arc::new(ScriptedService::default()),
        Arc::new(FakeRenderer::default()),
    );
    let err = conv.convert_directory(&pdf, None).await.unwrap_err();
    assert!(matches!(err, DocVisionError::NotADirectory { .. }));
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(&dir, "long.pdf");
    let cancel = Cancellation::new();

    let service = Arc::new(ScriptedService {
        cancel_after: Some((2, cancel.clone())),
        ..Default::default()
    });
    let conv = converter(
        config(),
        service.clone(),
        Arc::new(FakeRenderer::with(&[("long", 10)])),
    )
    .with_cancellation(cancel);

    let err = conv.convert_file(&pdf, None).await.unwrap_err();
    assert!(matches!(err, DocVisionError::Cancelled));
    assert_eq!(service.extract_calls.load(Ordering::SeqCst), 2);
    assert!(!dir.path().join("long.md").exists());
}

#[tokio::test(start_paused = true)]
async fn invalid_input_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let fake = dir.path().join("fake.pdf");
    std::fs::write(&fake, b"not a pdf").unwrap();

    let service = Arc::new(ScriptedService::default());
    let conv = converter(
        config(),
        service.clone(),
        Arc::new(FakeRenderer::with(&[("fake", 1)])),
    );
    let err = conv.convert_file(&fake, None).await.unwrap_err();
    assert!(matches!(err, DocVisionError::NotAPdf { .. }));
    assert_eq!(service.extract_calls.load(Ordering::SeqCst), 0);
}
