//! Conversion entry points: one document, one file, or a whole directory.
//!
//! [`Converter`] owns the collaborators (remote service, page renderer,
//! presentation converter, progress reporter) and the run configuration.
//! Production code builds it with [`Converter::new`]; tests inject scripted
//! collaborators through [`Converter::with_components`].
//!
//! Failure levels:
//!
//! * a page or slide failing stays inside its [`crate::ExtractedUnit`];
//! * a document failing is an `Err` from [`Converter::convert_file`];
//! * in [`Converter::convert_directory`] that `Err` is recorded in the
//!   [`ConversionReport`] and the run moves on to the next file.

use crate::config::PipelineConfig;
use crate::error::DocVisionError;
use crate::output::{ConversionOutput, ConversionReport, ConversionStats, DocumentKind};
use crate::pipeline::assemble::{assemble_document, DocumentHeader};
use crate::pipeline::batch::enhance_units;
use crate::pipeline::client::{EnterpriseClient, VisionService};
use crate::pipeline::input::{list_supported_files, prepare_job, ConversionJob};
use crate::pipeline::pace::{run_paced, Cancellation, Pacing};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::pipeline::slides::{LibreOfficeConverter, PresentationConverter};
use crate::pipeline::units::process_units;
use crate::progress::{NoopReporter, Reporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Drives documents through the pipeline.
pub struct Converter {
    config: Arc<PipelineConfig>,
    service: Arc<dyn VisionService>,
    renderer: Arc<dyn PageRenderer>,
    slides: Arc<dyn PresentationConverter>,
    reporter: Reporter,
    cancel: Cancellation,
}

impl Converter {
    /// Production wiring: HTTP client, pdfium renderer and LibreOffice.
    pub fn new(config: PipelineConfig) -> Result<Self, DocVisionError> {
        let service = Arc::new(EnterpriseClient::new(&config)?);
        let renderer = Arc::new(PdfiumRenderer::new(config.pdfium_lib_path.clone()));
        let slides = Arc::new(LibreOfficeConverter::new(
            config.libreoffice_path.clone(),
            config.converter_timeout,
        ));
        Ok(Self::with_components(config, service, renderer, slides))
    }

    /// Wire explicit collaborators.
    pub fn with_components(
        config: PipelineConfig,
        service: Arc<dyn VisionService>,
        renderer: Arc<dyn PageRenderer>,
        slides: Arc<dyn PresentationConverter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            service,
            renderer,
            slides,
            reporter: Arc::new(NoopReporter),
            cancel: Cancellation::new(),
        }
    }

    /// Replace the progress reporter.
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Share a cancellation handle with the caller.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    /// Convert a validated job to Markdown in memory.
    pub async fn convert_document(
        &self,
        job: &ConversionJob,
    ) -> Result<ConversionOutput, DocVisionError> {
        let start = Instant::now();
        let config = self.config.as_ref();
        let reporter = self.reporter.as_ref();
        let context = job.kind.context();

        self.cancel.check()?;
        let images = match job.kind {
            DocumentKind::Pdf => self.renderer.render(&job.input, config.dpi).await?,
            DocumentKind::Presentation => {
                let scratch = tempfile::tempdir().map_err(|e| {
                    DocVisionError::Internal(format!("cannot create temp dir: {}", e))
                })?;
                let pdf = self.slides.convert(&job.input, scratch.path()).await?;
                self.renderer.render(&pdf, config.dpi).await?
            }
        };
        if images.is_empty() {
            return Err(DocVisionError::NoPages {
                path: job.input.clone(),
            });
        }
        info!("Rendered {} {}(s)", images.len(), context.unit_noun());

        let units = process_units(
            self.service.as_ref(),
            images,
            context,
            config,
            reporter,
            &self.cancel,
        )
        .await?;

        let mut stats = ConversionStats {
            total_units: units.len(),
            extracted_units: units.iter().filter(|u| u.is_extracted()).count(),
            failed_units: units.iter().filter(|u| !u.is_extracted()).count(),
            pauses: units.len().saturating_sub(1),
            ..Default::default()
        };

        let sections: Vec<String> = if job.enhance {
            let groups =
                enhance_units(self.service.as_ref(), &units, config, reporter, &self.cancel)
                    .await?;
            stats.groups = groups.len();
            stats.groups_enhanced = groups.iter().filter(|g| g.applied).count();
            stats.pauses += groups.len().saturating_sub(1);
            groups.into_iter().map(|g| g.text).collect()
        } else {
            units.iter().map(|u| u.text.clone()).collect()
        };

        let header = DocumentHeader {
            file_name: job
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            kind: job.kind,
            enhanced: job.enhance,
        };
        let markdown = assemble_document(&header, &sections);

        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Converted {}: {}/{} units extracted, {}ms",
            header.file_name, stats.extracted_units, stats.total_units, stats.duration_ms
        );

        Ok(ConversionOutput {
            markdown,
            units,
            stats,
        })
    }

    /// Convert one file and write `<stem>.md` into `output_dir` (or next to
    /// the input). Returns the written path.
    pub async fn convert_file(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf, DocVisionError> {
        self.convert_file_at(input, output_dir, 1, 1).await
    }

    async fn convert_file_at(
        &self,
        input: &Path,
        output_dir: Option<&Path>,
        index: usize,
        total: usize,
    ) -> Result<PathBuf, DocVisionError> {
        self.reporter.on_document_start(input, index, total);

        let result = async {
            let job = prepare_job(input, output_dir, &self.config)?;
            let output = self.convert_document(&job).await?;
            write_atomic(&job.output, &output.markdown).await?;
            Ok::<_, DocVisionError>(job.output)
        }
        .await;

        match &result {
            Ok(path) => {
                info!("Wrote {}", path.display());
                self.reporter.on_document_complete(input, path);
            }
            Err(e) => self.reporter.on_document_error(input, &e.to_string()),
        }
        result
    }

    /// Convert every supported file directly inside `dir`, in path order.
    ///
    /// Per-file failures are recorded in the report and never stop the run.
    /// Fails only when `dir` is not a readable directory or the run is
    /// cancelled.
    pub async fn convert_directory(
        &self,
        dir: &Path,
        output_dir: Option<&Path>,
    ) -> Result<ConversionReport, DocVisionError> {
        let files = list_supported_files(dir)?;
        let total = files.len();
        if total == 0 {
            info!("No supported files found in {}", dir.display());
            return Ok(ConversionReport::default());
        }
        info!(
            "Found {} file(s); pausing {:?} between requests",
            total, self.config.pause
        );

        let pacing = Pacing {
            pause: self.config.pause,
            reporter: self.reporter.as_ref(),
            cancel: &self.cancel,
        };

        let outcomes = run_paced(files, &pacing, move |idx, file| async move {
            let result = self.convert_file_at(&file, output_dir, idx + 1, total).await;
            (file, result)
        })
        .await?;

        let mut report = ConversionReport::default();
        for (file, result) in outcomes {
            match result {
                Ok(path) => report.record_success(file, path),
                Err(DocVisionError::Cancelled) => return Err(DocVisionError::Cancelled),
                Err(e) => {
                    error!("Failed: {} - {}", file.display(), e);
                    report.record_failure(file, e.to_string());
                }
            }
        }

        info!(
            "Directory complete: {}/{} converted",
            report.succeeded(),
            report.total()
        );
        Ok(report)
    }
}

/// Write via a sibling temp file and rename so readers never see a
/// partial document.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), DocVisionError> {
    let write_err = |source| DocVisionError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    debug!("Atomically wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn atomic_write_creates_parent_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.md");

        write_atomic(&path, "first").await.unwrap();
        write_atomic(&path, "second").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("md.tmp").exists());
    }
}
