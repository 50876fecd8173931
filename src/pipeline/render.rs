//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks for the whole render. The work runs on tokio's blocking
//! pool so the runtime's worker threads never stall on it.
//!
//! ## Library discovery
//!
//! 1. `PipelineConfig::pdfium_lib_path` (file, or directory holding the
//!    platform-named library)
//! 2. `PDFIUM_LIB_PATH` environment variable, same rules
//! 3. Next to the running executable
//! 4. System library search paths

use crate::error::DocVisionError;
use crate::output::PageImage;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable consulted when no library path is configured.
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// PDF user-space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Turns a document into one image per page, in page order.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render every page of `path` at `dpi`.
    ///
    /// Ordinals start at 1. A document with zero pages is an error
    /// ([`DocVisionError::NoPages`]).
    async fn render(&self, path: &Path, dpi: u32) -> Result<Vec<PageImage>, DocVisionError>;
}

/// [`PageRenderer`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    lib_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    /// `lib_path` overrides discovery; `None` searches as described in the
    /// module docs.
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }

    /// Try to bind the library without rendering anything.
    pub fn check_available(&self) -> Result<(), DocVisionError> {
        bind_pdfium(self.lib_path.as_deref()).map(|_| ())
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn render(&self, path: &Path, dpi: u32) -> Result<Vec<PageImage>, DocVisionError> {
        let path = path.to_path_buf();
        let lib_path = self.lib_path.clone();

        tokio::task::spawn_blocking(move || render_blocking(lib_path.as_deref(), &path, dpi))
            .await
            .map_err(|e| DocVisionError::Internal(format!("Render task panicked: {}", e)))?
    }
}

fn render_blocking(
    lib_path: Option<&Path>,
    pdf_path: &Path,
    dpi: u32,
) -> Result<Vec<PageImage>, DocVisionError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| DocVisionError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total = pages.len() as usize;
    if total == 0 {
        return Err(DocVisionError::NoPages {
            path: pdf_path.to_path_buf(),
        });
    }
    info!("PDF loaded: {} pages, rendering at {} DPI", total, dpi);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / POINTS_PER_INCH);

    let mut images = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let ordinal = idx + 1;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DocVisionError::RasterisationFailed {
                page: ordinal,
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            ordinal,
            image.width(),
            image.height()
        );
        images.push(PageImage::new(ordinal, image));
    }

    Ok(images)
}

fn bind_pdfium(configured: Option<&Path>) -> Result<Pdfium, DocVisionError> {
    let explicit = configured
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(PDFIUM_LIB_ENV).map(PathBuf::from));

    if let Some(path) = explicit {
        let lib = if path.is_dir() {
            PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(
                path.to_string_lossy().as_ref(),
            ))
        } else {
            path
        };
        debug!("Binding pdfium from {}", lib.display());
        return Pdfium::bind_to_library(&lib)
            .map(Pdfium::new)
            .map_err(|e| DocVisionError::PdfiumBindingFailed(format!("{}: {}", lib.display(), e)));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let beside = Pdfium::pdfium_platform_library_name_at_path(
            exe_dir.to_string_lossy().as_ref(),
        );
        if let Ok(bindings) = Pdfium::bind_to_library(&beside) {
            debug!("Bound pdfium next to executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| DocVisionError::PdfiumBindingFailed(e.to_string()))
}
