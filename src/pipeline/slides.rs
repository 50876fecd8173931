//! Presentation → PDF conversion through a headless LibreOffice.
//!
//! Slides are never rendered directly: LibreOffice turns the deck into a PDF
//! in a scratch directory and the PDF goes through the normal page renderer.
//! The scratch directory belongs to the caller and is removed when it drops.

use crate::error::DocVisionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Converts a presentation file into a PDF inside `out_dir`.
#[async_trait]
pub trait PresentationConverter: Send + Sync {
    /// Returns the path of the produced PDF.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, DocVisionError>;
}

/// Well-known install locations, checked before `PATH`.
#[cfg(target_os = "macos")]
const KNOWN_LOCATIONS: &[&str] = &[
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
    "/opt/homebrew/bin/soffice",
    "/usr/local/bin/soffice",
];

#[cfg(target_os = "windows")]
const KNOWN_LOCATIONS: &[&str] = &[
    r"C:\Program Files\LibreOffice\program\soffice.exe",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const KNOWN_LOCATIONS: &[&str] = &[
    "/usr/bin/soffice",
    "/usr/local/bin/soffice",
    "/snap/bin/libreoffice",
    "/usr/bin/libreoffice",
];

/// Executable names searched on `PATH`.
const PATH_NAMES: &[&str] = &["soffice", "libreoffice"];

/// Locate a LibreOffice executable: known locations first, then `PATH`.
pub fn find_libreoffice() -> Option<PathBuf> {
    KNOWN_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .or_else(|| search_path(PATH_NAMES))
}

fn search_path(names: &[&str]) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        names.iter().find_map(|name| {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            let exe = candidate.with_extension(std::env::consts::EXE_EXTENSION);
            exe.is_file().then_some(exe)
        })
    })
}

/// [`PresentationConverter`] that shells out to `soffice --headless`.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    program: Option<PathBuf>,
    timeout: Duration,
}

impl LibreOfficeConverter {
    /// `program` overrides discovery. Discovery is deferred to the first
    /// conversion so that PDF-only runs never need LibreOffice.
    pub fn new(program: Option<PathBuf>, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    /// The executable that will be used, if any.
    pub fn program(&self) -> Option<PathBuf> {
        self.program.clone().or_else(find_libreoffice)
    }
}

#[async_trait]
impl PresentationConverter for LibreOfficeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, DocVisionError> {
        let program = self.program().ok_or(DocVisionError::ConverterNotFound)?;
        info!(
            "Converting {} to PDF with {}",
            input.display(),
            program.display()
        );

        let child = Command::new(&program)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DocVisionError::ConverterNotFound,
                _ => DocVisionError::ConverterFailed {
                    path: input.to_path_buf(),
                    stderr: e.to_string(),
                },
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DocVisionError::ConverterTimeout {
                path: input.to_path_buf(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| DocVisionError::ConverterFailed {
                path: input.to_path_buf(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(DocVisionError::ConverterFailed {
                path: input.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pdf = first_pdf_in(out_dir).ok_or_else(|| DocVisionError::ConverterNoOutput {
            path: input.to_path_buf(),
        })?;
        debug!("LibreOffice produced {}", pdf.display());
        Ok(pdf)
    }
}

/// First `*.pdf` in `dir` by file name.
fn first_pdf_in(dir: &Path) -> Option<PathBuf> {
    let mut pdfs: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    pdfs.into_iter().next()
}
