//! Input validation: turn a user-supplied path into a [`ConversionJob`].
//!
//! Every check that can fail before any remote call happens here, so a bad
//! file costs no request quota: existence, regular file, size ceiling,
//! supported extension and, for PDFs, the `%PDF` magic bytes. pdfium gives
//! far less helpful errors for the same problems.

use crate::config::PipelineConfig;
use crate::error::DocVisionError;
use crate::output::DocumentKind;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions accepted as input, lower-case with the leading dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[".pdf", ".pptx", ".ppt", ".odp"];

/// A validated single-file conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    /// Destination Markdown file (`<stem>.md`).
    pub output: PathBuf,
    pub kind: DocumentKind,
    /// Whether the enhancement stage will run.
    pub enhance: bool,
    pub size_bytes: u64,
}

/// Classify a path by extension, case-insensitively.
pub fn document_kind(path: &Path) -> Option<DocumentKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(DocumentKind::Pdf),
        "pptx" | "ppt" | "odp" => Some(DocumentKind::Presentation),
        _ => None,
    }
}

/// `<output_dir or input parent>/<stem>.md`.
pub fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{stem}.md"))
}

/// Validate `input` and describe the conversion to perform.
pub fn prepare_job(
    input: &Path,
    output_dir: Option<&Path>,
    config: &PipelineConfig,
) -> Result<ConversionJob, DocVisionError> {
    let meta = std::fs::metadata(input).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => DocVisionError::PermissionDenied {
            path: input.to_path_buf(),
        },
        _ => DocVisionError::FileNotFound {
            path: input.to_path_buf(),
        },
    })?;

    if !meta.is_file() {
        return Err(DocVisionError::NotAFile {
            path: input.to_path_buf(),
        });
    }

    let size_bytes = meta.len();
    if size_bytes > config.max_file_bytes {
        const MIB: f64 = 1024.0 * 1024.0;
        return Err(DocVisionError::FileTooLarge {
            path: input.to_path_buf(),
            size_mb: size_bytes as f64 / MIB,
            max_mb: config.max_file_bytes as f64 / MIB,
        });
    }

    let kind = document_kind(input).ok_or_else(|| DocVisionError::UnsupportedFileType {
        path: input.to_path_buf(),
        extension: input
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    })?;

    if kind == DocumentKind::Pdf {
        check_pdf_magic(input)?;
    }

    let job = ConversionJob {
        input: input.to_path_buf(),
        output: output_path_for(input, output_dir),
        kind,
        enhance: config.enhance && kind == DocumentKind::Presentation,
        size_bytes,
    };
    debug!("Prepared job: {:?}", job);
    Ok(job)
}

fn check_pdf_magic(path: &Path) -> Result<(), DocVisionError> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => DocVisionError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => DocVisionError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let mut magic = [0u8; 4];
    let read = file.read(&mut magic).unwrap_or(0);
    if read < magic.len() || &magic != b"%PDF" {
        return Err(DocVisionError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// Supported files directly inside `dir`, sorted by path.
pub fn list_supported_files(dir: &Path) -> Result<Vec<PathBuf>, DocVisionError> {
    if !dir.is_dir() {
        return Err(DocVisionError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => DocVisionError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => DocVisionError::Internal(format!("cannot list '{}': {}", dir.display(), e)),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && document_kind(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    fn config() -> PipelineConfig {
        let creds = Credentials::new("http://localhost/", "t").unwrap();
        PipelineConfig::builder(creds).build().unwrap()
    }

    #[test]
    fn kinds_are_case_insensitive() {
        assert_eq!(document_kind(Path::new("a.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(
            document_kind(Path::new("deck.PpTx")),
            Some(DocumentKind::Presentation)
        );
        assert_eq!(
            document_kind(Path::new("deck.odp")),
            Some(DocumentKind::Presentation)
        );
        assert_eq!(document_kind(Path::new("notes.docx")), None);
        assert_eq!(document_kind(Path::new("README")), None);
    }

    #[test]
    fn output_path_defaults_to_input_parent() {
        assert_eq!(
            output_path_for(Path::new("/docs/report.v2.pdf"), None),
            PathBuf::from("/docs/report.v2.md")
        );
        assert_eq!(
            output_path_for(Path::new("/docs/deck.pptx"), Some(Path::new("/out"))),
            PathBuf::from("/out/deck.md")
        );
    }

    #[test]
    fn valid_pdf_job() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("a.pdf");
        std::fs::write(&pdf, b"%PDF-1.7\n").unwrap();

        let job = prepare_job(&pdf, None, &config()).unwrap();
        assert_eq!(job.kind, DocumentKind::Pdf);
        assert_eq!(job.output, dir.path().join("a.md"));
        assert!(!job.enhance);
        assert_eq!(job.size_bytes, 9);
    }

    #[test]
    fn presentation_job_enhances_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("deck.pptx");
        std::fs::write(&deck, b"PK\x03\x04").unwrap();
        assert!(prepare_job(&deck, None, &config()).unwrap().enhance);
    }

    #[test]
    fn rejects_bad_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config();

        let missing = dir.path().join("missing.pdf");
        assert!(matches!(
            prepare_job(&missing, None, &cfg),
            Err(DocVisionError::FileNotFound { .. })
        ));

        assert!(matches!(
            prepare_job(dir.path(), None, &cfg),
            Err(DocVisionError::NotAFile { .. })
        ));

        let docx = dir.path().join("notes.docx");
        std::fs::write(&docx, b"x").unwrap();
        assert!(matches!(
            prepare_job(&docx, None, &cfg),
            Err(DocVisionError::UnsupportedFileType { .. })
        ));

        let fake = dir.path().join("fake.pdf");
        std::fs::write(&fake, b"<html>").unwrap();
        assert!(matches!(
            prepare_job(&fake, None, &cfg),
            Err(DocVisionError::NotAPdf { .. })
        ));
    }

    #[test]
    fn size_ceiling_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("big.pdf");
        std::fs::write(&pdf, b"%PDF-1.7 with some padding").unwrap();
        let creds = Credentials::new("http://localhost/", "t").unwrap();
        let cfg = PipelineConfig::builder(creds).max_file_bytes(8).build().unwrap();
        assert!(matches!(
            prepare_job(&pdf, None, &cfg),
            Err(DocVisionError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn directory_listing_is_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.pptx", "a.pdf", "b.txt", "B.PDF"] {
            std::fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let files = list_supported_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["B.PDF", "a.pdf", "c.pptx"]);
    }

    #[test]
    fn listing_a_file_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("a.pdf");
        std::fs::write(&f, b"%PDF").unwrap();
        assert!(matches!(
            list_supported_files(&f),
            Err(DocVisionError::NotADirectory { .. })
        ));
    }
}
