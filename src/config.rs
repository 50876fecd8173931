//! Configuration types for document-to-Markdown conversion.
//!
//! Every knob lives in [`PipelineConfig`], built through
//! [`PipelineConfigBuilder`] and then shared read-only (`Arc<PipelineConfig>`)
//! by every pipeline stage. Nothing mutates it during a run.
//!
//! Endpoint and bearer token come from [`Credentials`], loaded once at
//! startup from `model_url.txt` / `JWT_token.txt` or from the
//! `DOCVISION_ENDPOINT` / `DOCVISION_TOKEN` environment variables. Missing or
//! empty credentials are a startup failure, never a per-request one.

use crate::error::DocVisionError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File holding the bearer token, relative to the credentials directory.
pub const TOKEN_FILE: &str = "JWT_token.txt";

/// File holding the endpoint URL, relative to the credentials directory.
pub const ENDPOINT_FILE: &str = "model_url.txt";

/// Environment override for the bearer token.
pub const TOKEN_ENV: &str = "DOCVISION_TOKEN";

/// Environment override for the endpoint URL.
pub const ENDPOINT_ENV: &str = "DOCVISION_ENDPOINT";

/// Endpoint URL and bearer token for the remote model service.
///
/// Both are opaque strings; the token is never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from explicit values, rejecting empty strings.
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, DocVisionError> {
        let endpoint = endpoint.into().trim().to_string();
        let token = token.into().trim().to_string();
        if endpoint.is_empty() {
            return Err(DocVisionError::EmptyCredential {
                name: ENDPOINT_FILE.into(),
            });
        }
        if token.is_empty() {
            return Err(DocVisionError::EmptyCredential {
                name: TOKEN_FILE.into(),
            });
        }
        Ok(Self { endpoint, token })
    }

    /// Load credentials, preferring environment variables over files in `dir`.
    ///
    /// Each value is resolved independently, so a token from the environment
    /// can be paired with an endpoint from `model_url.txt`.
    pub fn load(dir: &Path) -> Result<Self, DocVisionError> {
        let endpoint = resolve_value(ENDPOINT_ENV, &dir.join(ENDPOINT_FILE))?;
        let token = resolve_value(TOKEN_ENV, &dir.join(TOKEN_FILE))?;
        Self::new(endpoint, token)
    }

    /// Load credentials from `DOCVISION_ENDPOINT` / `DOCVISION_TOKEN` only.
    pub fn from_env() -> Result<Self, DocVisionError> {
        let var = |key: &str| {
            std::env::var(key).map_err(|_| DocVisionError::MissingCredential {
                name: key.to_string(),
                hint: format!("Set the {} environment variable.", key),
            })
        };
        Self::new(var(ENDPOINT_ENV)?, var(TOKEN_ENV)?)
    }
}

fn resolve_value(env_key: &str, file: &Path) -> Result<String, DocVisionError> {
    if let Ok(v) = std::env::var(env_key) {
        debug!("Using {} from environment", env_key);
        return Ok(v);
    }
    match std::fs::read_to_string(file) {
        Ok(v) => Ok(v),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DocVisionError::MissingCredential {
                name: file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string()),
                hint: format!(
                    "Create '{}' or set {}.",
                    file.display(),
                    env_key
                ),
            })
        }
        Err(e) => Err(DocVisionError::InvalidConfig(format!(
            "cannot read '{}': {}",
            file.display(),
            e
        ))),
    }
}

/// Immutable settings for one run of the pipeline.
///
/// # Example
/// ```rust
/// use edgequake_docvision::{Credentials, PipelineConfig};
/// use std::time::Duration;
///
/// let creds = Credentials::new("https://llm.example.com/v1/chat", "token").unwrap();
/// let config = PipelineConfig::builder(creds)
///     .dpi(150)
///     .batch_size(3)
///     .pause(Duration::from_secs(2))
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size, 3);
/// ```
#[derive(Clone, Serialize)]
pub struct PipelineConfig {
    /// Rendering DPI. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Longest side, in pixels, of an image sent to the endpoint. Default: 2048.
    pub max_image_dimension: u32,

    /// Slides per enhancement request. Default: 5.
    pub batch_size: usize,

    /// Fixed pause between consecutive remote calls and between files. Default: 10 s.
    pub pause: Duration,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per request. Default: 4000.
    pub max_tokens: u32,

    /// Upper bound on a single request, connect to last byte. Default: 120 s.
    pub request_timeout: Duration,

    /// Upper bound on one LibreOffice conversion. Default: 120 s.
    pub converter_timeout: Duration,

    /// Largest accepted input file. Default: 100 MiB.
    pub max_file_bytes: u64,

    /// Run batch enhancement on presentations. Default: true.
    pub enhance: bool,

    /// Apply deterministic cleanup to model output. Default: true.
    pub clean_output: bool,

    /// Explicit pdfium library; falls back to the system library when `None`.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Explicit LibreOffice binary; auto-discovered when `None`.
    pub libreoffice_path: Option<PathBuf>,

    /// Remote endpoint and token.
    #[serde(skip)]
    pub credentials: Credentials,
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("dpi", &self.dpi)
            .field("max_image_dimension", &self.max_image_dimension)
            .field("batch_size", &self.batch_size)
            .field("pause", &self.pause)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .field("converter_timeout", &self.converter_timeout)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("enhance", &self.enhance)
            .field("clean_output", &self.clean_output)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("libreoffice_path", &self.libreoffice_path)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a builder with defaults for everything except credentials.
    pub fn builder(credentials: Credentials) -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self {
                dpi: 200,
                max_image_dimension: 2048,
                batch_size: 5,
                pause: Duration::from_secs(10),
                temperature: 0.1,
                max_tokens: 4000,
                request_timeout: Duration::from_secs(120),
                converter_timeout: Duration::from_secs(120),
                max_file_bytes: 100 * 1024 * 1024,
                enhance: true,
                clean_output: true,
                pdfium_lib_path: None,
                libreoffice_path: None,
                credentials,
            },
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.config.max_image_dimension = px.max(100);
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n.max(1);
        self
    }

    pub fn pause(mut self, pause: Duration) -> Self {
        self.config.pause = pause;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn converter_timeout(mut self, timeout: Duration) -> Self {
        self.config.converter_timeout = timeout;
        self
    }

    pub fn max_file_bytes(mut self, n: u64) -> Self {
        self.config.max_file_bytes = n;
        self
    }

    pub fn enhance(mut self, v: bool) -> Self {
        self.config.enhance = v;
        self
    }

    pub fn clean_output(mut self, v: bool) -> Self {
        self.config.clean_output = v;
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn libreoffice_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.libreoffice_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, DocVisionError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(DocVisionError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.request_timeout.is_zero() {
            return Err(DocVisionError::InvalidConfig(
                "request timeout must be > 0".into(),
            ));
        }
        if c.converter_timeout.is_zero() {
            return Err(DocVisionError::InvalidConfig(
                "converter timeout must be > 0".into(),
            ));
        }
        if !c.credentials.endpoint.starts_with("http://")
            && !c.credentials.endpoint.starts_with("https://")
        {
            return Err(DocVisionError::InvalidConfig(format!(
                "endpoint must be an http(s) URL, got '{}'",
                c.credentials.endpoint
            )));
        }
        Ok(self.config)
    }
}
