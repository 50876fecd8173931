//! Remote vision service: page extraction and batch enhancement.
//!
//! [`VisionService`] is the seam the rest of the pipeline talks to; tests
//! swap in a scripted implementation. [`EnterpriseClient`] is the production
//! implementation: one bearer-authenticated JSON `POST` per call against a
//! chat-style endpoint, with the reply decoded by
//! [`super::response::match_response`].
//!
//! No retries happen here. The endpoint is rate limited and the pipeline
//! already paces calls; a failed page becomes a placeholder instead.

use crate::config::PipelineConfig;
use crate::error::{DocVisionError, UnitError};
use crate::output::{EnhancementOutcome, ExtractionContext, PageImage};
use crate::pipeline::encode::encode_data_uri;
use crate::pipeline::response::match_response;
use crate::prompts::{instructions_for, BATCH_ENHANCEMENT_PROMPT, EXTRACTION_USER_PREFIX};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Timeout for the startup reachability probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// The two remote operations the pipeline needs.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Transcribe one page image to Markdown.
    async fn extract(
        &self,
        page: &PageImage,
        context: ExtractionContext,
    ) -> Result<String, UnitError>;

    /// Rewrite a group of unit texts. Never fails: on any problem the
    /// outcome carries the input unchanged with `applied == false`.
    async fn enhance(&self, group_text: &str) -> EnhancementOutcome;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

/// `reqwest`-backed [`VisionService`] for the enterprise endpoint.
#[derive(Debug, Clone)]
pub struct EnterpriseClient {
    http: reqwest::Client,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl EnterpriseClient {
    /// Build a client from the run configuration.
    ///
    /// The bearer token and JSON content type are installed as default
    /// headers; the request timeout is applied to every call.
    pub fn new(config: &PipelineConfig) -> Result<Self, DocVisionError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.credentials.token))
            .map_err(|_| {
                DocVisionError::InvalidConfig("token contains invalid header characters".into())
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DocVisionError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.credentials.endpoint.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.request_timeout,
        })
    }

    /// `HEAD` the endpoint once. Any HTTP answer counts as reachable;
    /// failures are logged and reported as `false`, never as an error.
    pub async fn probe(&self) -> bool {
        match self
            .http
            .head(&self.endpoint)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => {
                info!("Endpoint reachable (status: {})", resp.status());
                true
            }
            Err(e) => {
                warn!("Endpoint probe failed: {}", e);
                false
            }
        }
    }

    /// Send one chat request and return the raw body on a 2xx status.
    async fn post(&self, system: &str, user: &str) -> Result<String, UnitError> {
        let request = ChatRequest {
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(UnitError::Http {
                status: status.as_u16(),
                body: truncate(&body, 500),
            });
        }
        Ok(body)
    }

    fn transport_error(&self, e: reqwest::Error) -> UnitError {
        if e.is_timeout() {
            UnitError::Timeout {
                secs: self.timeout.as_secs(),
            }
        } else {
            UnitError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl VisionService for EnterpriseClient {
    async fn extract(
        &self,
        page: &PageImage,
        context: ExtractionContext,
    ) -> Result<String, UnitError> {
        let start = Instant::now();
        let data_uri = encode_data_uri(&page.image)?;
        let user = format!("{EXTRACTION_USER_PREFIX}\n{data_uri}");

        let body = self.post(instructions_for(context), &user).await?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| UnitError::MalformedResponse(format!("not JSON: {e}")))?;

        let text = match match_response(&json) {
            Some(Ok(text)) => text,
            Some(Err(why)) => return Err(UnitError::MalformedResponse(why)),
            None => {
                debug!(
                    "{} {}: unrecognised response shape, using raw body",
                    context.unit_noun(),
                    page.ordinal
                );
                json.to_string()
            }
        };

        if text.trim().is_empty() {
            return Err(UnitError::EmptyResponse);
        }
        debug!(
            "{} {}: {} chars in {:?}",
            context.unit_noun(),
            page.ordinal,
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }

    async fn enhance(&self, group_text: &str) -> EnhancementOutcome {
        let body = match self.post(BATCH_ENHANCEMENT_PROMPT, group_text).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Enhancement request failed, keeping raw text: {}", e);
                return EnhancementOutcome::fallback(group_text);
            }
        };

        let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) else {
            warn!("Enhancement response is not JSON, keeping raw text");
            return EnhancementOutcome::fallback(group_text);
        };

        match match_response(&json) {
            Some(Ok(text)) if !text.trim().is_empty() => EnhancementOutcome::applied(text),
            Some(Ok(_)) => {
                warn!("Enhancement returned empty text, keeping raw text");
                EnhancementOutcome::fallback(group_text)
            }
            Some(Err(why)) => {
                warn!("Enhancement response malformed ({}), keeping raw text", why);
                EnhancementOutcome::fallback(group_text)
            }
            None => {
                warn!("Enhancement response shape not recognised, keeping raw text");
                EnhancementOutcome::fallback(group_text)
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
