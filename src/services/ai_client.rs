//! AI service client for the hosted Gemini `generateContent` endpoint.
//!
//! Provides:
//! - An [`AnalysisBackend`] seam over the transport
//! - The production [`GeminiBackend`]
//! - [`AiClient::invoke`], which always resolves to an [`AnalysisResult`]

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

use super::request_builder::AnalysisRequest;
use crate::domain::{AnalysisMode, AnalysisReport, AnalysisResult};

/// Failures talking to the analysis service or reading its reply.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("AI service unavailable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI service error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("No response from AI")]
    EmptyResponse,

    #[error("Invalid AI service response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Transport to a generative model that honours a response schema.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    /// Run the request and return the raw text of the model's answer.
    async fn generate(&self, request: &AnalysisRequest) -> Result<String, BackendError>;

    /// Check that the service is reachable with the configured credentials.
    async fn health_check(&self) -> Result<(), BackendError>;
}

// =============================================================================
// Gemini wire format
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

impl GenerateContentResponse {
    /// Concatenated answer text of the first candidate, thoughts excluded.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Error body returned by Google APIs.
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
}

fn to_wire(request: &AnalysisRequest) -> GenerateContentRequest<'_> {
    let mut parts = Vec::with_capacity(request.attachments.len() + 1);
    parts.push(Part::Text {
        text: &request.prompt_text,
    });
    parts.extend(request.attachments.iter().map(|a| Part::Inline {
        inline_data: InlineData {
            mime_type: &a.mime_type,
            data: &a.data,
        },
    }));

    GenerateContentRequest {
        contents: vec![Content { role: "user", parts }],
        generation_config: GenerationConfig {
            response_mime_type: request.extra_config.response_mime_type,
            response_schema: &request.response_schema,
            thinking_config: request
                .extra_config
                .thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
        },
    }
}

// =============================================================================
// Gemini backend
// =============================================================================

/// Backend for the Google Generative Language REST API.
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiBackend {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        if api_key.is_none() {
            tracing::warn!("API_KEY is not set - analysis requests will fail");
        }
        tracing::info!(base_url = base_url, "Gemini backend initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn api_key(&self) -> Result<&str, BackendError> {
        self.api_key.as_deref().ok_or(BackendError::MissingApiKey)
    }
}

#[async_trait]
impl AnalysisBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, request: &AnalysisRequest) -> Result<String, BackendError> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model_variant
        );

        debug!(url = %url, "AI service request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&to_wire(request))
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let body: GenerateContentResponse = response.json().await?;
            body.text().ok_or(BackendError::EmptyResponse)
        } else {
            let message = response
                .json::<GoogleErrorResponse>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("AI service error: {}", status));

            Err(BackendError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let api_key = self.api_key()?;
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: status.as_u16(),
                message: format!("AI service unhealthy: {}", status),
            })
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Stateless mediator between the workspace and the analysis backend.
#[derive(Clone)]
pub struct AiClient {
    backend: Arc<dyn AnalysisBackend>,
}

impl AiClient {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self { backend }
    }

    /// Client over the Gemini REST API.
    pub fn gemini(base_url: &str, api_key: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let backend = GeminiBackend::new(base_url, api_key, timeout_seconds)?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// Run an analysis. Never fails: any error yields the fallback result.
    #[instrument(
        skip(self, request),
        fields(
            backend = self.backend.name(),
            model = %request.model_variant,
            attachments = request.attachments.len()
        )
    )]
    pub async fn invoke(&self, mode: AnalysisMode, request: &AnalysisRequest) -> AnalysisResult {
        match self.try_invoke(request).await {
            Ok(report) => {
                debug!(score = report.data_readiness_score, "Analysis completed");
                AnalysisResult::from_report(mode, Utc::now(), report)
            }
            Err(e) => {
                error!(error = %e, mode = %mode, "Analysis failed");
                AnalysisResult::fallback(mode, Utc::now())
            }
        }
    }

    async fn try_invoke(&self, request: &AnalysisRequest) -> Result<AnalysisReport, BackendError> {
        let text = self.backend.generate(request).await?;
        if text.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn health_check(&self) -> Result<(), BackendError> {
        self.backend.health_check().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{ingest, DeclaredType};
    use crate::services::request_builder::{build_request, ModelSelection};
    use axum::{extract::Path, http::HeaderMap, routing::post, Json, Router};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend returning scripted replies in order, then the last one forever.
    pub(crate) struct MockBackend {
        replies: Mutex<VecDeque<Result<String, BackendError>>>,
        pub calls: AtomicUsize,
    }

    impl MockBackend {
        pub(crate) fn with_text(text: &str) -> Self {
            Self::with_replies(vec![Ok(text.to_string())])
        }

        pub(crate) fn failing() -> Self {
            Self::with_replies(vec![Err(BackendError::Status {
                status: 503,
                message: "network down".to_string(),
            })])
        }

        pub(crate) fn with_replies(replies: Vec<Result<String, BackendError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AnalysisBackend for MockBackend {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn generate(&self, _request: &AnalysisRequest) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock();
            match replies.pop_front() {
                Some(Ok(text)) => {
                    if replies.is_empty() {
                        replies.push_back(Ok(text.clone()));
                    }
                    Ok(text)
                }
                Some(Err(e)) => Err(e),
                None => Err(BackendError::EmptyResponse),
            }
        }

        async fn health_check(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    const OK_REPORT: &str = r#"{"executiveSummary":"OK","metrics":[],"chartData":[],"recommendations":[],"dataReadinessScore":42}"#;

    fn schedule_request() -> AnalysisRequest {
        let files = vec![ingest(
            b"...",
            DeclaredType::ScheduleBaseline,
            "baseline.txt",
            Some("text/plain"),
            3,
        )];
        build_request(AnalysisMode::ScheduleControl, &files, &ModelSelection::default())
    }

    #[tokio::test]
    async fn test_invoke_success_merges_mode() {
        let client = AiClient::new(Arc::new(MockBackend::with_text(OK_REPORT)));
        let result = client
            .invoke(AnalysisMode::ScheduleControl, &schedule_request())
            .await;
        assert_eq!(result.data_readiness_score, 42.0);
        assert_eq!(result.mode, AnalysisMode::ScheduleControl);
        assert_eq!(result.executive_summary, "OK");
        assert!(!result.is_fallback());
    }

    #[tokio::test]
    async fn test_invoke_network_error_falls_back() {
        let client = AiClient::new(Arc::new(MockBackend::failing()));
        let result = client
            .invoke(AnalysisMode::ScheduleControl, &schedule_request())
            .await;
        assert_eq!(result.data_readiness_score, 0.0);
        assert_eq!(result.recommendations.len(), 2);
        assert!(result.metrics.is_empty());
        assert!(result.chart_data.is_empty());
        assert!(result.change_requests.is_empty());
        assert_eq!(result.mode, AnalysisMode::ScheduleControl);
    }

    #[tokio::test]
    async fn test_invoke_malformed_replies_fall_back() {
        for reply in ["", "   ", "not json", r#"{"executiveSummary":"missing fields"}"#, "[]"] {
            let client = AiClient::new(Arc::new(MockBackend::with_text(reply)));
            let result = client
                .invoke(AnalysisMode::FinancialControl, &schedule_request())
                .await;
            assert!(result.is_fallback(), "reply {:?} should fall back", reply);
        }
    }

    #[tokio::test]
    async fn test_invoke_is_independent_per_call() {
        let backend = Arc::new(MockBackend::with_replies(vec![
            Err(BackendError::EmptyResponse),
            Ok(OK_REPORT.to_string()),
        ]));
        let client = AiClient::new(backend.clone());
        let request = schedule_request();

        assert!(client.invoke(AnalysisMode::ScheduleControl, &request).await.is_fallback());
        assert!(!client.invoke(AnalysisMode::ScheduleControl, &request).await.is_fallback());
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_api_key_falls_back_without_network() {
        let client = AiClient::gemini("http://127.0.0.1:9", None, 1).unwrap();
        let result = client
            .invoke(AnalysisMode::IntegratedControl, &schedule_request())
            .await;
        assert!(result.is_fallback());
        assert!(matches!(
            client.health_check().await,
            Err(BackendError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_falls_back() {
        let backend = GeminiBackend::new("http://127.0.0.1:9", Some("k".to_string()), 2).unwrap();
        let err = backend.generate(&schedule_request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)), "got {:?}", err);

        let client = AiClient::new(Arc::new(backend));
        let result = client
            .invoke(AnalysisMode::ScheduleControl, &schedule_request())
            .await;
        assert!(result.is_fallback());
        assert_eq!(result.mode, AnalysisMode::ScheduleControl);
    }

    #[test]
    fn test_wire_format() {
        let files = vec![ingest(
            b"abc",
            DeclaredType::CostBaseline,
            "cost.csv",
            Some("text/csv"),
            3,
        )];
        let request =
            build_request(AnalysisMode::IntegratedControl, &files, &ModelSelection::default());
        let wire = serde_json::to_value(to_wire(&request)).unwrap();

        let parts = wire["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(wire["contents"][0]["role"], "user");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], request.prompt_text.as_str());
        assert_eq!(parts[1]["inlineData"]["mimeType"], "text/csv");
        assert_eq!(parts[1]["inlineData"]["data"], "YWJj");

        let config = &wire["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "OBJECT");
        assert_eq!(config["thinkingConfig"]["thinkingBudget"], 1024);
    }

    #[test]
    fn test_wire_format_without_thinking() {
        let request = build_request(AnalysisMode::ScheduleControl, &[], &ModelSelection::default());
        let wire = serde_json::to_value(to_wire(&request)).unwrap();
        assert!(wire["generationConfig"].get("thinkingConfig").is_none());
        assert_eq!(wire["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_response_text_skips_thoughts() {
        let body: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"reasoning...","thought":true},
                {"text":"{\"a\":"},
                {"text":"1}"}
            ]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text().as_deref(), Some("{\"a\":1}"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());
    }

    async fn spawn_fake_gemini(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_gemini_backend_round_trip() {
        let router = Router::new().route(
            "/v1beta/models/:target",
            post(
                |Path(target): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(target, "gemini-3-flash-preview:generateContent");
                    assert_eq!(headers["x-goog-api-key"], "test-key");
                    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
                    Json(serde_json::json!({
                        "candidates": [{"content": {"parts": [{"text": OK_REPORT}]}}]
                    }))
                },
            ),
        );
        let base_url = spawn_fake_gemini(router).await;

        let client = AiClient::gemini(&base_url, Some("test-key".to_string()), 5).unwrap();
        let result = client
            .invoke(AnalysisMode::ScheduleControl, &schedule_request())
            .await;
        assert_eq!(result.data_readiness_score, 42.0);
        assert_eq!(result.mode, AnalysisMode::ScheduleControl);
    }

    #[tokio::test]
    async fn test_gemini_backend_error_status() {
        let router = Router::new().route(
            "/v1beta/models/:target",
            post(|| async {
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": {"code": 400, "message": "bad schema"}})),
                )
            }),
        );
        let base_url = spawn_fake_gemini(router).await;

        let backend = GeminiBackend::new(&base_url, Some("k".to_string()), 5).unwrap();
        let err = backend.generate(&schedule_request()).await.unwrap_err();
        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad schema");
            }
            other => panic!("Expected Status error, got {:?}", other),
        }

        let client = AiClient::new(Arc::new(backend));
        assert!(client
            .invoke(AnalysisMode::ScheduleControl, &schedule_request())
            .await
            .is_fallback());
    }
}
