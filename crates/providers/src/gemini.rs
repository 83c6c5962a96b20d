//! Gemini image model gateway.
//!
//! Uses the `generateContent` endpoint of the Generative Language API.
//!
//! Features:
//! - `x-goog-api-key` header authentication
//! - Text-only requests for garment synthesis
//! - Text + two inline images for try-on composites
//! - Response normalized to the first `inlineData` part; no image part is an error

use async_trait::async_trait;
use bananafit_core::error::GenerationError;
use bananafit_core::{GenerationGateway, InlineImage, strip_data_url_prefix};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

const TRY_ON_INSTRUCTIONS: &str = concat!(
    "Instructions: Create a photorealistic full-body image of the person from the first image ",
    "wearing the clothing from the second image. \n\n",
    "1. Maintain the person's exact facial features, skin tone, and body shape.\n",
    "2. Fit the clothing naturally onto the person's body, respecting physics and lighting.\n",
    "3. The final image should be a high-quality fashion shot."
);

/// Gateway to a Gemini image model.
///
/// Holds no per-request state; both calls may run concurrently.
pub struct GeminiGateway {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiGateway {
    /// Create a new gateway. `timeout` of `None` waits indefinitely.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GenerationError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a garment description in the product-photo template.
    fn clothing_prompt(description: &str) -> String {
        format!(
            "Generate a high-quality, standalone product photo of a piece of clothing based on \
             this description: {description}. The background should be plain white or simple. \
             Do not include a person."
        )
    }

    fn clothing_request(description: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(Self::clothing_prompt(description))],
            }],
        }
    }

    /// Images go out exactly as encoded: bare base64 body plus its MIME type.
    fn try_on_request(person: &InlineImage, clothing: &InlineImage) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(TRY_ON_INSTRUCTIONS),
                    Part::image(person),
                    Part::image(clothing),
                ],
            }],
        }
    }

    async fn generate(
        &self,
        request: &GenerateContentRequest,
        operation: &str,
    ) -> Result<InlineImage, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        debug!(gateway = %self.name, model = %self.model, operation, "Sending generation request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(format!("{operation}: {e}"))
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(GenerationError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(GenerationError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Image model returned error");
            return Err(GenerationError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: GenerateContentResponse =
            response.json().await.map_err(|e| GenerationError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let image = Self::extract_image(api_response, operation)?;
        debug!(
            operation,
            mime = %image.mime_type(),
            bytes = image.approx_byte_len(),
            "Image model returned an image"
        );
        Ok(image)
    }

    /// Take the first inline image part of the first candidate.
    fn extract_image(
        response: GenerateContentResponse,
        operation: &str,
    ) -> Result<InlineImage, GenerationError> {
        let block_reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason);

        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut text = String::new();
        for part in parts {
            if let Some(data) = part.inline_data {
                return Ok(InlineImage::new(
                    data.mime_type,
                    strip_data_url_prefix(&data.data),
                ));
            }
            if let Some(t) = part.text {
                text.push_str(&t);
            }
        }

        let detail = match (block_reason, text.trim()) {
            (Some(reason), _) => format!("{operation}: prompt blocked ({reason})"),
            (None, "") => format!("{operation}: response contained no image part"),
            (None, t) => format!("{operation}: model replied with text only: {t}"),
        };
        Err(GenerationError::NoImage(detail))
    }
}

#[async_trait]
impl GenerationGateway for GeminiGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn synthesize_clothing(&self, prompt: &str) -> Result<InlineImage, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::InvalidInput(
                "clothing description must not be empty".into(),
            ));
        }
        self.generate(&Self::clothing_request(prompt), "synthesize_clothing")
            .await
    }

    async fn synthesize_try_on(
        &self,
        person: &InlineImage,
        clothing: &InlineImage,
    ) -> Result<InlineImage, GenerationError> {
        self.generate(&Self::try_on_request(person, clothing), "synthesize_try_on")
            .await
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<ApiInlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn image(image: &InlineImage) -> Self {
        Self {
            text: None,
            inline_data: Some(ApiInlineData {
                mime_type: image.mime_type().to_string(),
                data: strip_data_url_prefix(image.data()).to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::IntoResponse;
    use std::sync::{Arc, Mutex};

    fn gateway() -> GeminiGateway {
        GeminiGateway::new("test-key", "test-model", None).unwrap()
    }

    fn image_response(mime: &str, data: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Here is your image" },
                    { "inlineData": { "mimeType": mime, "data": data } }
                ]}
            }]
        })
    }

    #[test]
    fn constructor_defaults() {
        let gw = gateway().with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(gw.name(), "gemini");
        assert_eq!(gw.model(), "test-model");
        assert_eq!(gw.base_url, "http://localhost:9999/v1beta");
    }

    #[test]
    fn clothing_prompt_embeds_description_verbatim() {
        let prompt = GeminiGateway::clothing_prompt("a red silk gown with gold embroidery");
        assert!(prompt.contains("description: a red silk gown with gold embroidery."));
        assert!(prompt.contains("plain white or simple"));
        assert!(prompt.contains("Do not include a person."));
    }

    #[test]
    fn try_on_request_sends_bare_base64_with_mime() {
        let person = InlineImage::new("image/jpeg", "UEVSU09O");
        let clothing = InlineImage::new("image/png", "Q0xPVEhFUw==");
        let json =
            serde_json::to_value(GeminiGateway::try_on_request(&person, &clothing)).unwrap();

        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert!(parts[0]["text"].as_str().unwrap().contains("facial features"));
        assert!(parts[0].get("inlineData").is_none());
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "UEVSU09O");
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[2]["inlineData"]["data"], "Q0xPVEhFUw==");
    }

    #[test]
    fn extract_first_inline_image() {
        let response: GenerateContentResponse =
            serde_json::from_value(image_response("image/png", "AAAA")).unwrap();
        let image = GeminiGateway::extract_image(response, "test").unwrap();
        assert_eq!(image.to_data_url(), "data:image/png;base64,AAAA");
    }

    #[test]
    fn prefixed_image_data_is_stripped() {
        let response: GenerateContentResponse = serde_json::from_value(image_response(
            "image/jpeg",
            "data:image/jpeg;base64,QkJCQg==",
        ))
        .unwrap();
        let image = GeminiGateway::extract_image(response, "test").unwrap();
        assert_eq!(image.data(), "QkJCQg==");
    }

    #[test]
    fn text_only_response_is_no_image() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "I cannot draw that" }] } }]
        }))
        .unwrap();
        let err = GeminiGateway::extract_image(response, "synthesize_clothing").unwrap_err();
        match err {
            GenerationError::NoImage(detail) => assert!(detail.contains("I cannot draw that")),
            other => panic!("Expected NoImage, got {other:?}"),
        }
    }

    #[test]
    fn blocked_prompt_is_no_image() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();
        let err = GeminiGateway::extract_image(response, "synthesize_try_on").unwrap_err();
        assert!(matches!(err, GenerationError::NoImage(ref d) if d.contains("SAFETY")));
    }

    #[test]
    fn empty_candidates_is_no_image() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            GeminiGateway::extract_image(response, "x"),
            Err(GenerationError::NoImage(_))
        ));
    }

    // --- Against a local stand-in for the API ---

    #[derive(Clone, Default)]
    struct Recorded {
        requests: Arc<Mutex<Vec<(String, Option<String>, serde_json::Value)>>>,
    }

    async fn serve(status: StatusCode, body: serde_json::Value) -> (String, Recorded) {
        let recorded = Recorded::default();
        let app = Router::new()
            .fallback(
                move |State(rec): State<Recorded>,
                      uri: Uri,
                      headers: HeaderMap,
                      axum::Json(req): axum::Json<serde_json::Value>| {
                    let body = body.clone();
                    async move {
                        let key = headers
                            .get("x-goog-api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(String::from);
                        rec.requests.lock().unwrap().push((uri.path().to_string(), key, req));
                        (status, axum::Json(body)).into_response()
                    }
                },
            )
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1beta"), recorded)
    }

    #[tokio::test]
    async fn synthesize_clothing_roundtrip() {
        let (base, recorded) = serve(StatusCode::OK, image_response("image/png", "R0FSTUVOVA==")).await;
        let gw = gateway().with_base_url(base);

        let image = gw.synthesize_clothing("denim jacket").await.unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.data(), "R0FSTUVOVA==");

        let requests = recorded.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let (path, key, body) = &requests[0];
        assert_eq!(path, "/v1beta/models/test-model:generateContent");
        assert_eq!(key.as_deref(), Some("test-key"));
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("denim jacket"));
    }

    #[tokio::test]
    async fn synthesize_try_on_roundtrip() {
        let (base, recorded) = serve(StatusCode::OK, image_response("image/jpeg", "UkVTVUxU")).await;
        let gw = gateway().with_base_url(base);

        let person = InlineImage::new("image/png", "UEVSU09O");
        let clothing = InlineImage::new("image/png", "Q0xPVEg=");
        let result = gw.synthesize_try_on(&person, &clothing).await.unwrap();
        assert_eq!(result.to_data_url(), "data:image/jpeg;base64,UkVTVUxU");

        let requests = recorded.requests.lock().unwrap();
        let parts = requests[0].2["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts[1]["inlineData"]["data"], "UEVSU09O");
        assert_eq!(parts[2]["inlineData"]["data"], "Q0xPVEg=");
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_a_call() {
        let (base, recorded) = serve(StatusCode::OK, image_response("image/png", "AAAA")).await;
        let gw = gateway().with_base_url(base);

        let err = gw.synthesize_clothing("   ").await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInput(_)));
        assert!(recorded.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited() {
        let (base, _) = serve(StatusCode::TOO_MANY_REQUESTS, serde_json::json!({})).await;
        let err = gateway()
            .with_base_url(base)
            .synthesize_clothing("scarf")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited { retry_after_secs: 5 }));
    }

    #[tokio::test]
    async fn forbidden_maps_to_authentication_failed() {
        let (base, _) = serve(StatusCode::FORBIDDEN, serde_json::json!({})).await;
        let err = gateway()
            .with_base_url(base)
            .synthesize_clothing("scarf")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let (base, _) = serve(
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({ "error": { "message": "overloaded" } }),
        )
        .await;
        let err = gateway()
            .with_base_url(base)
            .synthesize_clothing("scarf")
            .await
            .unwrap_err();
        match err {
            GenerationError::ApiError {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 500);
                assert!(message.contains("overloaded"));
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_api_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = gateway()
            .with_base_url(format!("http://{addr}"))
            .synthesize_clothing("scarf")
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Network(_)));
    }
}
