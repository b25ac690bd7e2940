use crate::core::config::Config;
use crate::core::error::GenerationError;
use crate::core::messages::Locale;
use crate::core::state::StorySegment;
use crate::services::prompt::{illustration_prompt, story_prompt, story_schema, strip_code_blocks};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

#[cfg(target_arch = "wasm32")]
pub trait ClientBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> ClientBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait ClientBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> ClientBounds for T {}

/// The two remote generation calls a story run depends on.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait StoryClient: ClientBounds {
    /// Segments sorted by `page`. The caller checks the count.
    async fn request_segments(&self, count: usize) -> GenerationResult<Vec<StorySegment>>;

    /// A displayable image reference (data URI) for one segment.
    async fn request_illustration(&self, text: &str) -> GenerationResult<String>;
}

pub struct GeminiClient {
    text_endpoint: Url,
    image_endpoint: Url,
    api_key: String,
    aspect_ratio: String,
    locale: Locale,
    client: reqwest::Client,
}

const API_KEY_HEADER: &str = "x-goog-api-key";

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("text_endpoint", &self.text_endpoint.as_str())
            .field("image_endpoint", &self.image_endpoint.as_str())
            .field("aspect_ratio", &self.aspect_ratio)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Fails with a config error when no API key can be resolved.
    pub fn new(config: &Config) -> GenerationResult<Self> {
        Self::with_env_key(config, Config::env_api_key())
    }

    /// Like [`GeminiClient::new`], with the environment's `API_KEY` value passed in.
    pub fn with_env_key(config: &Config, env_value: Option<String>) -> GenerationResult<Self> {
        let api_key = config.api_key_with(env_value)?;
        Self::with_api_key(config, &api_key)
    }

    pub fn with_api_key(config: &Config, api_key: &str) -> GenerationResult<Self> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::Config("API key must not be empty.".to_string()));
        }
        let gemini = &config.gemini;

        let text_endpoint = endpoint(&gemini.base_url, &gemini.text_model, "generateContent")?;
        let image_endpoint = endpoint(&gemini.base_url, &gemini.image_model, "predict")?;

        #[cfg(not(target_arch = "wasm32"))]
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(gemini.timeout_seconds))
            .build()
            .map_err(|e| GenerationError::Config(format!("Failed to build HTTP client: {}", e)))?;
        #[cfg(target_arch = "wasm32")]
        let client = reqwest::Client::new();

        Ok(Self {
            text_endpoint,
            image_endpoint,
            api_key: api_key.to_string(),
            aspect_ratio: gemini.aspect_ratio.clone(),
            locale: config.locale,
            client,
        })
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: &Url, body: &B) -> GenerationResult<String> {
        let resp = self
            .client
            .post(url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Remote(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        Ok(resp.text().await?)
    }
}

fn endpoint(base_url: &str, model: &str, method: &str) -> GenerationResult<Url> {
    let raw = format!("{}/models/{}:{}", base_url.trim_end_matches('/'), model, method);
    Url::parse(&raw)
        .map_err(|e| GenerationError::Config(format!("Invalid Gemini endpoint {}: {}", raw, e)))
}

// --- Text generation ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

/// Pulls the model's text out of a `generateContent` response body.
fn extract_text(body: &str) -> GenerationResult<String> {
    let result: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::Remote(format!("Failed to parse Gemini response: {}. Body: {}", e, body))
    })?;

    if let Some(err) = result.error {
        return Err(GenerationError::Remote(format!(
            "Gemini API returned error: {}",
            err.message
        )));
    }

    let first = result
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| GenerationError::Remote("Gemini response contained no candidates".to_string()))?;

    let text: String = first
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = first.finish_reason.as_deref().unwrap_or("UNKNOWN");
        return Err(GenerationError::Remote(format!(
            "Gemini response empty. Finish reason: {}",
            reason
        )));
    }
    Ok(text)
}

/// Parses the structured story payload and orders it by page ordinal.
pub fn parse_segments(text: &str) -> GenerationResult<Vec<StorySegment>> {
    let clean_json = strip_code_blocks(text);
    let mut segments: Vec<StorySegment> = serde_json::from_str(&clean_json).map_err(|e| {
        log::error!("Failed to parse story JSON: {}", text);
        GenerationError::Parse(e.to_string())
    })?;
    segments.sort_by_key(|s| s.page);
    Ok(segments)
}

// --- Image generation ---

#[derive(Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    output_mime_type: String,
    aspect_ratio: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Turns a `predict` response body into a `data:` URI for the first image.
fn extract_image(body: &str) -> GenerationResult<String> {
    let result: PredictResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::Remote(format!("Failed to parse Imagen response: {}", e))
    })?;

    if let Some(err) = result.error {
        return Err(GenerationError::Remote(format!(
            "Imagen API returned error: {}",
            err.message
        )));
    }

    result
        .predictions
        .into_iter()
        .find_map(|p| {
            let bytes = p.bytes_base64_encoded.filter(|b| !b.is_empty())?;
            let mime = p.mime_type.unwrap_or_else(|| IMAGE_MIME_TYPE.to_string());
            Some(format!("data:{};base64,{}", mime, bytes))
        })
        .ok_or(GenerationError::ImageMissing)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl StoryClient for GeminiClient {
    async fn request_segments(&self, count: usize) -> GenerationResult<Vec<StorySegment>> {
        if count == 0 {
            return Err(GenerationError::InvalidRequest(
                "segment count must be positive".to_string(),
            ));
        }

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: story_prompt(count, self.locale),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: story_schema(self.locale),
            },
        };

        log::debug!("Requesting {} story segments", count);
        let body = self.post_json(&self.text_endpoint, &request_body).await?;
        let text = extract_text(&body)?;
        parse_segments(&text)
    }

    async fn request_illustration(&self, text: &str) -> GenerationResult<String> {
        if text.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "illustration text must not be empty".to_string(),
            ));
        }

        let request_body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: illustration_prompt(text),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                output_mime_type: IMAGE_MIME_TYPE.to_string(),
                aspect_ratio: self.aspect_ratio.clone(),
            },
        };

        log::debug!("Requesting illustration ({} chars of text)", text.chars().count());
        let body = self.post_json(&self.image_endpoint, &request_body).await?;
        extract_image(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::messages::Messages;

    #[test]
    fn test_gemini_response_parsing_safety_block() {
        let json = r#"{
            "candidates": [
                {
                    "finishReason": "SAFETY",
                    "index": 0
                }
            ]
        }"#;

        let err = extract_text(json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_gemini_response_parsing_api_error() {
        let json = r#"{ "error": { "code": 429, "message": "Quota exceeded" } }"#;

        let err = extract_text(json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(err.to_string().contains("Quota exceeded"));
    }

    #[test]
    fn test_gemini_response_joins_parts() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "[{\"page\": 2, \"text\": \"b\"}," },
                            { "text": "{\"page\": 1, \"text\": \"a\"}]" }
                        ],
                        "role": "model"
                    },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;

        let text = extract_text(json).unwrap();
        let segments = parse_segments(&text).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].page, 1);
        assert_eq!(segments[0].text, "a");
        assert_eq!(segments[1].page, 2);
    }

    #[test]
    fn test_parse_segments_sorts_and_strips_fences() {
        let text = "```json\n[{\"page\": 3, \"text\": \"c\"}, {\"page\": 1, \"text\": \"a\"}, {\"page\": 2, \"text\": \"b\"}]\n```";
        let pages: Vec<u32> = parse_segments(text).unwrap().iter().map(|s| s.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_parse_segments_rejects_wrong_shape() {
        let err = parse_segments(r#"{"story": "once upon a time"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = parse_segments(r#"[{"page": "one", "text": "a"}]"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = parse_segments("not json at all").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_image_response_becomes_data_uri() {
        let json = r#"{
            "predictions": [
                { "bytesBase64Encoded": "AAEC", "mimeType": "image/jpeg" }
            ]
        }"#;
        assert_eq!(extract_image(json).unwrap(), "data:image/jpeg;base64,AAEC");
    }

    #[test]
    fn test_image_response_without_predictions() {
        let err = extract_image("{}").unwrap_err();
        assert!(matches!(err, GenerationError::ImageMissing));

        let filtered = r#"{ "predictions": [ { "raiFilteredReason": "blocked" } ] }"#;
        assert!(matches!(
            extract_image(filtered).unwrap_err(),
            GenerationError::ImageMissing
        ));
    }

    #[test]
    fn test_request_body_uses_camel_case() {
        let body = GeminiRequest {
            contents: vec![],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: story_schema(Locale::En),
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[test]
    fn test_endpoint_keeps_key_out_of_url() {
        let url = endpoint("https://example.test/v1beta/", "gemini-2.5-flash", "generateContent")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(url.query().is_none());
    }

    #[test]
    fn test_client_requires_credential() {
        let config = Config::default();
        let err = GeminiClient::with_env_key(&config, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("API_KEY"));

        let err = GeminiClient::with_env_key(&config, Some("  ".to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = GeminiClient::with_api_key(&config, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_client_accepts_file_credential() {
        let mut config = Config::default();
        config.gemini.api_key = Some("from-file".to_string());
        assert!(GeminiClient::with_env_key(&config, None).is_ok());
    }

    #[test]
    fn test_debug_output_hides_key() {
        let config = Config::default();
        let client = GeminiClient::with_api_key(&config, "SUPERSECRETKEY").unwrap();
        assert!(!format!("{:?}", client).contains("SUPERSECRETKEY"));
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_expose_key() {
        let key = "SUPERSECRETKEY";
        let mut config = Config::default();
        config.gemini.base_url = "http://127.0.0.1:9/v1beta".to_string();
        config.gemini.timeout_seconds = 5;
        let client = GeminiClient::with_api_key(&config, key).unwrap();

        let err = client.request_segments(10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(!err.to_string().contains(key));

        let shown = Messages::new(Locale::En).run_failed(&err);
        assert!(!shown.contains(key), "error message leaked the key: {}", shown);

        let err = client.request_illustration("A page").await.unwrap_err();
        assert!(!Messages::new(Locale::En).run_failed(&err).contains(key));
    }

    #[tokio::test]
    async fn test_zero_segments_rejected_before_network() {
        let config = Config::default();
        let client = GeminiClient::with_api_key(&config, "k").unwrap();
        let err = client.request_segments(0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = client.request_illustration("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
