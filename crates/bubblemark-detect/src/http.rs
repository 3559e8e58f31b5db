//! HTTP client for an external OMR engine service.
//!
//! The engine receives the raw image as the request body and answers with the
//! detected marks for the named template:
//!
//! ```text
//! POST {base_url}/v1/templates/{template}/detect
//! 200 {"responses": {"RC1": "A", "RC2": "", "RC3": ["B", "C"]}}
//! ```

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use bubblemark_core::error::DetectionError;
use bubblemark_core::model::DetectedResponses;
use bubblemark_core::traits::{DetectRequest, Detector};

/// OMR engine reached over HTTP.
pub struct HttpDetector {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpDetector {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client,
        })
    }
}

#[derive(Deserialize)]
struct DetectResponse {
    responses: DetectedResponses,
}

#[derive(Deserialize)]
struct EngineError {
    error: String,
}

/// Prefer the engine's own error message over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<EngineError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl Detector for HttpDetector {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(template = %request.template, bytes = request.image.len()))]
    async fn detect(&self, request: &DetectRequest) -> Result<DetectedResponses, DetectionError> {
        let mut builder = self
            .client
            .post(format!(
                "{}/v1/templates/{}/detect",
                self.base_url, request.template
            ))
            .header("content-type", "application/octet-stream")
            .body(request.image.clone());
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DetectionError::Timeout(self.timeout.as_secs())
            } else if e.is_connect() {
                DetectionError::Unavailable(format!(
                    "OMR engine not reachable at {}",
                    self.base_url
                ))
            } else {
                DetectionError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            tracing::debug!(status, %message, "engine rejected sheet");
            return Err(match status {
                404 => DetectionError::UnknownTemplate(request.template.clone()),
                400 | 415 | 422 => DetectionError::Decode(message),
                _ => DetectionError::Unavailable(format!("HTTP {status}: {message}")),
            });
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectionError::Unavailable(format!("failed to parse response: {e}")))?;
        Ok(parsed.responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubblemark_core::model::DetectedMark;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> DetectRequest {
        DetectRequest {
            image: b"\x89PNG fake".to_vec(),
            template: "aset_reading_template.json".into(),
        }
    }

    const DETECT_PATH: &str = "/v1/templates/aset_reading_template.json/detect";

    #[tokio::test]
    async fn successful_detection() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "responses": {"RC1": "a", "RC2": "", "RC3": ["B", "C"]}
        });

        Mock::given(method("POST"))
            .and(path(DETECT_PATH))
            .and(header("x-api-key", "test-key"))
            .and(body_bytes(b"\x89PNG fake".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let detector = HttpDetector::new(
            &server.uri(),
            Some("test-key".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        let responses = detector.detect(&request()).await.unwrap();

        assert_eq!(responses.get("RC1"), &DetectedMark::Answer("A".into()));
        assert_eq!(responses.get("RC2"), &DetectedMark::Unmarked);
        assert_eq!(
            responses.get("RC3"),
            &DetectedMark::MultiMarked(vec!["B".into(), "C".into()])
        );
    }

    #[tokio::test]
    async fn unreadable_sheet_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(DETECT_PATH))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"error": "no alignment markers found"})),
            )
            .mount(&server)
            .await;

        let detector = HttpDetector::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = detector.detect(&request()).await.unwrap_err();
        assert!(matches!(err, DetectionError::Decode(ref m) if m == "no alignment markers found"));
    }

    #[tokio::test]
    async fn unknown_template() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let detector = HttpDetector::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = detector.detect(&request()).await.unwrap_err();
        assert!(matches!(err, DetectionError::UnknownTemplate(_)));
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let detector = HttpDetector::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = detector.detect(&request()).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 503: overloaded"));
    }

    #[tokio::test]
    async fn slow_engine_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"responses": {}}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let detector = HttpDetector::new(&server.uri(), None, Duration::from_secs(1)).unwrap();
        let err = detector.detect(&request()).await.unwrap_err();
        assert!(matches!(err, DetectionError::Timeout(1)));
    }
}
