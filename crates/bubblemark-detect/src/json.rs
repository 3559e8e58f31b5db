//! Detector for sheets that were already run through an OMR engine.
//!
//! Each "image" is a JSON response map, either bare or wrapped the way the
//! HTTP engine answers: `{"RC1": "A"}` or `{"responses": {"RC1": "A"}}`.
//! Useful for replaying earlier scans and for end-to-end tests.

use async_trait::async_trait;
use serde::Deserialize;

use bubblemark_core::error::DetectionError;
use bubblemark_core::model::DetectedResponses;
use bubblemark_core::traits::{DetectRequest, Detector};

pub struct JsonDetector;

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped { responses: DetectedResponses },
    Bare(DetectedResponses),
}

#[async_trait]
impl Detector for JsonDetector {
    fn name(&self) -> &str {
        "json"
    }

    async fn detect(&self, request: &DetectRequest) -> Result<DetectedResponses, DetectionError> {
        let payload: Payload = serde_json::from_slice(&request.image)
            .map_err(|_| DetectionError::Decode("sheet is not a JSON response map".into()))?;
        Ok(match payload {
            Payload::Wrapped { responses } => responses,
            Payload::Bare(responses) => responses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubblemark_core::model::DetectedMark;

    fn request(body: &str) -> DetectRequest {
        DetectRequest {
            image: body.as_bytes().to_vec(),
            template: "any".into(),
        }
    }

    #[tokio::test]
    async fn bare_and_wrapped_maps() {
        let bare = JsonDetector
            .detect(&request(r#"{"RC1": "b", "RC2": []}"#))
            .await
            .unwrap();
        assert_eq!(bare.get("RC1"), &DetectedMark::Answer("B".into()));
        assert_eq!(bare.get("RC2"), &DetectedMark::Unmarked);

        let wrapped = JsonDetector
            .detect(&request(r#"{"responses": {"QR1": ["A", "D"]}}"#))
            .await
            .unwrap();
        assert!(matches!(wrapped.get("QR1"), DetectedMark::MultiMarked(_)));
    }

    #[tokio::test]
    async fn image_bytes_are_a_decode_failure() {
        let err = JsonDetector
            .detect(&DetectRequest {
                image: vec![0x89, 0x50, 0x4e, 0x47],
                template: "any".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DetectionError::Decode(_)));
    }
}
