//! Mock detector for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use bubblemark_core::error::DetectionError;
use bubblemark_core::model::DetectedResponses;
use bubblemark_core::traits::{DetectRequest, Detector};

/// A mock detector for exercising the pipeline without an OMR engine.
///
/// Responses are scripted per image: the image bytes are looked up as a UTF-8
/// string, so tests can name their "scans" and decide what each one yields.
pub struct MockDetector {
    /// Image text → detected marks.
    responses: HashMap<String, DetectedResponses>,
    /// Image text → failure to report.
    failures: HashMap<String, DetectionError>,
    /// Returned when no script matches.
    default_response: DetectedResponses,
    /// Simulated engine latency.
    delay: Duration,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<DetectRequest>>,
}

impl Default for MockDetector {
    fn default() -> Self {
        Self {
            responses: HashMap::new(),
            failures: HashMap::new(),
            default_response: DetectedResponses::new(),
            delay: Duration::ZERO,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }
}

impl MockDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that always returns the same marks.
    pub fn with_fixed_response(responses: DetectedResponses) -> Self {
        Self {
            default_response: responses,
            ..Self::default()
        }
    }

    pub fn respond(mut self, image: &str, responses: DetectedResponses) -> Self {
        self.responses.insert(image.to_string(), responses);
        self
    }

    pub fn fail(mut self, image: &str, error: DetectionError) -> Self {
        self.failures.insert(image.to_string(), error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Get the number of calls made to this detector.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this detector.
    pub fn last_request(&self) -> Option<DetectRequest> {
        self.last_request
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }
}

#[async_trait]
impl Detector for MockDetector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn detect(&self, request: &DetectRequest) -> Result<DetectedResponses, DetectionError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let key = String::from_utf8_lossy(&request.image);
        if let Some(err) = self.failures.get(key.as_ref()) {
            return Err(err.clone());
        }
        Ok(self
            .responses
            .get(key.as_ref())
            .unwrap_or(&self.default_response)
            .clone())
    }
}
