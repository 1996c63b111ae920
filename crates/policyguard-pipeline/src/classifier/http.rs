//! HTTP gateway to the external classification service.
//!
//! One outbound POST per chunk. The response contract is
//! `{ "classifications": [ { section_id, practice, status, evidence } ] }`;
//! anything else (transport failure, non-2xx status, missing or non-array
//! `classifications` field) surfaces as a [`ClassifierError`] carrying the
//! upstream detail message when one is available.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use policyguard_core::Classification;

use super::{Classifier, ClassifierError};

/// Configuration for the HTTP classifier gateway.
#[derive(Clone)]
pub struct HttpClassifierConfig {
    /// Service base URL, e.g. `http://localhost:8000`.
    pub base_url: String,

    /// Per-call timeout.
    pub timeout: Duration,

    /// Optional bearer token for the service. Held in a [`SecretString`] so
    /// it cannot leak through `Debug` output.
    pub api_key: Option<SecretString>,
}

impl HttpClassifierConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

impl std::fmt::Debug for HttpClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClassifierConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Request body for the classification service.
#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    section_id: &'a str,
}

/// Error body shape used by the service (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    detail: String,
}

/// Gateway to the external classification service.
pub struct HttpClassifier {
    config: HttpClassifierConfig,
    client: reqwest::Client,
}

impl HttpClassifier {
    pub fn new(config: HttpClassifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self { config, client }
    }

    /// Pull a human-readable detail message out of an error response body.
    async fn error_detail(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ServiceErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        }
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        text: &str,
        section_id: &str,
    ) -> Result<Vec<Classification>, ClassifierError> {
        let request = ClassifyRequest { text, section_id };

        let mut builder = self
            .client
            .post(format!("{}/classify", self.config.base_url))
            .timeout(self.config.timeout)
            .json(&request);

        // The credential is only exposed here, at the point of use.
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.config.timeout)
            } else {
                ClassifierError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = Self::error_detail(response).await;
            return Err(ClassifierError::Service {
                status: status.as_u16(),
                detail,
            });
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))?;

        parse_classifications(&body)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Validate and extract the `classifications` array from a response body.
fn parse_classifications(body: &JsonValue) -> Result<Vec<Classification>, ClassifierError> {
    let Some(classifications) = body.get("classifications") else {
        return Err(ClassifierError::MalformedResponse(
            "missing classifications field".to_string(),
        ));
    };

    if !classifications.is_array() {
        return Err(ClassifierError::MalformedResponse(
            "classifications is not a list".to_string(),
        ));
    }

    serde_json::from_value(classifications.clone())
        .map_err(|e| ClassifierError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyguard_core::{Practice, Status};
    use serde_json::json;

    #[test]
    fn test_parse_valid_response() {
        let body = json!({
            "classifications": [{
                "section_id": "chunk_0",
                "practice": "data_selling",
                "status": "ALLOWS",
                "evidence": "we sell data"
            }],
            "section_id": "chunk_0",
            "total_found": 1
        });

        let parsed = parse_classifications(&body).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].practice, Practice::DataSelling);
        assert_eq!(parsed[0].status, Status::Allows);
    }

    #[test]
    fn test_missing_classifications_field_is_malformed() {
        let body = json!({ "section_id": "chunk_0" });
        let err = parse_classifications(&body).unwrap_err();
        assert!(matches!(err, ClassifierError::MalformedResponse(_)));
        assert!(err.to_string().contains("missing classifications"));
    }

    #[test]
    fn test_non_list_classifications_is_malformed() {
        let body = json!({ "classifications": "nope" });
        let err = parse_classifications(&body).unwrap_err();
        assert!(matches!(err, ClassifierError::MalformedResponse(_)));
    }

    #[test]
    fn test_unknown_practice_in_response_is_malformed() {
        let body = json!({
            "classifications": [{
                "section_id": "chunk_0",
                "practice": "mind_reading",
                "status": "ALLOWS",
                "evidence": "..."
            }]
        });
        assert!(parse_classifications(&body).is_err());
    }

    #[test]
    fn test_empty_list_is_valid() {
        let body = json!({ "classifications": [] });
        assert!(parse_classifications(&body).unwrap().is_empty());
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let config = HttpClassifierConfig::new("http://localhost:8000")
            .with_api_key(SecretString::from("super-secret-key".to_string()));

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-key"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_default_timeout_is_30s() {
        let config = HttpClassifierConfig::new("http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
