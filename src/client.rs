use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::answers::FollowUpAnswerSet;
use crate::error::{Result, TriageError};
use crate::models::{
    AnalysisResult, Demographics, ImageDiagnosis, ImageSubmission, MedicineRecommendation,
    NextStepInstruction, SymptomSubmission,
};
use crate::recommend::{BuiltinRecommendationSource, RecommendationSource};
use crate::session::SessionId;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parsed outcome of a symptom submission: the analysis, the session id
/// the service settled on, and the branch instruction.
#[derive(Debug, Clone)]
pub struct SymptomAnalysis {
    pub session_id: SessionId,
    pub analysis: AnalysisResult,
    pub next_step: NextStepInstruction,
}

/// The four remote operations the interview flow needs.
///
/// Every operation performs one round-trip and is idempotent from the
/// caller's perspective, so a caller may re-issue it after a transport
/// failure. No operation retries on its own; retry policy belongs to
/// the flow controller's user.
#[async_trait]
pub trait DiagnosticApi: Send + Sync {
    async fn submit_symptoms(&self, submission: &SymptomSubmission) -> Result<SymptomAnalysis>;

    async fn submit_follow_up(
        &self,
        session_id: &SessionId,
        answers: &FollowUpAnswerSet,
        demographics: Demographics,
    ) -> Result<Vec<MedicineRecommendation>>;

    async fn submit_image(&self, submission: &ImageSubmission) -> Result<ImageDiagnosis>;

    async fn recommendations_for_disease(
        &self,
        disease_id: &str,
    ) -> Result<Vec<MedicineRecommendation>>;
}

/// Connection settings for the remote diagnostic service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Read settings from `TRIAGE_API_BASE_URL` and
    /// `TRIAGE_HTTP_TIMEOUT_SECS`, falling back to the defaults.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("TRIAGE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("TRIAGE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize)]
struct FollowUpRequest<'a> {
    session_id: &'a SessionId,
    answers: &'a FollowUpAnswerSet,
    age: u32,
    weight: f64,
}

#[derive(serde::Deserialize)]
struct SymptomCheckerResponse {
    session_id: Option<String>,
    analysis: Option<AnalysisResult>,
    next_step: Option<String>,
}

#[derive(serde::Deserialize)]
struct FollowUpResponse {
    medicine_recommendations: Option<Vec<MedicineRecommendation>>,
}

#[derive(serde::Deserialize)]
struct ImageDiagnosisResponse {
    status: Option<String>,
    #[serde(default)]
    questions: Vec<String>,
}

/// JSON-over-HTTP implementation of [`DiagnosticApi`].
///
/// A non-success status is treated uniformly as a transport failure; a
/// success response missing a field the flow depends on is a protocol
/// error. The disease-based recommendation path delegates to a pluggable
/// [`RecommendationSource`], which is mock-backed in the current system.
pub struct HttpDiagnosticClient {
    http: reqwest::Client,
    base_url: String,
    recommendations: Arc<dyn RecommendationSource>,
}

impl HttpDiagnosticClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TriageError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            recommendations: Arc::new(BuiltinRecommendationSource),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Swap the direct-resolution fallback for another source, e.g. a
    /// real backend once one exists.
    pub fn with_recommendation_source(mut self, source: Arc<dyn RecommendationSource>) -> Self {
        self.recommendations = source;
        self
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "posting request");

        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TriageError::Transport(format!(
                "{path} returned status {status}"
            )));
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl DiagnosticApi for HttpDiagnosticClient {
    async fn submit_symptoms(&self, submission: &SymptomSubmission) -> Result<SymptomAnalysis> {
        info!(session_id = %submission.session_id, "submitting symptoms for analysis");

        let response: SymptomCheckerResponse =
            self.post_json("/symptom-checker", submission).await?;

        let session_id = response
            .session_id
            .map(SessionId::from)
            .ok_or_else(|| TriageError::Protocol("response is missing session_id".to_string()))?;
        let analysis = response
            .analysis
            .ok_or_else(|| TriageError::Protocol("response is missing analysis".to_string()))?;
        let next_step = response
            .next_step
            .ok_or_else(|| TriageError::Protocol("response is missing next_step".to_string()))?;

        Ok(SymptomAnalysis {
            session_id,
            analysis,
            next_step: NextStepInstruction::from_wire(&next_step)?,
        })
    }

    async fn submit_follow_up(
        &self,
        session_id: &SessionId,
        answers: &FollowUpAnswerSet,
        demographics: Demographics,
    ) -> Result<Vec<MedicineRecommendation>> {
        info!(%session_id, answered = answers.len(), "submitting follow-up answers");

        let request = FollowUpRequest {
            session_id,
            answers,
            age: demographics.age,
            weight: demographics.weight,
        };
        let response: FollowUpResponse = self.post_json("/follow-up-questions", &request).await?;

        response.medicine_recommendations.ok_or_else(|| {
            TriageError::Protocol("response is missing medicine_recommendations".to_string())
        })
    }

    async fn submit_image(&self, submission: &ImageSubmission) -> Result<ImageDiagnosis> {
        info!(session_id = %submission.session_id, "submitting image for diagnosis");

        let response: ImageDiagnosisResponse =
            self.post_json("/image-diagnosis", submission).await?;

        match response.status.as_deref() {
            Some("needs_clarification") => Ok(ImageDiagnosis::NeedsClarification {
                questions: response.questions,
            }),
            Some("complete") => Ok(ImageDiagnosis::Complete),
            Some(other) => Err(TriageError::Protocol(format!(
                "unrecognized image diagnosis status: {other:?}"
            ))),
            None => Err(TriageError::Protocol(
                "response is missing status".to_string(),
            )),
        }
    }

    async fn recommendations_for_disease(
        &self,
        disease_id: &str,
    ) -> Result<Vec<MedicineRecommendation>> {
        self.recommendations.for_disease(disease_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_are_applied() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let client = HttpDiagnosticClient::new(ClientConfig {
            base_url: "http://example.test/api/".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert_eq!(client.base_url, "http://example.test/api");
    }

    #[test]
    fn follow_up_request_carries_flat_demographics() {
        let session_id = SessionId::generate();
        let pending = vec!["How long have you had fever?".to_string()];
        let mut responses = std::collections::HashMap::new();
        responses.insert(
            "How long have you had fever?".to_string(),
            "3 days".to_string(),
        );
        let answers = crate::answers::aggregate_answers(&pending, &responses).unwrap();

        let request = FollowUpRequest {
            session_id: &session_id,
            answers: &answers,
            age: 25,
            weight: 70.0,
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["age"], 25);
        assert_eq!(wire["weight"], 70.0);
        assert_eq!(wire["answers"]["How long have you had fever?"], "3 days");
    }
}
