use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};
use crate::session::SessionId;

/// Largest accepted image payload (decoded size), matching the upload
/// guardrail of the original client.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Free-text symptom description bound to a session, consumed once.
#[derive(Debug, Clone, Serialize)]
pub struct SymptomSubmission {
    pub symptoms: String,
    pub session_id: SessionId,
}

impl SymptomSubmission {
    /// Rejects empty or whitespace-only symptom text before anything
    /// touches the network.
    pub fn new(symptoms: impl Into<String>, session_id: SessionId) -> Result<Self> {
        let symptoms = symptoms.into().trim().to_string();
        if symptoms.is_empty() {
            return Err(TriageError::Validation(
                "symptom description must not be empty".to_string(),
            ));
        }
        Ok(Self {
            symptoms,
            session_id,
        })
    }
}

/// Structured analysis returned by the diagnostic service. Immutable
/// once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Disease identifiers, most likely first.
    #[serde(default)]
    pub possible_diseases: Vec<String>,
    /// Confidence in [0, 1].
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

/// Server-supplied branch instruction carried next to the analysis.
///
/// A closed set: tags outside the two known values are a protocol
/// violation, never a silent fall-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStepInstruction {
    NeedsFollowUp,
    ReadyForRecommendation,
}

impl NextStepInstruction {
    pub fn from_wire(tag: &str) -> Result<Self> {
        match tag {
            "follow_up_questions" => Ok(Self::NeedsFollowUp),
            "recommendation" => Ok(Self::ReadyForRecommendation),
            other => Err(TriageError::Protocol(format!(
                "unrecognized next_step tag: {other:?}"
            ))),
        }
    }
}

/// One recommended medicine; sequence order is the service-provided
/// priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRecommendation {
    pub name: String,
    pub dosage: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Age and weight attached to the follow-up submission.
///
/// `Default` keeps the legacy wire behavior (the original client always
/// sent 25 / 70); callers that actually collected demographics build a
/// validated value instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Demographics {
    pub age: u32,
    pub weight: f64,
}

impl Demographics {
    pub fn new(age: u32, weight: f64) -> Result<Self> {
        if !(1..=120).contains(&age) {
            return Err(TriageError::Validation(format!(
                "age must be between 1 and 120 years, got {age}"
            )));
        }
        if !(1.0..=300.0).contains(&weight) {
            return Err(TriageError::Validation(format!(
                "weight must be between 1 and 300 kg, got {weight}"
            )));
        }
        Ok(Self { age, weight })
    }
}

impl Default for Demographics {
    fn default() -> Self {
        Self {
            age: 25,
            weight: 70.0,
        }
    }
}

/// Base64-encoded image bound to a session. Reuses [`SessionId`] so the
/// service can correlate image and symptom-text submissions.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSubmission {
    pub image: String,
    pub session_id: SessionId,
}

impl ImageSubmission {
    pub fn from_bytes(bytes: &[u8], session_id: SessionId) -> Result<Self> {
        if bytes.is_empty() {
            return Err(TriageError::Validation(
                "image payload must not be empty".to_string(),
            ));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(TriageError::Validation(format!(
                "image payload of {} bytes exceeds the {} byte limit",
                bytes.len(),
                MAX_IMAGE_BYTES
            )));
        }
        Ok(Self {
            image: base64::engine::general_purpose::STANDARD.encode(bytes),
            session_id,
        })
    }
}

/// Outcome of an image submission: either the service wants the same
/// follow-up round-trip as the text path, or it is done with the image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageDiagnosis {
    NeedsClarification { questions: Vec<String> },
    Complete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_symptom_text_is_a_validation_error() {
        let err = SymptomSubmission::new("   ", SessionId::generate()).unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
    }

    #[test]
    fn symptom_text_is_trimmed() {
        let submission = SymptomSubmission::new("  fever, cough  ", SessionId::generate()).unwrap();
        assert_eq!(submission.symptoms, "fever, cough");
    }

    #[test]
    fn next_step_tags_form_a_closed_set() {
        assert_eq!(
            NextStepInstruction::from_wire("follow_up_questions").unwrap(),
            NextStepInstruction::NeedsFollowUp
        );
        assert_eq!(
            NextStepInstruction::from_wire("recommendation").unwrap(),
            NextStepInstruction::ReadyForRecommendation
        );
        let err = NextStepInstruction::from_wire("try_again_later").unwrap_err();
        assert!(matches!(err, TriageError::Protocol(_)));
    }

    #[test]
    fn demographics_outside_range_are_rejected() {
        assert!(Demographics::new(0, 70.0).is_err());
        assert!(Demographics::new(121, 70.0).is_err());
        assert!(Demographics::new(30, 0.5).is_err());
        assert!(Demographics::new(30, 301.0).is_err());
        assert!(Demographics::new(30, 70.0).is_ok());
    }

    #[test]
    fn oversized_image_is_rejected_before_upload() {
        let payload = vec![0u8; MAX_IMAGE_BYTES + 1];
        let err = ImageSubmission::from_bytes(&payload, SessionId::generate()).unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
    }

    #[test]
    fn recommendation_note_is_omitted_from_the_wire_when_absent() {
        let rec = MedicineRecommendation {
            name: "Paracetamol".to_string(),
            dosage: "500mg every 6 hours".to_string(),
            duration: "3-5 days".to_string(),
            note: None,
        };
        let wire = serde_json::to_value(&rec).unwrap();
        assert!(wire.get("note").is_none());
    }
}
