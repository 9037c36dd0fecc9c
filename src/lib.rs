pub mod answers;
pub mod catalog;
pub mod client;
pub mod error;
pub mod flow;
pub mod models;
pub mod recommend;
pub mod session;

// Re-export commonly used types
pub use answers::{FollowUpAnswerSet, aggregate_answers};
pub use catalog::{DosageRequest, DosageResult, MedicineCatalog, MedicineDetail, MedicineSummary};
pub use client::{ClientConfig, DiagnosticApi, HttpDiagnosticClient, SymptomAnalysis};
pub use error::{Result, TriageError};
pub use flow::{FlowController, FlowOutcome, FlowPhase};
pub use models::{
    AnalysisResult, Demographics, ImageDiagnosis, ImageSubmission, MedicineRecommendation,
    NextStepInstruction, SymptomSubmission,
};
pub use recommend::{BuiltinRecommendationSource, RecommendationSource};
pub use session::{InterviewState, SessionId};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Fixed-script service for the canonical interview: fever/cough,
    /// one follow-up question, one recommendation.
    struct FeverScenarioApi;

    #[async_trait]
    impl DiagnosticApi for FeverScenarioApi {
        async fn submit_symptoms(&self, submission: &SymptomSubmission) -> Result<SymptomAnalysis> {
            assert_eq!(submission.symptoms, "fever, cough");
            Ok(SymptomAnalysis {
                session_id: submission.session_id.clone(),
                analysis: AnalysisResult {
                    possible_diseases: vec!["flu".to_string()],
                    confidence: 0.8,
                    follow_up_questions: vec!["How long have you had fever?".to_string()],
                },
                next_step: NextStepInstruction::NeedsFollowUp,
            })
        }

        async fn submit_follow_up(
            &self,
            _session_id: &SessionId,
            answers: &FollowUpAnswerSet,
            demographics: Demographics,
        ) -> Result<Vec<MedicineRecommendation>> {
            assert_eq!(
                answers.answer_for("How long have you had fever?"),
                Some("3 days")
            );
            assert_eq!(demographics.age, 25);
            Ok(vec![MedicineRecommendation {
                name: "Paracetamol".to_string(),
                dosage: "500mg every 6 hours".to_string(),
                duration: "3-5 days".to_string(),
                note: None,
            }])
        }

        async fn submit_image(&self, _: &ImageSubmission) -> Result<ImageDiagnosis> {
            unreachable!("scenario has no image submission")
        }

        async fn recommendations_for_disease(
            &self,
            _: &str,
        ) -> Result<Vec<MedicineRecommendation>> {
            unreachable!("scenario resolves through follow-up")
        }
    }

    #[tokio::test]
    async fn fever_interview_runs_end_to_end() {
        let mut controller = FlowController::new(Arc::new(FeverScenarioApi));

        let outcome = controller.submit_symptoms("fever, cough").await.unwrap();
        let FlowOutcome::QuestionsPending {
            analysis,
            questions,
        } = outcome
        else {
            panic!("expected a follow-up question");
        };
        assert_eq!(questions, vec!["How long have you had fever?".to_string()]);
        let analysis = analysis.unwrap();
        assert_eq!(analysis.possible_diseases, vec!["flu".to_string()]);
        assert!((analysis.confidence - 0.8).abs() < f64::EPSILON);

        let mut responses = HashMap::new();
        responses.insert(
            "How long have you had fever?".to_string(),
            "3 days".to_string(),
        );
        let outcome = controller
            .submit_follow_up(&responses, Demographics::default())
            .await
            .unwrap();

        let FlowOutcome::Complete {
            recommendations, ..
        } = outcome
        else {
            panic!("expected completion");
        };
        assert_eq!(recommendations.len(), 1);
        assert_eq!(recommendations[0].name, "Paracetamol");
        assert_eq!(recommendations[0].dosage, "500mg every 6 hours");
        assert_eq!(controller.phase(), FlowPhase::Complete);
    }
}
