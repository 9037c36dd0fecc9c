use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::answers::{FollowUpAnswerSet, aggregate_answers};
use crate::client::DiagnosticApi;
use crate::error::{Result, TriageError};
use crate::models::{
    AnalysisResult, Demographics, ImageDiagnosis, ImageSubmission, MedicineRecommendation,
    NextStepInstruction, SymptomSubmission,
};
use crate::session::{InterviewState, SessionId};

/// Where the interview currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Idle,
    AwaitingAnalysis,
    QuestionsPending,
    ResolvingRecommendation,
    Complete,
    Error,
}

/// What the presenter should render next: either the follow-up questions
/// to collect answers for, or the terminal recommendation list. Both the
/// direct and the follow-up-mediated path end in `Complete`, so the
/// terminal rendering step stays in one place.
#[derive(Debug, Clone)]
pub enum FlowOutcome {
    QuestionsPending {
        analysis: Option<AnalysisResult>,
        questions: Vec<String>,
    },
    Complete {
        analysis: Option<AnalysisResult>,
        recommendations: Vec<MedicineRecommendation>,
    },
}

/// The remote call that failed, kept so an explicit retry can re-enter
/// the same branch with the same inputs and session id.
#[derive(Debug, Clone)]
enum PendingAction {
    Analysis(SymptomSubmission),
    ImageAnalysis(ImageSubmission),
    FollowUp(FollowUpAnswerSet, Demographics),
    Resolve(AnalysisResult),
}

/// Drives one interview at a time against the diagnostic service.
///
/// The controller owns the interview state exclusively and takes `&mut
/// self` on every submission, so one remote call is outstanding per
/// controller and submissions never interleave. Starting a new symptom
/// or image submission discards the previous session's pending
/// questions. A cancelled or timed-out call surfaces as a transport
/// failure and lands the controller in [`FlowPhase::Error`], never
/// silently back in `Idle`.
pub struct FlowController {
    api: Arc<dyn DiagnosticApi>,
    phase: FlowPhase,
    state: Option<InterviewState>,
    failed_from: Option<FlowPhase>,
    retryable: Option<PendingAction>,
}

impl FlowController {
    pub fn new(api: Arc<dyn DiagnosticApi>) -> Self {
        Self {
            api,
            phase: FlowPhase::Idle,
            state: None,
            failed_from: None,
            retryable: None,
        }
    }

    pub fn phase(&self) -> FlowPhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.state.as_ref().map(InterviewState::session_id)
    }

    pub fn pending_questions(&self) -> &[String] {
        self.state
            .as_ref()
            .map(InterviewState::pending_questions)
            .unwrap_or_default()
    }

    /// The in-flight phase the last failure happened in, while the
    /// controller sits in [`FlowPhase::Error`].
    pub fn failed_from(&self) -> Option<FlowPhase> {
        self.failed_from
    }

    pub fn can_retry(&self) -> bool {
        self.phase == FlowPhase::Error && self.retryable.is_some()
    }

    /// Start a new interview from free-text symptoms.
    ///
    /// Validation happens before any state changes: empty text is
    /// rejected with no transition and no network call. A fresh session
    /// id is generated and any previous interview is discarded.
    pub async fn submit_symptoms(&mut self, symptoms: &str) -> Result<FlowOutcome> {
        let submission = SymptomSubmission::new(symptoms, SessionId::generate())?;
        self.begin_interview(submission.session_id.clone());
        self.run_analysis(submission).await
    }

    /// Start a new interview from an image. Funnels into the same
    /// follow-up path as the text entry point.
    pub async fn submit_image(&mut self, image_bytes: &[u8]) -> Result<FlowOutcome> {
        let submission = ImageSubmission::from_bytes(image_bytes, SessionId::generate())?;
        self.begin_interview(submission.session_id.clone());
        self.run_image_analysis(submission).await
    }

    /// Answer the pending follow-up questions and resolve
    /// recommendations.
    ///
    /// Accepted while questions are pending, or from the error phase
    /// when the failure happened during recommendation resolution, in
    /// which case the stored session id is reused.
    pub async fn submit_follow_up(
        &mut self,
        responses: &HashMap<String, String>,
        demographics: Demographics,
    ) -> Result<FlowOutcome> {
        match self.phase {
            FlowPhase::QuestionsPending => {}
            FlowPhase::Error
                if self.failed_from == Some(FlowPhase::ResolvingRecommendation) => {}
            _ => {
                return Err(TriageError::Validation(
                    "no follow-up questions are pending".to_string(),
                ));
            }
        }

        let answers = aggregate_answers(self.pending_questions(), responses)?;
        self.run_follow_up(answers, demographics).await
    }

    /// Re-issue the remote call the last transport failure interrupted,
    /// with the same inputs and the same session id.
    pub async fn retry(&mut self) -> Result<FlowOutcome> {
        if self.phase != FlowPhase::Error {
            return Err(TriageError::Validation(
                "there is no failed step to retry".to_string(),
            ));
        }
        let action = self.retryable.take().ok_or_else(|| {
            TriageError::Validation("the last failure cannot be retried".to_string())
        })?;

        info!("retrying failed interview step");
        match action {
            PendingAction::Analysis(submission) => self.run_analysis(submission).await,
            PendingAction::ImageAnalysis(submission) => self.run_image_analysis(submission).await,
            PendingAction::FollowUp(answers, demographics) => {
                self.run_follow_up(answers, demographics).await
            }
            PendingAction::Resolve(analysis) => self.resolve_recommendation(analysis).await,
        }
    }

    /// Abandon the current interview, if any.
    pub fn reset(&mut self) {
        self.phase = FlowPhase::Idle;
        self.state = None;
        self.failed_from = None;
        self.retryable = None;
    }

    fn begin_interview(&mut self, session_id: SessionId) {
        if let Some(previous) = &self.state {
            info!(previous_session = %previous.session_id(), "discarding previous interview");
        }
        self.state = Some(InterviewState::begin(session_id));
        self.failed_from = None;
        self.retryable = None;
    }

    async fn run_analysis(&mut self, submission: SymptomSubmission) -> Result<FlowOutcome> {
        self.phase = FlowPhase::AwaitingAnalysis;
        info!(session_id = %submission.session_id, "awaiting symptom analysis");

        let result = match self.api.submit_symptoms(&submission).await {
            Ok(result) => result,
            Err(e) => return Err(self.fail(e, PendingAction::Analysis(submission))),
        };

        if let Some(state) = self.state.as_mut() {
            state.adopt_session_id(result.session_id);
        }

        match result.next_step {
            NextStepInstruction::NeedsFollowUp => self.surface_questions(
                result.analysis.follow_up_questions.clone(),
                Some(result.analysis),
            ),
            NextStepInstruction::ReadyForRecommendation => {
                self.resolve_recommendation(result.analysis).await
            }
        }
    }

    async fn run_image_analysis(&mut self, submission: ImageSubmission) -> Result<FlowOutcome> {
        self.phase = FlowPhase::AwaitingAnalysis;
        info!(session_id = %submission.session_id, "awaiting image diagnosis");

        let diagnosis = match self.api.submit_image(&submission).await {
            Ok(diagnosis) => diagnosis,
            Err(e) => return Err(self.fail(e, PendingAction::ImageAnalysis(submission))),
        };

        match diagnosis {
            ImageDiagnosis::NeedsClarification { questions } => {
                self.surface_questions(questions, None)
            }
            ImageDiagnosis::Complete => {
                self.phase = FlowPhase::Complete;
                info!("image diagnosis complete without follow-up");
                Ok(FlowOutcome::Complete {
                    analysis: None,
                    recommendations: Vec::new(),
                })
            }
        }
    }

    async fn run_follow_up(
        &mut self,
        answers: FollowUpAnswerSet,
        demographics: Demographics,
    ) -> Result<FlowOutcome> {
        let session_id = match self.session_id() {
            Some(id) => id.clone(),
            None => {
                return Err(TriageError::Validation(
                    "no active interview session".to_string(),
                ));
            }
        };

        self.phase = FlowPhase::ResolvingRecommendation;
        info!(%session_id, answered = answers.len(), "resolving recommendations from answers");

        let recommendations = match self
            .api
            .submit_follow_up(&session_id, &answers, demographics)
            .await
        {
            Ok(recommendations) => recommendations,
            Err(e) => return Err(self.fail(e, PendingAction::FollowUp(answers, demographics))),
        };

        self.complete(None, recommendations)
    }

    /// Direct-resolution branch: fetch recommendations for the
    /// highest-confidence disease. An empty disease list despite the
    /// ready instruction degrades to completion with an empty
    /// recommendation list; that is a defined edge case, not an error.
    async fn resolve_recommendation(&mut self, analysis: AnalysisResult) -> Result<FlowOutcome> {
        self.phase = FlowPhase::ResolvingRecommendation;

        let Some(disease) = analysis.possible_diseases.first().cloned() else {
            info!("analysis named no diseases; completing with no recommendations");
            return self.complete(Some(analysis), Vec::new());
        };

        info!(%disease, "resolving recommendations for top-ranked disease");
        let recommendations = match self.api.recommendations_for_disease(&disease).await {
            Ok(recommendations) => recommendations,
            Err(e) => return Err(self.fail(e, PendingAction::Resolve(analysis))),
        };

        self.complete(Some(analysis), recommendations)
    }

    fn surface_questions(
        &mut self,
        questions: Vec<String>,
        analysis: Option<AnalysisResult>,
    ) -> Result<FlowOutcome> {
        if questions.is_empty() {
            let err = TriageError::Protocol(
                "follow-up requested but no questions were supplied".to_string(),
            );
            return Err(self.fail_fatal(err));
        }

        if let Some(state) = self.state.as_mut() {
            state.set_pending_questions(questions.clone());
        }
        self.phase = FlowPhase::QuestionsPending;
        info!(count = questions.len(), "follow-up questions pending");

        Ok(FlowOutcome::QuestionsPending {
            analysis,
            questions,
        })
    }

    fn complete(
        &mut self,
        analysis: Option<AnalysisResult>,
        recommendations: Vec<MedicineRecommendation>,
    ) -> Result<FlowOutcome> {
        if let Some(state) = self.state.as_mut() {
            state.clear_pending_questions();
        }
        self.phase = FlowPhase::Complete;
        info!(
            recommendations = recommendations.len(),
            "interview complete"
        );

        Ok(FlowOutcome::Complete {
            analysis,
            recommendations,
        })
    }

    fn fail(&mut self, err: TriageError, action: PendingAction) -> TriageError {
        let retryable = err.is_retryable();
        warn!(
            category = err.category(),
            phase = ?self.phase,
            retryable,
            error = %err,
            "interview step failed"
        );
        self.failed_from = Some(self.phase);
        self.retryable = retryable.then_some(action);
        self.phase = FlowPhase::Error;
        err
    }

    fn fail_fatal(&mut self, err: TriageError) -> TriageError {
        warn!(category = err.category(), phase = ?self.phase, error = %err, "interview step failed");
        self.failed_from = Some(self.phase);
        self.retryable = None;
        self.phase = FlowPhase::Error;
        err
    }
}
