use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token identifying one interview attempt.
///
/// Generated client-side, never reused across a completed or abandoned
/// session, and threaded through every remote call so the service can
/// correlate the symptom-text and image entry points. Collisions only
/// cause cross-talk within this client's own sessions, so a time prefix
/// plus a random suffix is enough; nothing is persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self(format!("{:x}-{}", millis, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// In-memory record of the active interview: the current session id and
/// the follow-up questions still awaiting answers.
///
/// Owned exclusively by the flow controller; at most one interview is
/// live at a time and starting a new analysis replaces the whole record,
/// invalidating the previous session's pending questions.
#[derive(Debug, Clone)]
pub struct InterviewState {
    session_id: SessionId,
    pending_questions: Vec<String>,
}

impl InterviewState {
    pub fn begin(session_id: SessionId) -> Self {
        Self {
            session_id,
            pending_questions: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Adopt the session id echoed back by the service. The service may
    /// rewrite the client-proposed id; whatever it returns is the join
    /// key for the rest of the interview.
    pub fn adopt_session_id(&mut self, session_id: SessionId) {
        self.session_id = session_id;
    }

    pub fn set_pending_questions(&mut self, questions: Vec<String>) {
        self.pending_questions = questions;
    }

    pub fn clear_pending_questions(&mut self) {
        self.pending_questions.clear();
    }

    pub fn pending_questions(&self) -> &[String] {
        &self.pending_questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique_within_a_process() {
        let ids: HashSet<String> = (0..1000)
            .map(|_| SessionId::generate().as_str().to_string())
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn new_interview_has_no_pending_questions() {
        let state = InterviewState::begin(SessionId::generate());
        assert!(state.pending_questions().is_empty());
    }
}
