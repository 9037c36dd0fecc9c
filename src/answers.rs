use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::{Result, TriageError};

/// Follow-up answers keyed by question text. Only questions with a
/// non-empty trimmed answer make it in; iteration order never affects
/// the resulting set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FollowUpAnswerSet {
    answers: BTreeMap<String, String>,
}

impl FollowUpAnswerSet {
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn answer_for(&self, question: &str) -> Option<&str> {
        self.answers.get(question).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.answers
            .iter()
            .map(|(q, a)| (q.as_str(), a.as_str()))
    }
}

/// Collapse per-question free-text input into a single answer set for
/// the pending questions.
///
/// Fails with a validation error, before any network activity, if no
/// question ends up with a usable answer. Input for questions that are
/// not pending is ignored.
pub fn aggregate_answers(
    pending_questions: &[String],
    responses: &HashMap<String, String>,
) -> Result<FollowUpAnswerSet> {
    let mut answers = BTreeMap::new();
    for question in pending_questions {
        if let Some(raw) = responses.get(question) {
            let answer = raw.trim();
            if !answer.is_empty() {
                answers.insert(question.clone(), answer.to_string());
            }
        }
    }

    if answers.is_empty() {
        return Err(TriageError::Validation(
            "at least one follow-up question must be answered".to_string(),
        ));
    }

    Ok(FollowUpAnswerSet { answers })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|q| q.to_string()).collect()
    }

    #[test]
    fn all_blank_answers_fail_validation() {
        let pending = questions(&["How long have you had fever?", "Any chest pain?"]);
        let mut responses = HashMap::new();
        responses.insert("How long have you had fever?".to_string(), "   ".to_string());
        responses.insert("Any chest pain?".to_string(), "".to_string());

        let err = aggregate_answers(&pending, &responses).unwrap_err();
        assert!(matches!(err, TriageError::Validation(_)));
    }

    #[test]
    fn empty_entries_are_excluded() {
        let pending = questions(&["How long have you had fever?", "Any chest pain?"]);
        let mut responses = HashMap::new();
        responses.insert(
            "How long have you had fever?".to_string(),
            "  3 days ".to_string(),
        );
        responses.insert("Any chest pain?".to_string(), " ".to_string());

        let set = aggregate_answers(&pending, &responses).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.answer_for("How long have you had fever?"), Some("3 days"));
        assert_eq!(set.answer_for("Any chest pain?"), None);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![("How long have you had fever?", "3 days")]
        );
    }

    #[test]
    fn answers_for_unknown_questions_are_ignored() {
        let pending = questions(&["Any chest pain?"]);
        let mut responses = HashMap::new();
        responses.insert("Any chest pain?".to_string(), "no".to_string());
        responses.insert("Unrelated question".to_string(), "yes".to_string());

        let set = aggregate_answers(&pending, &responses).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.answer_for("Unrelated question"), None);
    }

    #[test]
    fn serializes_as_a_question_to_answer_map() {
        let pending = questions(&["How long have you had fever?"]);
        let mut responses = HashMap::new();
        responses.insert(
            "How long have you had fever?".to_string(),
            "3 days".to_string(),
        );

        let set = aggregate_answers(&pending, &responses).unwrap();
        let wire = serde_json::to_value(&set).unwrap();
        assert_eq!(wire["How long have you had fever?"], "3 days");
    }
}
