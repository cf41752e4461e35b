//! The availability gate.
//!
//! When a question's `Disponibilidade` criterion is marked "Não Atende", the
//! information is not published at all, so every other criterion of that
//! question is forced to `{Não Atende, ""}` and cannot be edited until the
//! availability answer changes back.

use crate::model::{CriterionAnswer, QuestionAnswers};

/// Name of the criterion gating its siblings.
pub const AVAILABILITY: &str = "Disponibilidade";

/// Effective answers for one question after the gate has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cascade {
    /// Exactly the question's criteria, in catalog order.
    pub answers: QuestionAnswers,
    /// True when availability is not met and siblings are forced.
    pub locked: bool,
}

impl Cascade {
    /// Whether `criterion` is read-only in this pass. The gate itself never is.
    pub fn is_locked(&self, criterion: &str) -> bool {
        self.locked && criterion != AVAILABILITY
    }
}

/// Apply the availability gate to one question.
///
/// `criteria` is the question's criterion list from the catalog; `answers`
/// holds the user-supplied (or previously persisted) values. Criteria with no
/// supplied value default to "Atende" with an empty note. A question without
/// an availability criterion is never forced.
pub fn apply(criteria: &[String], answers: &QuestionAnswers) -> Cascade {
    let locked = criteria.iter().any(|c| c == AVAILABILITY)
        && answers
            .get(AVAILABILITY)
            .is_some_and(CriterionAnswer::is_non_compliant);

    let answers = criteria
        .iter()
        .map(|criterion| {
            let answer = if locked && criterion != AVAILABILITY {
                CriterionAnswer::non_compliant()
            } else {
                answers.get(criterion).cloned().unwrap_or_default()
            };
            (criterion.clone(), answer)
        })
        .collect();

    Cascade { answers, locked }
}
