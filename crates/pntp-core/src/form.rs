//! Form session: the catalog-driven answer sheet a user edits.
//!
//! A [`Form`] is built from one entity type's topics, the explanation catalog
//! and an optional prior record. It keeps the user's raw inputs per question
//! and re-runs the availability cascade after every edit, so forced values
//! never leak back into the inputs: when availability is restored the
//! siblings show their earlier answers again.

use thiserror::Error;

use crate::cascade::{self, Cascade};
use crate::catalog::{Explanation, ExplanationCatalog, QuestionSpec, TopicSpec};
use crate::model::{Answers, AssessmentRecord, CriterionAnswer, EntityType, QuestionAnswers, Status};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown topic {0:?}")]
    UnknownTopic(String),

    #[error("unknown question {question:?} in topic {topic:?}")]
    UnknownQuestion { topic: String, question: String },

    #[error("unknown criterion {criterion:?} in question {question:?}")]
    UnknownCriterion { question: String, criterion: String },

    #[error("criterion {criterion:?} of {question:?} is locked while availability is not met")]
    Locked { question: String, criterion: String },
}

/// One editable field as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField<'q> {
    pub criterion: &'q str,
    pub answer: &'q CriterionAnswer,
    pub locked: bool,
}

#[derive(Debug, Clone)]
pub struct FormQuestion<'a> {
    pub spec: &'a QuestionSpec,
    pub explanation: Option<&'a Explanation>,
    inputs: QuestionAnswers,
    cascade: Cascade,
}

impl<'a> FormQuestion<'a> {
    fn new(spec: &'a QuestionSpec, explanation: Option<&'a Explanation>, inputs: QuestionAnswers) -> Self {
        let cascade = cascade::apply(&spec.criteria, &inputs);
        Self {
            spec,
            explanation,
            inputs,
            cascade,
        }
    }

    pub fn name(&self) -> &'a str {
        &self.spec.name
    }

    pub fn locked(&self) -> bool {
        self.cascade.locked
    }

    /// Effective answers after the cascade.
    pub fn answers(&self) -> &QuestionAnswers {
        &self.cascade.answers
    }

    pub fn fields(&self) -> impl Iterator<Item = FormField<'_>> {
        self.cascade.answers.iter().map(move |(criterion, answer)| FormField {
            criterion,
            answer,
            locked: self.cascade.is_locked(criterion),
        })
    }

    fn edit(&mut self, criterion: &str, f: impl FnOnce(&mut CriterionAnswer)) -> Result<(), FormError> {
        if !self.spec.has_criterion(criterion) {
            return Err(FormError::UnknownCriterion {
                question: self.spec.name.clone(),
                criterion: criterion.to_string(),
            });
        }
        if self.cascade.is_locked(criterion) {
            return Err(FormError::Locked {
                question: self.spec.name.clone(),
                criterion: criterion.to_string(),
            });
        }

        let mut answer = self.cascade.answers.get(criterion).cloned().unwrap_or_default();
        f(&mut answer);
        self.inputs.insert(criterion, answer);
        self.cascade = cascade::apply(&self.spec.criteria, &self.inputs);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FormTopic<'a> {
    pub name: &'a str,
    pub questions: Vec<FormQuestion<'a>>,
}

/// The answer sheet for one entity type.
#[derive(Debug, Clone)]
pub struct Form<'a> {
    topics: Vec<FormTopic<'a>>,
}

impl<'a> Form<'a> {
    /// Build the form from the catalog, pre-filling answers from `prior`
    /// where it has the same topic, question and criterion.
    pub fn new(
        topics: &'a [TopicSpec],
        explanations: &'a ExplanationCatalog,
        prior: Option<&AssessmentRecord>,
    ) -> Self {
        let topics = topics
            .iter()
            .map(|topic| {
                let questions = topic
                    .questions
                    .iter()
                    .map(|spec| {
                        let inputs = prior
                            .and_then(|r| r.answers.get(&topic.name))
                            .and_then(|t| t.get(&spec.name))
                            .cloned()
                            .unwrap_or_default();
                        FormQuestion::new(spec, explanations.get(&spec.name), inputs)
                    })
                    .collect();
                FormTopic {
                    name: &topic.name,
                    questions,
                }
            })
            .collect();
        Self { topics }
    }

    pub fn topics(&self) -> &[FormTopic<'a>] {
        &self.topics
    }

    pub fn question(&self, topic: &str, question: &str) -> Option<&FormQuestion<'a>> {
        self.topics
            .iter()
            .find(|t| t.name == topic)?
            .questions
            .iter()
            .find(|q| q.spec.name == question)
    }

    pub fn set_status(
        &mut self,
        topic: &str,
        question: &str,
        criterion: &str,
        status: Status,
    ) -> Result<(), FormError> {
        self.question_mut(topic, question)?
            .edit(criterion, |a| a.status = status)
    }

    pub fn set_note(
        &mut self,
        topic: &str,
        question: &str,
        criterion: &str,
        note: impl Into<String>,
    ) -> Result<(), FormError> {
        let note = note.into();
        self.question_mut(topic, question)?
            .edit(criterion, |a| a.note = note)
    }

    /// The effective answer tree, in catalog order.
    pub fn answers(&self) -> Answers {
        self.topics
            .iter()
            .map(|topic| {
                let questions = topic
                    .questions
                    .iter()
                    .map(|q| (q.spec.name.clone(), q.answers().clone()))
                    .collect();
                (topic.name.to_string(), questions)
            })
            .collect()
    }

    /// Snapshot the form as a new record stamped with the current time.
    pub fn to_record(&self, entity_name: &str, entity_type: EntityType) -> AssessmentRecord {
        AssessmentRecord::new(entity_name, entity_type, self.answers())
    }

    fn question_mut(&mut self, topic: &str, question: &str) -> Result<&mut FormQuestion<'a>, FormError> {
        let form_topic = self
            .topics
            .iter_mut()
            .find(|t| t.name == topic)
            .ok_or_else(|| FormError::UnknownTopic(topic.to_string()))?;
        form_topic
            .questions
            .iter_mut()
            .find(|q| q.spec.name == question)
            .ok_or_else(|| FormError::UnknownQuestion {
                topic: topic.to_string(),
                question: question.to_string(),
            })
    }
}
