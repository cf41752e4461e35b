//! Core types for PNTP transparency self-assessments.

pub mod cascade;
pub mod catalog;
pub mod form;
pub mod key;
pub mod model;

pub use cascade::{AVAILABILITY, Cascade};
pub use catalog::{CatalogError, CriteriaCatalog, Explanation, ExplanationCatalog, QuestionSpec, TopicSpec};
pub use form::{Form, FormError, FormField, FormQuestion, FormTopic};
pub use key::{derive_key, report_file_name};
pub use model::{
    Answers, AssessmentRecord, CriterionAnswer, EntityType, NamedList, QuestionAnswers, Status,
    TopicAnswers, ValidationError,
};
