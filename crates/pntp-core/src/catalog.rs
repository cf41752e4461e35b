//! Static catalogs driving the form: the criteria tree and the per-question
//! explanations.
//!
//! Both are loaded once at startup and passed by reference to the form and
//! report code.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::cascade::AVAILABILITY;
use crate::model::EntityType;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("catalog shape mismatch at {path}: expected {expected}")]
    Shape { path: String, expected: &'static str },

    #[error("unknown entity type {0:?} in criteria catalog")]
    UnknownEntityType(String),
}

// ── Criteria catalog ──

/// A question and its criteria, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSpec {
    pub name: String,
    pub criteria: Vec<String>,
}

impl QuestionSpec {
    /// Whether the availability gate applies to this question.
    pub fn has_availability(&self) -> bool {
        self.criteria.iter().any(|c| c == AVAILABILITY)
    }

    pub fn has_criterion(&self, criterion: &str) -> bool {
        self.criteria.iter().any(|c| c == criterion)
    }
}

/// A topic and its questions, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub questions: Vec<QuestionSpec>,
}

impl TopicSpec {
    pub fn question(&self, name: &str) -> Option<&QuestionSpec> {
        self.questions.iter().find(|q| q.name == name)
    }
}

/// `{entityType: {topic: {question: {criterion: <placeholder>}}}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaCatalog {
    entries: Vec<(EntityType, Vec<TopicSpec>)>,
}

impl CriteriaCatalog {
    /// Parse and shape-check a criteria catalog.
    ///
    /// Every level down to the question must be a JSON object; criterion
    /// values are placeholders and are not inspected.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let root: Value = serde_json::from_str(raw)?;
        let root = as_object(&root, "$", "an object keyed by entity type")?;

        let mut entries = Vec::with_capacity(root.len());
        for (type_label, topics) in root {
            let entity_type = EntityType::from_label(type_label)
                .ok_or_else(|| CatalogError::UnknownEntityType(type_label.clone()))?;
            let type_path = format!("$.{type_label}");
            let topics = as_object(topics, &type_path, "an object keyed by topic")?;

            let mut topic_specs = Vec::with_capacity(topics.len());
            for (topic, questions) in topics {
                let topic_path = format!("{type_path}.{topic}");
                let questions = as_object(questions, &topic_path, "an object keyed by question")?;

                let mut question_specs = Vec::with_capacity(questions.len());
                for (question, criteria) in questions {
                    let question_path = format!("{topic_path}.{question}");
                    let criteria =
                        as_object(criteria, &question_path, "an object keyed by criterion")?;
                    question_specs.push(QuestionSpec {
                        name: question.clone(),
                        criteria: criteria.keys().cloned().collect(),
                    });
                }
                topic_specs.push(TopicSpec {
                    name: topic.clone(),
                    questions: question_specs,
                });
            }
            entries.push((entity_type, topic_specs));
        }
        Ok(Self { entries })
    }

    /// Read and parse a criteria catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = read_catalog(path)?;
        let catalog = Self::from_json(&raw)?;
        for (entity_type, topics) in &catalog.entries {
            let questions: usize = topics.iter().map(|t| t.questions.len()).sum();
            info!(
                path = %path.display(),
                entity_type = %entity_type,
                topics = topics.len(),
                questions,
                "loaded criteria catalog"
            );
        }
        Ok(catalog)
    }

    /// Topics for an entity type; empty when the catalog has no entry for it.
    pub fn topics(&self, entity_type: EntityType) -> &[TopicSpec] {
        self.entries
            .iter()
            .find(|(t, _)| *t == entity_type)
            .map(|(_, topics)| topics.as_slice())
            .unwrap_or(&[])
    }

    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        self.entries.iter().map(|(t, _)| *t)
    }
}

fn as_object<'a>(
    value: &'a Value,
    path: &str,
    expected: &'static str,
) -> Result<&'a Map<String, Value>, CatalogError> {
    value.as_object().ok_or_else(|| CatalogError::Shape {
        path: path.to_string(),
        expected,
    })
}

fn read_catalog(path: &Path) -> Result<String, CatalogError> {
    std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Explanation catalog ──

/// Display text attached to a question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Explanation {
    #[serde(default, rename = "explicacao", alias = "explanation")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub base_legal: Option<String>,
}

impl Explanation {
    fn normalized(self) -> Self {
        let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        Self {
            explanation: non_blank(self.explanation),
            base_legal: non_blank(self.base_legal),
        }
    }
}

/// `{question: {explicacao?, base_legal?}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplanationCatalog {
    entries: HashMap<String, Explanation>,
}

impl ExplanationCatalog {
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let parsed: HashMap<String, Explanation> = serde_json::from_str(raw)?;
        let entries = parsed
            .into_iter()
            .map(|(question, e)| (question, e.normalized()))
            .collect();
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let catalog = Self::from_json(&read_catalog(path)?)?;
        info!(path = %path.display(), entries = catalog.len(), "loaded explanation catalog");
        Ok(catalog)
    }

    pub fn get(&self, question: &str) -> Option<&Explanation> {
        self.entries.get(question)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
