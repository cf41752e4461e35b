//! Assessment records: the answer tree mirroring the criteria catalog.
//!
//! The persisted JSON shape is
//! `{"municipio", "tipo", "respostas": {topic: {question: {criterion: {"status", "observacao"}}}}, "data"}`
//! with topics, questions and criteria kept in insertion order.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::catalog::TopicSpec;
use crate::key::derive_key;

/// Format of the `data` field of a persisted record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

// ── Entity type ──

/// The kind of government body being assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    /// Municipal administration.
    #[serde(rename = "Prefeitura")]
    Executive,
    /// Municipal legislative chamber.
    #[serde(rename = "Câmara")]
    Legislative,
}

impl EntityType {
    pub const ALL: [EntityType; 2] = [EntityType::Executive, EntityType::Legislative];

    /// The label used in catalogs, persisted records and reports.
    pub fn label(self) -> &'static str {
        match self {
            EntityType::Executive => "Prefeitura",
            EntityType::Legislative => "Câmara",
        }
    }

    /// Parse a label, accepting the unaccented spelling and the English names.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "prefeitura" | "executive" => Some(EntityType::Executive),
            "câmara" | "camara" | "legislative" => Some(EntityType::Legislative),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown entity type {0:?} (expected Prefeitura or Câmara)")]
pub struct UnknownEntityType(pub String);

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownEntityType(s.to_string()))
    }
}

// ── Criterion answers ──

/// Compliance status of a single criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "Atende")]
    Compliant,
    #[serde(rename = "Não Atende")]
    NonCompliant,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Compliant => "Atende",
            Status::NonCompliant => "Não Atende",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown status {0:?} (expected Atende or Não Atende)")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "atende" | "compliant" | "sim" => Ok(Status::Compliant),
            "não atende" | "nao atende" | "non compliant" | "noncompliant" | "não" | "nao" => {
                Ok(Status::NonCompliant)
            }
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// The answer given for one criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionAnswer {
    pub status: Status,
    #[serde(rename = "observacao", default)]
    pub note: String,
}

impl CriterionAnswer {
    /// `{NonCompliant, ""}`, the value forced by the availability gate.
    pub fn non_compliant() -> Self {
        Self {
            status: Status::NonCompliant,
            note: String::new(),
        }
    }

    pub fn is_non_compliant(&self) -> bool {
        self.status == Status::NonCompliant
    }
}

// ── Ordered name → value lists ──

/// An insertion-ordered list of named entries that serializes as a JSON object.
///
/// Topics, questions and criteria all keep catalog order, which is display
/// order for both the form and the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedList<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for NamedList<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> NamedList<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Insert or replace. A replaced entry keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<V> FromIterator<(String, V)> for NamedList<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut list = Self::new();
        for (name, value) in iter {
            list.insert(name, value);
        }
        list
    }
}

impl<V: Serialize> Serialize for NamedList<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de, V: DeserializeOwned> Deserialize<'de> for NamedList<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // serde_json's map keeps document order (`preserve_order`).
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        map.into_iter()
            .map(|(name, value)| {
                serde_json::from_value(value)
                    .map(|v| (name, v))
                    .map_err(D::Error::custom)
            })
            .collect()
    }
}

pub type QuestionAnswers = NamedList<CriterionAnswer>;
pub type TopicAnswers = NamedList<QuestionAnswers>;
pub type Answers = NamedList<TopicAnswers>;

// ── Assessment record ──

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("entity name must not be empty")]
    EmptyEntityName,
}

/// A full self-assessment for one `(entity name, entity type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    #[serde(rename = "municipio")]
    pub entity_name: String,
    #[serde(rename = "tipo")]
    pub entity_type: EntityType,
    #[serde(rename = "respostas", default)]
    pub answers: Answers,
    #[serde(rename = "data", with = "minute_timestamp", default = "now_to_minute")]
    pub timestamp: NaiveDateTime,
}

impl AssessmentRecord {
    /// Build a record stamped with the current time. The entity name is trimmed.
    pub fn new(entity_name: &str, entity_type: EntityType, answers: Answers) -> Self {
        Self {
            entity_name: entity_name.trim().to_string(),
            entity_type,
            answers,
            timestamp: now_to_minute(),
        }
    }

    /// A record with every catalog criterion at its default answer.
    pub fn empty(entity_name: &str, entity_type: EntityType, topics: &[TopicSpec]) -> Self {
        let answers = topics
            .iter()
            .map(|topic| {
                let questions = topic
                    .questions
                    .iter()
                    .map(|q| {
                        let criteria = q
                            .criteria
                            .iter()
                            .map(|c| (c.clone(), CriterionAnswer::default()))
                            .collect();
                        (q.name.clone(), criteria)
                    })
                    .collect();
                (topic.name.clone(), questions)
            })
            .collect();
        Self::new(entity_name, entity_type, answers)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entity_name.trim().is_empty() {
            return Err(ValidationError::EmptyEntityName);
        }
        Ok(())
    }

    /// The derived storage key of this record.
    pub fn key(&self) -> String {
        derive_key(&self.entity_name, self.entity_type)
    }

    /// Re-stamp with the current time (called on save).
    pub fn touch(&mut self) {
        self.timestamp = now_to_minute();
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Equality on `{entity_name, entity_type, answers}`, ignoring the timestamp.
    pub fn same_content(&self, other: &Self) -> bool {
        self.entity_name == other.entity_name
            && self.entity_type == other.entity_type
            && self.answers == other.answers
    }

    pub fn answer(&self, topic: &str, question: &str, criterion: &str) -> Option<&CriterionAnswer> {
        self.answers.get(topic)?.get(question)?.get(criterion)
    }

    pub fn non_compliant_count(&self) -> usize {
        self.answers
            .values()
            .flat_map(|questions| questions.values())
            .flat_map(|criteria| criteria.values())
            .filter(|a| a.is_non_compliant())
            .count()
    }
}

fn now_to_minute() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

mod minute_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
