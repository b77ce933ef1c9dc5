use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content-type tag carried by every research record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    Encyclopedia,
    AcademicPaper,
    News,
    Web,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Encyclopedia => "encyclopedia",
            ContentType::AcademicPaper => "academic_paper",
            ContentType::News => "news",
            ContentType::Web => "web",
        }
    }
}

impl From<String> for ContentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "encyclopedia" => ContentType::Encyclopedia,
            "academic_paper" => ContentType::AcademicPaper,
            "news" => ContentType::News,
            _ => ContentType::Web,
        }
    }
}

impl From<ContentType> for String {
    fn from(t: ContentType) -> Self {
        t.as_str().to_string()
    }
}

/// One normalized result from a knowledge source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRecord {
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub content_type: ContentType,
    /// In `[0, 1]`.
    pub relevance_score: f64,
    pub retrieved_at: DateTime<Utc>,
}

impl ResearchRecord {
    /// Builds a record stamped with the current time, clamping relevance to `[0, 1]`.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        content_type: ContentType,
        relevance_score: f64,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            url: url.into(),
            source: source.into(),
            content_type,
            relevance_score: relevance_score.clamp(0.0, 1.0),
            retrieved_at: Utc::now(),
        }
    }
}

/// Research results grouped by content type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchBundle {
    pub groups: BTreeMap<ContentType, Vec<ResearchRecord>>,
}

impl ResearchBundle {
    pub fn push(&mut self, record: ResearchRecord) {
        self.groups
            .entry(record.content_type)
            .or_default()
            .push(record);
    }

    /// Flattens all groups into one sequence, most specific source first.
    pub fn flatten(self) -> Vec<ResearchRecord> {
        self.groups.into_values().flatten().collect()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
