//! Domain types shared by the pipeline stages.

mod content;
mod research;

pub use content::{
    ImageDescriptor, Outline, PresentationContext, PromptAnalysis, SlideContent, SlideDescriptor,
    VisualSuggestion,
};
pub use research::{ContentType, ResearchBundle, ResearchRecord};

use serde::{Deserialize, Serialize};

/// Lifecycle state of a presentation job.
///
/// `queued → researching → planning → generating → assembling → completed`,
/// with `failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Researching,
    Planning,
    Generating,
    Assembling,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Researching => "researching",
            JobStatus::Planning => "planning",
            JobStatus::Generating => "generating",
            JobStatus::Assembling => "assembling",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parses a stored status. Unknown values are logged and read as `Failed`
    /// so a corrupt row is never mistaken for a live run.
    pub fn parse(s: &str, job_id: &str) -> JobStatus {
        match s {
            "queued" => JobStatus::Queued,
            "researching" => JobStatus::Researching,
            "planning" => JobStatus::Planning,
            "generating" => JobStatus::Generating,
            "assembling" => JobStatus::Assembling,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            other => {
                log::warn!(
                    "Unknown presentation status '{}' for {}, treating as failed",
                    other,
                    job_id
                );
                JobStatus::Failed
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a new run may begin from this status.
    pub fn is_startable(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a generation log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Started,
    Completed,
    Failed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Started => "started",
            LogStatus::Completed => "completed",
            LogStatus::Failed => "failed",
        }
    }
}

/// Kind of slide. Unknown names read as `Content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlideType {
    Title,
    Agenda,
    Content,
    Chart,
    Image,
    Conclusion,
    References,
}

impl SlideType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlideType::Title => "title",
            SlideType::Agenda => "agenda",
            SlideType::Content => "content",
            SlideType::Chart => "chart",
            SlideType::Image => "image",
            SlideType::Conclusion => "conclusion",
            SlideType::References => "references",
        }
    }
}

impl From<String> for SlideType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "title" => SlideType::Title,
            "agenda" => SlideType::Agenda,
            "chart" => SlideType::Chart,
            "image" => SlideType::Image,
            "conclusion" => SlideType::Conclusion,
            "references" => SlideType::References,
            _ => SlideType::Content,
        }
    }
}

impl From<SlideType> for String {
    fn from(t: SlideType) -> Self {
        t.as_str().to_string()
    }
}

/// Source classification recorded on a citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationSource {
    Web,
    Academic,
    News,
}

impl CitationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationSource::Web => "web",
            CitationSource::Academic => "academic",
            CitationSource::News => "news",
        }
    }

    pub fn from_content_type(content_type: ContentType) -> Self {
        match content_type {
            ContentType::AcademicPaper => CitationSource::Academic,
            ContentType::News => CitationSource::News,
            _ => CitationSource::Web,
        }
    }
}
