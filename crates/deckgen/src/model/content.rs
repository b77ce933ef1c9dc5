use serde::{Deserialize, Serialize};

use super::SlideType;

/// Structured analysis of a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptAnalysis {
    pub main_topic: String,
    pub subtopics: Vec<String>,
    pub suggested_structure: Vec<String>,
    pub research_areas: Vec<String>,
    pub presentation_style: String,
    pub complexity_level: String,
    pub estimated_slides: u32,
}

impl Default for PromptAnalysis {
    fn default() -> Self {
        Self {
            main_topic: String::new(),
            subtopics: Vec::new(),
            suggested_structure: vec![
                "Introduction".to_string(),
                "Main Content".to_string(),
                "Conclusion".to_string(),
            ],
            research_areas: Vec::new(),
            presentation_style: "corporate".to_string(),
            complexity_level: "intermediate".to_string(),
            estimated_slides: 10,
        }
    }
}

impl PromptAnalysis {
    /// Deterministic analysis derived from the prompt text alone.
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            main_topic: prompt.to_string(),
            research_areas: vec![prompt.to_string()],
            ..Self::default()
        }
    }
}

/// Planned slide, as produced by the outline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideDescriptor {
    pub slide_number: u32,
    pub title: String,
    #[serde(rename = "type")]
    pub slide_type: SlideType,
    #[serde(default)]
    pub main_points: Vec<String>,
    #[serde(default)]
    pub visual_elements: Vec<String>,
    #[serde(default)]
    pub speaker_notes: String,
}

/// Title plus ordered slide descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub slides: Vec<SlideDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualSuggestion {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub search_terms: Vec<String>,
}

/// Detailed content for one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideContent {
    pub title: String,
    #[serde(default)]
    pub bullet_points: Vec<String>,
    #[serde(default)]
    pub speaker_notes: String,
    #[serde(default)]
    pub visual_suggestions: Vec<VisualSuggestion>,
    /// 1-based indices into the research records shown to the slide.
    #[serde(default)]
    pub citations: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

/// Presentation-level context handed to per-slide generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationContext {
    pub title: String,
    pub theme: String,
    pub slide_count: u32,
}

/// A resolved image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_reads_type_field() {
        let json = r#"{"slide_number": 2, "title": "Agenda", "type": "agenda",
                       "main_points": ["Overview"]}"#;
        let d: SlideDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.slide_type, SlideType::Agenda);
        assert!(d.visual_elements.is_empty());
        assert!(d.speaker_notes.is_empty());
    }

    #[test]
    fn test_analysis_tolerates_missing_fields() {
        let a: PromptAnalysis = serde_json::from_str(r#"{"main_topic": "Solar"}"#).unwrap();
        assert_eq!(a.main_topic, "Solar");
        assert_eq!(a.estimated_slides, 10);
        assert_eq!(a.presentation_style, "corporate");
    }

    #[test]
    fn test_analysis_from_prompt() {
        let a = PromptAnalysis::from_prompt("Quantum computing");
        assert_eq!(a.main_topic, "Quantum computing");
        assert!(a.subtopics.is_empty());
        assert_eq!(a.research_areas, vec!["Quantum computing"]);
        assert_eq!(a.suggested_structure.len(), 3);
    }
}
