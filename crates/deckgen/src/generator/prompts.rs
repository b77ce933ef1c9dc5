//! Prompt text for the completion-backed generator.

use crate::model::{PromptAnalysis, ResearchRecord, SlideDescriptor};

use super::CompletionParams;

pub(super) const ANALYZE_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.3,
    max_tokens: 1000,
};
pub(super) const OUTLINE_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.4,
    max_tokens: 2000,
};
pub(super) const SLIDE_PARAMS: CompletionParams = CompletionParams {
    temperature: 0.5,
    max_tokens: 1500,
};

/// Research snippets longer than this are cut in the slide prompt.
const SNIPPET_CHARS: usize = 500;

pub(super) const ANALYZE_SYSTEM: &str = r#"You are an expert presentation analyst. Analyze the given prompt and provide a structured response with:
1. Main topic and subtopics
2. Suggested presentation structure
3. Key areas to research
4. Appropriate presentation style (corporate, academic, creative)
5. Estimated complexity level

Respond in JSON format with the following structure:
{
    "main_topic": "string",
    "subtopics": ["string1", "string2"],
    "suggested_structure": ["Introduction", "Main Points", "Conclusion"],
    "research_areas": ["area1", "area2"],
    "presentation_style": "corporate|academic|creative",
    "complexity_level": "basic|intermediate|advanced",
    "estimated_slides": 10
}"#;

pub(super) const SLIDE_SYSTEM: &str = r#"You are an expert content writer for presentations. Create detailed, professional slide content.

For each slide, provide:
1. Refined title
2. 3-5 concise bullet points
3. Detailed speaker notes
4. Suggested images or visuals with descriptions
5. Citations for factual claims, as 1-based indices into the research data

Keep content professional, engaging, and factually accurate. Use the provided research data to support your points.

Respond in JSON format:
{
    "title": "Refined Slide Title",
    "bullet_points": ["point1", "point2"],
    "speaker_notes": "Detailed speaker notes",
    "visual_suggestions": [
        {"type": "image|chart|diagram", "description": "Description of visual", "search_terms": ["term1"]}
    ],
    "citations": [1, 2],
    "additional_notes": "Any additional context"
}"#;

pub(super) fn outline_system(slide_count: u32) -> String {
    format!(
        r#"You are an expert presentation designer. Create a detailed outline for a {slide_count}-slide presentation.

The outline should include a title slide, an agenda slide, content slides with specific topics and a conclusion slide.
Return exactly {slide_count} slides.

Each slide should have:
- Title
- Main points (3-5 bullet points max)
- Suggested visual elements (charts, images, etc.)
- Speaker notes outline

Respond in JSON format:
{{
    "title": "Presentation Title",
    "slides": [
        {{
            "slide_number": 1,
            "title": "Slide Title",
            "type": "title|agenda|content|conclusion",
            "main_points": ["point1", "point2"],
            "visual_elements": ["chart", "image"],
            "speaker_notes": "Brief outline of what to say"
        }}
    ]
}}"#
    )
}

pub(super) fn analyze_user(prompt: &str) -> String {
    format!(
        "Analyze this presentation prompt: {}",
        sanitize_for_prompt(prompt)
    )
}

pub(super) fn outline_user(prompt: &str, slide_count: u32, analysis: &PromptAnalysis) -> String {
    format!(
        "Create an outline for: {}\nSlide count: {}\nStyle: {}",
        sanitize_for_prompt(prompt),
        slide_count,
        analysis.presentation_style
    )
}

pub(super) fn slide_user(descriptor: &SlideDescriptor, research: &[ResearchRecord]) -> String {
    let research_context = research
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let snippet: String = r.content.chars().take(SNIPPET_CHARS).collect();
            format!("[{}] Source: {}\nContent: {}...", i + 1, r.title, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Create content for slide:\nTitle: {}\nType: {}\nMain points: {}\n\nResearch data:\n{}",
        sanitize_for_prompt(&descriptor.title),
        descriptor.slide_type.as_str(),
        sanitize_for_prompt(&descriptor.main_points.join("; ")),
        sanitize_for_prompt(&research_context)
    )
}

/// Escapes chat-template control sequences in user-supplied text.
fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|", "< |")
        .replace("|>", "| >")
        .replace("[INST]", "[ INST ]")
        .replace("[/INST]", "[ / INST ]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentType, SlideType};

    #[test]
    fn test_outline_system_names_slide_count() {
        let text = outline_system(7);
        assert!(text.contains("7-slide presentation"));
        assert!(text.contains("\"slides\": ["));
    }

    #[test]
    fn test_slide_user_numbers_research_and_truncates() {
        let descriptor = SlideDescriptor {
            slide_number: 3,
            title: "Costs".to_string(),
            slide_type: SlideType::Content,
            main_points: vec!["Capex".to_string(), "Opex".to_string()],
            visual_elements: Vec::new(),
            speaker_notes: String::new(),
        };
        let long = "x".repeat(800);
        let research = vec![ResearchRecord::new("Src", long, "", "t", ContentType::Web, 0.5)];
        let text = slide_user(&descriptor, &research);
        assert!(text.contains("[1] Source: Src"));
        assert!(text.contains("Main points: Capex; Opex"));
        assert!(!text.contains(&"x".repeat(501)));
    }

    #[test]
    fn test_sanitize_for_prompt() {
        assert_eq!(sanitize_for_prompt("<|system|>"), "< |system| >");
    }
}
