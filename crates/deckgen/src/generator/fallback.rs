//! Deterministic substitutes used when the completion backend is unavailable.

use crate::model::{Outline, SlideContent, SlideDescriptor, SlideType, VisualSuggestion};

fn descriptor(
    slide_number: u32,
    title: impl Into<String>,
    slide_type: SlideType,
    main_points: &[&str],
    visual: &str,
    notes: impl Into<String>,
) -> SlideDescriptor {
    SlideDescriptor {
        slide_number,
        title: title.into(),
        slide_type,
        main_points: main_points.iter().map(|p| p.to_string()).collect(),
        visual_elements: vec![visual.to_string()],
        speaker_notes: notes.into(),
    }
}

/// Skeleton outline with exactly `slide_count` slides.
///
/// Title first, agenda second, numbered topics in between and a conclusion
/// last. With one slide only the title remains; with two, title and
/// conclusion.
pub fn outline(prompt: &str, slide_count: u32) -> Outline {
    let mut slides = Vec::with_capacity(slide_count as usize);
    if slide_count == 0 {
        return Outline {
            title: prompt.to_string(),
            slides,
        };
    }

    slides.push(descriptor(
        1,
        prompt,
        SlideType::Title,
        &["Professional Presentation"],
        "title_image",
        "Welcome and introduction",
    ));
    if slide_count >= 3 {
        slides.push(descriptor(
            2,
            "Agenda",
            SlideType::Agenda,
            &["Overview", "Main Topics", "Conclusion"],
            "agenda_list",
            "Outline of presentation structure",
        ));
        for n in 3..slide_count {
            slides.push(descriptor(
                n,
                format!("Topic {}", n - 1),
                SlideType::Content,
                &["Key Point 1", "Key Point 2", "Key Point 3"],
                "relevant_image",
                format!("Discuss topic {} in detail", n - 1),
            ));
        }
    }
    if slide_count >= 2 {
        slides.push(descriptor(
            slide_count,
            "Conclusion",
            SlideType::Conclusion,
            &["Summary", "Key Takeaways", "Thank You"],
            "conclusion_image",
            "Summarize and conclude",
        ));
    }

    Outline {
        title: prompt.to_string(),
        slides,
    }
}

/// Slide content taken straight from the descriptor.
pub fn slide_content(descriptor: &SlideDescriptor) -> SlideContent {
    SlideContent {
        title: descriptor.title.clone(),
        bullet_points: descriptor.main_points.clone(),
        speaker_notes: descriptor.speaker_notes.clone(),
        visual_suggestions: vec![VisualSuggestion {
            kind: "image".to_string(),
            description: "Relevant image for this topic".to_string(),
            search_terms: vec![descriptor.title.clone()],
        }],
        citations: Vec::new(),
        additional_notes: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_has_exact_length_for_every_count() {
        for n in 0..=12 {
            let o = outline("Solar", n);
            assert_eq!(o.slides.len(), n as usize, "slide count {}", n);
            for (i, s) in o.slides.iter().enumerate() {
                assert_eq!(s.slide_number, i as u32 + 1);
            }
        }
    }

    #[test]
    fn test_outline_shape() {
        let o = outline("Solar", 5);
        let types: Vec<_> = o.slides.iter().map(|s| s.slide_type).collect();
        assert_eq!(
            types,
            vec![
                SlideType::Title,
                SlideType::Agenda,
                SlideType::Content,
                SlideType::Content,
                SlideType::Conclusion
            ]
        );
        assert_eq!(o.slides[0].title, "Solar");
        assert_eq!(o.slides[2].title, "Topic 2");
        assert_eq!(o.slides[3].speaker_notes, "Discuss topic 3 in detail");
    }

    #[test]
    fn test_short_outlines() {
        let one = outline("Solar", 1);
        assert_eq!(one.slides[0].slide_type, SlideType::Title);

        let two = outline("Solar", 2);
        assert_eq!(two.slides[1].slide_type, SlideType::Conclusion);
        assert_eq!(two.slides[1].slide_number, 2);
    }

    #[test]
    fn test_slide_content_mirrors_descriptor() {
        let o = outline("Solar", 3);
        let c = slide_content(&o.slides[1]);
        assert_eq!(c.title, "Agenda");
        assert_eq!(c.bullet_points.len(), 3);
        assert!(c.citations.is_empty());
        assert_eq!(c.visual_suggestions[0].search_terms, vec!["Agenda"]);
    }
}
