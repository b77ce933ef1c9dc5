//! Themed Markdown deck renderer.

use std::fmt::Write as _;

use crate::capabilities::{CapabilityError, DeckDocument, DocumentRenderCapability};

/// Renders a deck as Markdown: YAML-style front matter with the theme, one
/// section per slide separated by `---`, speaker notes as HTML comments and a
/// References section when the deck has citations.
pub struct MarkdownDeckRenderer;

fn comment_safe(text: &str) -> String {
    text.replace("-->", "--&gt;")
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

impl DocumentRenderCapability for MarkdownDeckRenderer {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, deck: &DeckDocument) -> Result<Vec<u8>, CapabilityError> {
        let render_err = |e: std::fmt::Error| CapabilityError::Render(e.to_string());
        let theme = &deck.theme;
        let mut out = String::new();

        writeln!(out, "---").map_err(render_err)?;
        writeln!(out, "title: {}", quoted(&deck.title)).map_err(render_err)?;
        writeln!(out, "theme: {}", theme.name).map_err(render_err)?;
        writeln!(out, "primary_color: \"{}\"", theme.primary_color).map_err(render_err)?;
        writeln!(out, "secondary_color: \"{}\"", theme.secondary_color).map_err(render_err)?;
        writeln!(out, "accent_color: \"{}\"", theme.accent_color).map_err(render_err)?;
        writeln!(out, "background_color: \"{}\"", theme.background_color).map_err(render_err)?;
        writeln!(out, "text_color: \"{}\"", theme.text_color).map_err(render_err)?;
        writeln!(out, "font: {}", quoted(&theme.font_name)).map_err(render_err)?;
        if let Some(logo) = &theme.logo {
            writeln!(
                out,
                "logo: {{ path: {}, position: {}, size: {} }}",
                quoted(&logo.path),
                logo.position,
                logo.size
            )
            .map_err(render_err)?;
        }
        writeln!(out, "---").map_err(render_err)?;

        for (i, slide) in deck.slides.iter().enumerate() {
            if i > 0 {
                writeln!(out, "\n---").map_err(render_err)?;
            }
            writeln!(
                out,
                "\n<!-- slide {}: {} -->",
                slide.number,
                slide.slide_type.as_str()
            )
            .map_err(render_err)?;
            writeln!(out, "# {}\n", slide.title).map_err(render_err)?;
            for bullet in &slide.bullets {
                writeln!(out, "- {}", bullet).map_err(render_err)?;
            }
            if let Some(image) = &slide.image {
                let target = image.local_path.as_deref().unwrap_or(&image.url);
                writeln!(out, "\n![{}]({})", image.title, target).map_err(render_err)?;
            }
            if !slide.speaker_notes.trim().is_empty() {
                writeln!(
                    out,
                    "\n<!-- notes: {} -->",
                    comment_safe(slide.speaker_notes.trim())
                )
                .map_err(render_err)?;
            }
        }

        if !deck.citations.is_empty() {
            writeln!(out, "\n---\n\n# References\n").map_err(render_err)?;
            for citation in &deck.citations {
                writeln!(
                    out,
                    "{}. {} - {} (accessed {})",
                    citation.number, citation.title, citation.url, citation.accessed_date
                )
                .map_err(render_err)?;
            }
        }

        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::branding::builtin_theme;
    use crate::capabilities::{RenderedCitation, RenderedSlide};
    use crate::model::{ImageDescriptor, SlideType};

    fn deck(citations: Vec<RenderedCitation>) -> DeckDocument {
        DeckDocument {
            title: "Solar \"now\"".to_string(),
            theme: builtin_theme("startup").unwrap(),
            slides: vec![
                RenderedSlide {
                    number: 1,
                    slide_type: SlideType::Title,
                    title: "Solar".to_string(),
                    bullets: vec!["Intro".to_string()],
                    speaker_notes: "Welcome --> everyone".to_string(),
                    image: Some(ImageDescriptor {
                        url: "https://img/sun.png".to_string(),
                        local_path: None,
                        width: 10,
                        height: 10,
                        title: "Sun".to_string(),
                        source: "test".to_string(),
                    }),
                },
                RenderedSlide {
                    number: 2,
                    slide_type: SlideType::Conclusion,
                    title: "End".to_string(),
                    bullets: Vec::new(),
                    speaker_notes: String::new(),
                    image: None,
                },
            ],
            citations,
        }
    }

    #[test]
    fn test_render_front_matter_and_slides() {
        let bytes = MarkdownDeckRenderer.render(&deck(Vec::new())).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("---\ntitle: \"Solar \\\"now\\\"\"\n"));
        assert!(text.contains("primary_color: \"#7c3aed\""));
        assert!(text.contains("<!-- slide 2: conclusion -->"));
        assert!(text.contains("![Sun](https://img/sun.png)"));
        assert!(text.contains("<!-- notes: Welcome --&gt; everyone -->"));
        assert!(!text.contains("# References"));
    }

    #[test]
    fn test_render_references_section() {
        let citations = vec![RenderedCitation {
            number: 1,
            source_type: "web".to_string(),
            title: "Solar energy".to_string(),
            url: "https://w/solar".to_string(),
            accessed_date: "2026-01-02".to_string(),
        }];
        let text = String::from_utf8(MarkdownDeckRenderer.render(&deck(citations)).unwrap()).unwrap();
        assert!(text.contains("# References\n\n1. Solar energy - https://w/solar (accessed 2026-01-02)"));
    }
}
