//! Themes, branding overrides and palette derivation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names of the builtin themes.
pub const BUILTIN_THEMES: &[&str] = &["corporate", "startup", "academic"];

#[derive(Error, Debug, PartialEq)]
pub enum BrandingError {
    #[error("Invalid color for '{field}': '{value}' (expected #rrggbb)")]
    InvalidColor { field: &'static str, value: String },

    #[error("Unknown theme '{0}'")]
    UnknownTheme(String),
}

/// Logo placement on slides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logo {
    pub path: String,
    pub position: String,
    pub size: String,
}

/// Visual theme applied at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub background_color: String,
    pub text_color: String,
    pub font_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<Logo>,
}

/// Per-presentation overrides on top of a builtin theme.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_size: Option<String>,
}

impl BrandingOverrides {
    /// Checks every color override.
    pub fn validate(&self) -> Result<(), BrandingError> {
        let colors = [
            ("primary_color", &self.primary_color),
            ("secondary_color", &self.secondary_color),
            ("accent_color", &self.accent_color),
            ("background_color", &self.background_color),
            ("text_color", &self.text_color),
        ];
        for (field, value) in colors {
            if let Some(v) = value {
                if !validate_color(v) {
                    return Err(BrandingError::InvalidColor {
                        field,
                        value: v.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Returns the builtin theme with the given name.
pub fn builtin_theme(name: &str) -> Option<Theme> {
    let (primary, secondary, accent, text) = match name {
        "corporate" => ("#1f2937", "#3b82f6", "#10b981", "#1f2937"),
        "startup" => ("#7c3aed", "#f59e0b", "#ef4444", "#374151"),
        "academic" => ("#374151", "#6366f1", "#059669", "#374151"),
        _ => return None,
    };
    Some(Theme {
        name: name.to_string(),
        primary_color: primary.to_string(),
        secondary_color: secondary.to_string(),
        accent_color: accent.to_string(),
        background_color: "#ffffff".to_string(),
        text_color: text.to_string(),
        font_name: "Calibri".to_string(),
        logo: None,
    })
}

/// Builds a theme from a builtin base plus overrides.
pub fn custom_theme(base: &str, overrides: &BrandingOverrides) -> Result<Theme, BrandingError> {
    let mut theme = builtin_theme(base).ok_or_else(|| BrandingError::UnknownTheme(base.into()))?;
    overrides.validate()?;

    let slots = [
        (&mut theme.primary_color, &overrides.primary_color),
        (&mut theme.secondary_color, &overrides.secondary_color),
        (&mut theme.accent_color, &overrides.accent_color),
        (&mut theme.background_color, &overrides.background_color),
        (&mut theme.text_color, &overrides.text_color),
        (&mut theme.font_name, &overrides.font_name),
    ];
    for (slot, value) in slots {
        if let Some(v) = value {
            *slot = v.clone();
        }
    }

    if let Some(ref path) = overrides.logo_path {
        theme.logo = Some(Logo {
            path: path.clone(),
            position: overrides
                .logo_position
                .clone()
                .unwrap_or_else(|| "top_right".to_string()),
            size: overrides
                .logo_size
                .clone()
                .unwrap_or_else(|| "small".to_string()),
        });
    }
    Ok(theme)
}

/// Resolves the theme for a presentation: builtin base plus stored overrides.
///
/// Unknown base names fall back to `corporate`. Undecodable or invalid
/// overrides are logged and ignored.
pub fn resolve_theme(base: &str, branding_json: Option<&str>) -> Theme {
    let base = if builtin_theme(base).is_some() {
        base
    } else {
        tracing::warn!(theme = base, "Unknown theme, using corporate");
        "corporate"
    };
    let overrides = match branding_json.map(serde_json::from_str::<BrandingOverrides>) {
        Some(Ok(o)) => o,
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Ignoring undecodable branding overrides");
            BrandingOverrides::default()
        }
        None => BrandingOverrides::default(),
    };
    custom_theme(base, &overrides).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring invalid branding overrides");
        builtin_theme(base).unwrap_or_else(corporate_fallback)
    })
}

fn corporate_fallback() -> Theme {
    Theme {
        name: "corporate".to_string(),
        primary_color: "#1f2937".to_string(),
        secondary_color: "#3b82f6".to_string(),
        accent_color: "#10b981".to_string(),
        background_color: "#ffffff".to_string(),
        text_color: "#1f2937".to_string(),
        font_name: "Calibri".to_string(),
        logo: None,
    }
}

/// `#rrggbb` with hex digits.
pub fn validate_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Colors derived from a primary color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Palette {
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub background_color: String,
    pub text_color: String,
}

/// Derives a complementary palette from a primary color.
pub fn color_palette(primary: &str) -> Result<Palette, BrandingError> {
    let rgb = hex_to_rgb(primary).ok_or_else(|| BrandingError::InvalidColor {
        field: "primary_color",
        value: primary.to_string(),
    })?;
    Ok(Palette {
        primary_color: primary.to_ascii_lowercase(),
        secondary_color: rgb_to_hex(secondary_color(rgb)),
        accent_color: rgb_to_hex(accent_color(rgb)),
        background_color: "#ffffff".to_string(),
        text_color: text_color(rgb).to_string(),
    })
}

fn hex_to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    if !validate_color(color) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&color[i..i + 2], 16).ok();
    Some((channel(1)?, channel(3)?, channel(5)?))
}

fn rgb_to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Lightens dark colors by 1.5, darkens light ones by 0.7.
fn secondary_color((r, g, b): (u8, u8, u8)) -> (u8, u8, u8) {
    let brightness = (r as f64 + g as f64 + b as f64) / 3.0;
    let factor = if brightness < 128.0 { 1.5 } else { 0.7 };
    let scale = |c: u8| (c as f64 * factor).min(255.0) as u8;
    (scale(r), scale(g), scale(b))
}

/// Complement with saturation reduced to 80% around its mean.
fn accent_color((r, g, b): (u8, u8, u8)) -> (u8, u8, u8) {
    let (cr, cg, cb) = (255.0 - r as f64, 255.0 - g as f64, 255.0 - b as f64);
    let avg = (cr + cg + cb) / 3.0;
    let adjust = |c: f64| (avg + (c - avg) * 0.8).clamp(0.0, 255.0) as u8;
    (adjust(cr), adjust(cg), adjust(cb))
}

fn text_color((r, g, b): (u8, u8, u8)) -> &'static str {
    let luma = r as f64 * 0.299 + g as f64 * 0.587 + b as f64 * 0.114;
    if luma > 128.0 {
        "#1f2937"
    } else {
        "#ffffff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_themes() {
        for name in BUILTIN_THEMES {
            let theme = builtin_theme(name).unwrap();
            assert_eq!(theme.background_color, "#ffffff");
            assert_eq!(theme.font_name, "Calibri");
        }
        assert_eq!(builtin_theme("startup").unwrap().primary_color, "#7c3aed");
        assert!(builtin_theme("neon").is_none());
    }

    #[test]
    fn test_custom_theme_applies_overrides_and_logo_defaults() {
        let overrides = BrandingOverrides {
            primary_color: Some("#112233".to_string()),
            font_name: Some("Inter".to_string()),
            logo_path: Some("/tmp/logo.png".to_string()),
            ..Default::default()
        };
        let theme = custom_theme("academic", &overrides).unwrap();
        assert_eq!(theme.primary_color, "#112233");
        assert_eq!(theme.secondary_color, "#6366f1");
        assert_eq!(theme.font_name, "Inter");
        let logo = theme.logo.unwrap();
        assert_eq!(logo.position, "top_right");
        assert_eq!(logo.size, "small");
    }

    #[test]
    fn test_custom_theme_rejects_bad_color() {
        let overrides = BrandingOverrides {
            accent_color: Some("red".to_string()),
            ..Default::default()
        };
        assert_eq!(
            custom_theme("corporate", &overrides),
            Err(BrandingError::InvalidColor {
                field: "accent_color",
                value: "red".to_string()
            })
        );
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#A1b2C3"));
        assert!(!validate_color("A1b2C3"));
        assert!(!validate_color("#12345"));
        assert!(!validate_color("#12345g"));
    }

    #[test]
    fn test_palette_for_dark_primary() {
        let p = color_palette("#1f2937").unwrap();
        // (31, 41, 55) * 1.5
        assert_eq!(p.secondary_color, "#2e3d52");
        assert_eq!(p.text_color, "#ffffff");
        assert_eq!(p.background_color, "#ffffff");
    }

    #[test]
    fn test_palette_for_light_primary() {
        let p = color_palette("#f0f0f0").unwrap();
        // 240 * 0.7 = 168
        assert_eq!(p.secondary_color, "#a8a8a8");
        assert_eq!(p.text_color, "#1f2937");
        // Complement of a grey stays grey: 255 - 240 = 15.
        assert_eq!(p.accent_color, "#0f0f0f");
    }

    #[test]
    fn test_resolve_theme_ignores_invalid_overrides() {
        let theme = resolve_theme("startup", Some(r##"{"primary_color":"nope"}"##));
        assert_eq!(theme.primary_color, "#7c3aed");
        let theme = resolve_theme("unknown", None);
        assert_eq!(theme.name, "corporate");
        let theme = resolve_theme("corporate", Some(r##"{"text_color":"#000000"}"##));
        assert_eq!(theme.text_color, "#000000");
    }
}
