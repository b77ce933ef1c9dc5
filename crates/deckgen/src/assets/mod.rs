//! Presentation assets: themes, images, translation and narration.

pub mod branding;
pub mod images;
pub mod narration;
pub mod translation;

pub use branding::{BrandingOverrides, Theme};
pub use images::{ImageResolver, ImageSearch, WikimediaImageSearch};
pub use narration::{Narrator, OpenAiSpeech, Voice};
pub use translation::{LibreTranslate, TranslationSummary, Translator};
