//! Factory default theme tier.
//!
//! The last-resort fallback when neither a user record nor an admin default
//! resolves. These palettes must always pass validation.

use crate::schema::{ThemeColorSet, ThemeMode, ThemeSettings};

pub fn factory_light() -> ThemeColorSet {
    ThemeColorSet {
        background_color: "#ffffff".into(),
        primary_color: "#3b82f6".into(),
        text_color: "#1f2937".into(),
        accent_color: "#6366f1".into(),
        user_bubble_color: "#3b82f6".into(),
        user_bubble_opacity: 1.0,
        ai_bubble_color: "#f3f4f6".into(),
        ai_bubble_opacity: 1.0,
        user_text_color: "#ffffff".into(),
        ai_text_color: "#111827".into(),
    }
}

pub fn factory_dark() -> ThemeColorSet {
    ThemeColorSet {
        background_color: "#111827".into(),
        primary_color: "#60a5fa".into(),
        text_color: "#f9fafb".into(),
        accent_color: "#818cf8".into(),
        user_bubble_color: "#2563eb".into(),
        user_bubble_opacity: 1.0,
        ai_bubble_color: "#1f2937".into(),
        ai_bubble_opacity: 0.9,
        user_text_color: "#f9fafb".into(),
        ai_text_color: "#e5e7eb".into(),
    }
}

pub fn factory_settings() -> ThemeSettings {
    ThemeSettings {
        mode: ThemeMode::Light,
        light_theme: factory_light(),
        dark_theme: factory_dark(),
        background_image: None,
        background_opacity: 1.0,
        auto_dim_in_dark: None,
    }
}
