//! Theme settings validation.
//!
//! Collects every violation before failing so a save error can name all
//! offending fields at once. Field names in messages use the serialized
//! (camelCase) spelling, which is what the settings UI shows.

use crate::schema::{ThemeColorSet, ThemeSettings};
use lumen_common::ThemeError;
use regex::Regex;
use std::sync::LazyLock;

/// Hex color: #RGB or #RRGGBB.
pub static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").unwrap());

pub const OPACITY_MIN: f64 = 0.1;
pub const OPACITY_MAX: f64 = 1.0;

/// Run all validations on a settings record, collecting all errors.
pub fn validate(settings: &ThemeSettings) -> Result<(), ThemeError> {
    let mut errors: Vec<String> = Vec::new();

    validate_color_set(&mut errors, "lightTheme", &settings.light_theme);
    validate_color_set(&mut errors, "darkTheme", &settings.dark_theme);
    validate_opacity(&mut errors, "backgroundOpacity", settings.background_opacity);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ThemeError::Validation(errors.join("; ")))
    }
}

/// Validate that a string is a hex color.
pub fn validate_color(s: &str) -> bool {
    HEX_RE.is_match(s.trim())
}

pub(crate) fn validate_color_set(errors: &mut Vec<String>, prefix: &str, set: &ThemeColorSet) {
    validate_hex(errors, &format!("{prefix}.backgroundColor"), &set.background_color);
    validate_hex(errors, &format!("{prefix}.primaryColor"), &set.primary_color);
    validate_hex(errors, &format!("{prefix}.textColor"), &set.text_color);
    validate_hex(errors, &format!("{prefix}.accentColor"), &set.accent_color);
    validate_hex(errors, &format!("{prefix}.userBubbleColor"), &set.user_bubble_color);
    validate_hex(errors, &format!("{prefix}.aiBubbleColor"), &set.ai_bubble_color);
    validate_hex(errors, &format!("{prefix}.userTextColor"), &set.user_text_color);
    validate_hex(errors, &format!("{prefix}.aiTextColor"), &set.ai_text_color);
    validate_opacity(
        errors,
        &format!("{prefix}.userBubbleOpacity"),
        set.user_bubble_opacity,
    );
    validate_opacity(
        errors,
        &format!("{prefix}.aiBubbleOpacity"),
        set.ai_bubble_opacity,
    );
}

pub(crate) fn validate_opacity(errors: &mut Vec<String>, name: &str, value: f64) {
    if !(OPACITY_MIN..=OPACITY_MAX).contains(&value) {
        errors.push(format!(
            "{name} = {value} is out of range [{OPACITY_MIN}, {OPACITY_MAX}]"
        ));
    }
}

fn validate_hex(errors: &mut Vec<String>, name: &str, value: &str) {
    if !HEX_RE.is_match(value) {
        errors.push(format!("{name} = {value:?} is not a hex color"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    #[test]
    fn factory_settings_validate() {
        assert!(validate(&defaults::factory_settings()).is_ok());
    }

    #[test]
    fn accepts_three_digit_hex() {
        let mut settings = defaults::factory_settings();
        settings.light_theme.accent_color = "#fa0".into();
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn catches_malformed_color() {
        let mut settings = defaults::factory_settings();
        settings.light_theme.background_color = "red".into();
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("lightTheme.backgroundColor"));
    }

    #[test]
    fn catches_four_digit_hex() {
        let mut settings = defaults::factory_settings();
        settings.dark_theme.primary_color = "#1234".into();
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("darkTheme.primaryColor"));
    }

    #[test]
    fn catches_background_opacity_too_low() {
        let mut settings = defaults::factory_settings();
        settings.background_opacity = 0.05;
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("backgroundOpacity"));
    }

    #[test]
    fn catches_bubble_opacity_over_one() {
        let mut settings = defaults::factory_settings();
        settings.dark_theme.ai_bubble_opacity = 1.5;
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("darkTheme.aiBubbleOpacity"));
    }

    #[test]
    fn boundary_opacities_are_accepted() {
        let mut settings = defaults::factory_settings();
        settings.background_opacity = 0.1;
        settings.light_theme.user_bubble_opacity = 1.0;
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn collects_multiple_errors() {
        let mut settings = defaults::factory_settings();
        settings.light_theme.text_color = "blue".into();
        settings.dark_theme.user_bubble_opacity = 0.0;
        settings.background_opacity = 2.0;
        let err = validate(&settings).unwrap_err().to_string();
        assert!(err.contains("lightTheme.textColor"));
        assert!(err.contains("darkTheme.userBubbleOpacity"));
        assert!(err.contains("backgroundOpacity"));
    }

    #[test]
    fn validate_color_accepts_only_short_and_long_hex() {
        assert!(validate_color("#abc"));
        assert!(validate_color("#AbCdEf"));
        assert!(!validate_color("abc"));
        assert!(!validate_color("#abcd"));
        assert!(!validate_color("#abcdef00"));
        assert!(!validate_color(""));
    }
}
