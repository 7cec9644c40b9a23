//! Settings import/export and shareable links.
//!
//! Export is the full settings record as pretty JSON. Import pre-checks
//! that both color sets are present so the error can name the missing
//! field, then runs full validation; nothing is mutated on rejection.
//! Share links carry a reduced payload (colors + background only) as
//! URL-safe unpadded base64 in a query parameter.

use crate::schema::{BackgroundConfig, ThemeColorSet, ThemeMode, ThemeSettings};
use crate::validation;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use lumen_common::ThemeError;
use serde::{Deserialize, Serialize};

/// Serialize a settings record to a pretty-printed JSON string.
pub fn export_settings(settings: &ThemeSettings) -> String {
    serde_json::to_string_pretty(settings)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize theme settings: {e}\"}}"))
}

/// Parse and validate an exported settings record.
pub fn import_settings(raw: &str) -> Result<ThemeSettings, ThemeError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ThemeError::Validation(format!("malformed theme settings JSON: {e}")))?;

    for field in ["lightTheme", "darkTheme"] {
        if value.get(field).is_none() {
            return Err(ThemeError::Validation(format!(
                "missing required field '{field}'"
            )));
        }
    }

    let settings: ThemeSettings = serde_json::from_value(value)
        .map_err(|e| ThemeError::Validation(format!("malformed theme settings JSON: {e}")))?;
    validation::validate(&settings)?;
    Ok(settings)
}

/// The reduced shape carried in a share link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    pub light_theme: ThemeColorSet,
    pub dark_theme: ThemeColorSet,
    pub background: BackgroundConfig,
}

impl SharePayload {
    pub fn from_settings(settings: &ThemeSettings) -> Self {
        Self {
            light_theme: settings.light_theme.clone(),
            dark_theme: settings.dark_theme.clone(),
            background: settings.background(),
        }
    }

    /// Expand the payload back into a full settings record.
    pub fn into_settings(self, mode: ThemeMode) -> ThemeSettings {
        let mut settings = ThemeSettings {
            mode,
            light_theme: self.light_theme,
            dark_theme: self.dark_theme,
            ..ThemeSettings::default()
        };
        settings.set_background(self.background);
        settings
    }

    fn validate(&self) -> Result<(), ThemeError> {
        let mut errors: Vec<String> = Vec::new();
        validation::validate_color_set(&mut errors, "lightTheme", &self.light_theme);
        validation::validate_color_set(&mut errors, "darkTheme", &self.dark_theme);
        validation::validate_opacity(&mut errors, "background.opacity", self.background.opacity);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ThemeError::Validation(errors.join("; ")))
        }
    }
}

/// Encode a payload for embedding in a URL query parameter.
pub fn encode_share_link(payload: &SharePayload) -> Result<String, ThemeError> {
    let json = serde_json::to_string(payload)
        .map_err(|e| ThemeError::Validation(format!("failed to serialize share payload: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a share-link parameter.
///
/// Malformed input of any kind (bad base64, bad UTF-8, bad JSON, invalid
/// colors) surfaces as a validation error; nothing panics.
pub fn decode_share_link(encoded: &str) -> Result<SharePayload, ThemeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim())
        .map_err(|e| ThemeError::Validation(format!("malformed share link: {e}")))?;
    let json = String::from_utf8(bytes)
        .map_err(|e| ThemeError::Validation(format!("malformed share link: {e}")))?;
    let payload: SharePayload = serde_json::from_str(&json)
        .map_err(|e| ThemeError::Validation(format!("malformed share payload: {e}")))?;
    payload.validate()?;
    Ok(payload)
}
