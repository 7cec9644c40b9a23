//! Theme settings schema types.
//!
//! All persisted field names are camelCase to match the stored JSON record
//! shape. `ThemeSettings` derives `PartialEq`; dirty tracking in the draft
//! session is structural comparison against the committed snapshot.

mod background;
mod colors;
mod mode;

pub use background::*;
pub use colors::*;
pub use mode::*;

use serde::{Deserialize, Serialize};

/// The persisted unit: everything a theme save writes as a single record.
///
/// Both color sets are always present even though only one is active at a
/// time. Must round-trip losslessly through JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    pub mode: ThemeMode,
    pub light_theme: ThemeColorSet,
    pub dark_theme: ThemeColorSet,
    pub background_image: Option<String>,
    pub background_opacity: f64,
    /// Dim the background image while in dark mode. Omitted from the
    /// serialized record when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_dim_in_dark: Option<bool>,
}

impl ThemeSettings {
    /// The color set for the given mode.
    pub fn colors_for(&self, mode: ThemeMode) -> &ThemeColorSet {
        match mode {
            ThemeMode::Light => &self.light_theme,
            ThemeMode::Dark => &self.dark_theme,
        }
    }

    /// The color set for the currently selected mode.
    pub fn active_colors(&self) -> &ThemeColorSet {
        self.colors_for(self.mode)
    }

    /// The background fields grouped as a [`BackgroundConfig`].
    pub fn background(&self) -> BackgroundConfig {
        BackgroundConfig {
            image: self.background_image.clone(),
            opacity: self.background_opacity,
            auto_dim_in_dark: self.auto_dim_in_dark,
        }
    }

    pub fn set_background(&mut self, background: BackgroundConfig) {
        self.background_image = background.image;
        self.background_opacity = background.opacity;
        self.auto_dim_in_dark = background.auto_dim_in_dark;
    }
}

impl Default for ThemeSettings {
    fn default() -> Self {
        crate::defaults::factory_settings()
    }
}
