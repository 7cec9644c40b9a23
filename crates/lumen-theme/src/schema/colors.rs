//! Per-mode chat color sets.

use serde::{Deserialize, Serialize};

/// One full color set; a theme carries one for light and one for dark.
///
/// Colors are hex strings (`#RGB` or `#RRGGBB`); bubble opacities are
/// 0.1-1.0 floats applied when the bubbles are rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeColorSet {
    pub background_color: String,
    pub primary_color: String,
    pub text_color: String,
    pub accent_color: String,
    pub user_bubble_color: String,
    pub user_bubble_opacity: f64,
    pub ai_bubble_color: String,
    pub ai_bubble_opacity: f64,
    pub user_text_color: String,
    pub ai_text_color: String,
}
