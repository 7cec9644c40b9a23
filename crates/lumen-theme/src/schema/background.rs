//! Chat background configuration.

use serde::{Deserialize, Serialize};

/// Background image layer settings.
///
/// `image` is a URL (or `None` for no image); `opacity` is 0.1-1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundConfig {
    pub image: Option<String>,
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_dim_in_dark: Option<bool>,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            image: None,
            opacity: 1.0,
            auto_dim_in_dark: None,
        }
    }
}
