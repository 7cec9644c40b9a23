//! Tiered settings persistence.
//!
//! Read resolution: authenticated user record → local fallback record →
//! admin-configured default → factory defaults. Every tier failure is
//! logged and swallowed; `load` always produces a valid record. Writes are
//! validated up front and are all-or-nothing.

use crate::backend::{LocalStore, SettingsBackend};
use crate::defaults;
use crate::schema::ThemeSettings;
use crate::validation;
use lumen_common::ThemeError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Settings row holding the authenticated user's theme record.
pub const USER_SETTINGS_KEY: &str = "theme_settings";

/// Settings row holding the admin-configured default tier.
pub const ADMIN_DEFAULT_KEY: &str = "default_theme_settings";

/// Bound on every backend read/write.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a save lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    /// The authenticated user's backend record.
    User,
    /// The local store, for sessions with no backend record.
    LocalFallback,
}

/// Parse and validate a serialized settings record from storage.
///
/// This is the only path by which stored payloads enter the engine; a
/// record that parses but fails validation is rejected here, not deeper in.
pub(crate) fn parse_settings(raw: &str) -> Result<ThemeSettings, ThemeError> {
    let settings: ThemeSettings = serde_json::from_str(raw)
        .map_err(|e| ThemeError::Validation(format!("malformed theme settings payload: {e}")))?;
    validation::validate(&settings)?;
    Ok(settings)
}

pub struct PersistenceResolver {
    backend: Arc<dyn SettingsBackend>,
    local: Arc<dyn LocalStore>,
    timeout: Duration,
}

impl PersistenceResolver {
    pub fn new(backend: Arc<dyn SettingsBackend>, local: Arc<dyn LocalStore>) -> Self {
        Self {
            backend,
            local,
            timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the best-available settings. Never fails.
    pub async fn load(&self) -> ThemeSettings {
        if let Some(settings) = self.load_user_record().await {
            debug!("resolved theme settings from user record");
            return settings;
        }
        self.load_default_settings().await
    }

    /// The user tier only: backend record, else local record. `None` when
    /// neither exists or neither parses.
    pub async fn load_user_record(&self) -> Option<ThemeSettings> {
        match self.fetch_settings_map().await {
            Ok(map) => {
                if let Some(raw) = map.get(USER_SETTINGS_KEY) {
                    match parse_settings(raw) {
                        Ok(settings) => return Some(settings),
                        Err(e) => warn!("stored user theme settings are invalid: {e}"),
                    }
                }
            }
            Err(e) => warn!("settings backend fetch failed: {e}"),
        }

        let raw = self.local.get(USER_SETTINGS_KEY)?;
        match parse_settings(&raw) {
            Ok(settings) => {
                debug!("resolved theme settings from local fallback store");
                Some(settings)
            }
            Err(e) => {
                warn!("local theme settings are invalid: {e}");
                None
            }
        }
    }

    /// The default tiers: admin-configured record, else factory.
    pub async fn load_default_settings(&self) -> ThemeSettings {
        match self.fetch_settings_map().await {
            Ok(map) => {
                if let Some(raw) = map.get(ADMIN_DEFAULT_KEY) {
                    match parse_settings(raw) {
                        Ok(settings) => {
                            debug!("resolved theme settings from admin default");
                            return settings;
                        }
                        Err(e) => warn!("admin default theme settings are invalid: {e}"),
                    }
                } else {
                    debug!("no admin default theme settings configured");
                }
            }
            Err(e) => warn!("settings backend fetch failed: {e}"),
        }
        debug!("using factory default theme settings");
        defaults::factory_settings()
    }

    /// Validate and persist a full settings record.
    ///
    /// All-or-nothing: any invalid field rejects the whole save and nothing
    /// is written.
    pub async fn save(
        &self,
        settings: &ThemeSettings,
        target: SaveTarget,
    ) -> Result<(), ThemeError> {
        validation::validate(settings)?;
        let payload = serialize(settings)?;

        match target {
            SaveTarget::User => {
                self.write_with_timeout(USER_SETTINGS_KEY, &payload).await?;
                info!("saved theme settings to user record");
            }
            SaveTarget::LocalFallback => {
                self.local
                    .set(USER_SETTINGS_KEY, &payload)
                    .map_err(|e| ThemeError::Persistence(e.to_string()))?;
                info!("saved theme settings to local fallback store");
            }
        }
        Ok(())
    }

    /// Write the admin-wide default tier.
    ///
    /// Authorization is the backend's concern; this only affects future
    /// `load` resolution for users without their own record.
    pub async fn set_admin_default(&self, settings: &ThemeSettings) -> Result<(), ThemeError> {
        validation::validate(settings)?;
        let payload = serialize(settings)?;
        self.write_with_timeout(ADMIN_DEFAULT_KEY, &payload).await?;
        info!("saved admin default theme settings");
        Ok(())
    }

    async fn fetch_settings_map(
        &self,
    ) -> Result<HashMap<String, String>, crate::backend::BackendError> {
        match tokio::time::timeout(self.timeout, self.backend.fetch_all_settings()).await {
            Ok(result) => result,
            Err(_) => Err(crate::backend::BackendError::Timeout),
        }
    }

    async fn write_with_timeout(&self, key: &str, payload: &str) -> Result<(), ThemeError> {
        match tokio::time::timeout(self.timeout, self.backend.write_setting(key, payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ThemeError::Persistence(e.to_string())),
            Err(_) => Err(ThemeError::Persistence(format!(
                "write of '{key}' timed out"
            ))),
        }
    }
}

fn serialize(settings: &ThemeSettings) -> Result<String, ThemeError> {
    serde_json::to_string(settings)
        .map_err(|e| ThemeError::Persistence(format!("failed to serialize theme settings: {e}")))
}
