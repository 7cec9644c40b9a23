//! Committed theme state and the live preview overlay.
//!
//! The store is the single source of truth for what the UI renders: the
//! committed settings merged per-field with any active preview. Preview
//! writes never persist anything; commit writes clear the overlay for the
//! field they commit. All changes fan out through the [`ChangeBus`].

use crate::bus::{ChangeBus, SubscriberId, ThemeEvent};
use crate::defaults;
use crate::resolver::PersistenceResolver;
use crate::schema::{ThemeColorSet, ThemeMode, ThemeSettings};
use crate::validation;
use lumen_common::Color;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Transient per-field overrides layered over the committed settings.
#[derive(Debug, Clone, Default, PartialEq)]
struct PreviewOverlay {
    mode: Option<ThemeMode>,
    light: Option<ThemeColorSet>,
    dark: Option<ThemeColorSet>,
    background_image: Option<Option<String>>,
    background_opacity: Option<f64>,
    auto_dim_in_dark: Option<Option<bool>>,
}

impl PreviewOverlay {
    fn is_empty(&self) -> bool {
        *self == PreviewOverlay::default()
    }

    fn from_settings(settings: &ThemeSettings) -> Self {
        Self {
            mode: Some(settings.mode),
            light: Some(settings.light_theme.clone()),
            dark: Some(settings.dark_theme.clone()),
            background_image: Some(settings.background_image.clone()),
            background_opacity: Some(settings.background_opacity),
            auto_dim_in_dark: Some(settings.auto_dim_in_dark),
        }
    }
}

/// The effective rendered theme: committed state with the preview applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSnapshot {
    pub mode: ThemeMode,
    pub light_theme: ThemeColorSet,
    pub dark_theme: ThemeColorSet,
    pub background_image: Option<String>,
    pub background_opacity: f64,
    pub auto_dim_in_dark: bool,
    pub is_ready: bool,
}

impl ThemeSnapshot {
    /// The color set for the effective mode.
    pub fn active_colors(&self) -> &ThemeColorSet {
        match self.mode {
            ThemeMode::Light => &self.light_theme,
            ThemeMode::Dark => &self.dark_theme,
        }
    }

    /// The effective state as a settings record (drops `is_ready`).
    pub fn settings(&self) -> ThemeSettings {
        ThemeSettings {
            mode: self.mode,
            light_theme: self.light_theme.clone(),
            dark_theme: self.dark_theme.clone(),
            background_image: self.background_image.clone(),
            background_opacity: self.background_opacity,
            auto_dim_in_dark: if self.auto_dim_in_dark { Some(true) } else { None },
        }
    }

    /// Background opacity after the dark-mode auto-dim is applied.
    pub fn effective_background_opacity(&self) -> f64 {
        if self.mode == ThemeMode::Dark && self.auto_dim_in_dark {
            (self.background_opacity * 0.5).max(validation::OPACITY_MIN)
        } else {
            self.background_opacity
        }
    }

    /// CSS custom-property map for the rendered UI.
    ///
    /// Variable names are emitted without the `--` prefix. Bubble colors are
    /// pre-multiplied into `rgba(...)` strings with their configured opacity.
    pub fn css_variable_map(&self) -> HashMap<String, String> {
        fn bubble(hex: &str, opacity: f64) -> String {
            match Color::from_hex(hex) {
                Some(color) => color.css_rgba(opacity),
                None => hex.to_string(),
            }
        }

        let colors = self.active_colors();
        let mut vars = HashMap::with_capacity(11);
        vars.insert("theme-mode".into(), self.mode.as_str().into());
        vars.insert("background-color".into(), colors.background_color.clone());
        vars.insert("primary-color".into(), colors.primary_color.clone());
        vars.insert("text-color".into(), colors.text_color.clone());
        vars.insert("accent-color".into(), colors.accent_color.clone());
        vars.insert(
            "user-bubble-color".into(),
            bubble(&colors.user_bubble_color, colors.user_bubble_opacity),
        );
        vars.insert(
            "ai-bubble-color".into(),
            bubble(&colors.ai_bubble_color, colors.ai_bubble_opacity),
        );
        vars.insert("user-text-color".into(), colors.user_text_color.clone());
        vars.insert("ai-text-color".into(), colors.ai_text_color.clone());
        vars.insert(
            "chat-background-image".into(),
            match &self.background_image {
                Some(url) => format!("url({url})"),
                None => "none".into(),
            },
        );
        vars.insert(
            "chat-background-opacity".into(),
            format!("{}", self.effective_background_opacity()),
        );
        vars
    }
}

struct StoreInner {
    committed: ThemeSettings,
    preview: PreviewOverlay,
    is_ready: bool,
}

pub struct ThemeStore {
    inner: RwLock<StoreInner>,
    bus: Arc<ChangeBus>,
    // Collapses concurrent initialize() calls into one load.
    init_guard: tokio::sync::Mutex<()>,
}

impl ThemeStore {
    pub fn new(bus: Arc<ChangeBus>) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                committed: defaults::factory_settings(),
                preview: PreviewOverlay::default(),
                is_ready: false,
            }),
            bus,
            init_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// The committed settings (ignores any preview).
    pub fn committed(&self) -> ThemeSettings {
        self.inner.read().unwrap().committed.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.read().unwrap().is_ready
    }

    pub fn has_active_preview(&self) -> bool {
        !self.inner.read().unwrap().preview.is_empty()
    }

    /// The effective state: committed merged per-field with the preview.
    pub fn state(&self) -> ThemeSnapshot {
        let inner = self.inner.read().unwrap();
        let committed = &inner.committed;
        let preview = &inner.preview;
        ThemeSnapshot {
            mode: preview.mode.unwrap_or(committed.mode),
            light_theme: preview
                .light
                .clone()
                .unwrap_or_else(|| committed.light_theme.clone()),
            dark_theme: preview
                .dark
                .clone()
                .unwrap_or_else(|| committed.dark_theme.clone()),
            background_image: preview
                .background_image
                .clone()
                .unwrap_or_else(|| committed.background_image.clone()),
            background_opacity: preview
                .background_opacity
                .unwrap_or(committed.background_opacity),
            auto_dim_in_dark: preview
                .auto_dim_in_dark
                .unwrap_or(committed.auto_dim_in_dark)
                .unwrap_or(false),
            is_ready: inner.is_ready,
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&ThemeEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn bus(&self) -> &Arc<ChangeBus> {
        &self.bus
    }

    // ---- preview (never persisted) ----

    /// Preview a color set for a mode; the display switches to that mode.
    pub fn preview_theme(&self, colors: ThemeColorSet, mode: ThemeMode) {
        let changed = {
            let mut inner = self.inner.write().unwrap();
            let before = inner.preview.clone();
            match mode {
                ThemeMode::Light => inner.preview.light = Some(colors),
                ThemeMode::Dark => inner.preview.dark = Some(colors),
            }
            inner.preview.mode = Some(mode);
            inner.preview != before
        };
        if changed {
            self.bus.publish(&ThemeEvent::PreviewChanged);
        }
    }

    /// Preview the background layer.
    pub fn preview_background(&self, image: Option<String>, opacity: f64) {
        let changed = {
            let mut inner = self.inner.write().unwrap();
            let before = inner.preview.clone();
            inner.preview.background_image = Some(image);
            inner.preview.background_opacity = Some(opacity);
            inner.preview != before
        };
        if changed {
            self.bus.publish(&ThemeEvent::PreviewChanged);
        }
    }

    /// Preview a full settings record at once (draft restore paths).
    pub fn preview_settings(&self, settings: &ThemeSettings) {
        let changed = {
            let mut inner = self.inner.write().unwrap();
            let next = PreviewOverlay::from_settings(settings);
            let changed = inner.preview != next;
            inner.preview = next;
            changed
        };
        if changed {
            self.bus.publish(&ThemeEvent::PreviewChanged);
        }
    }

    /// Drop the entire preview overlay; committed state shows through.
    pub fn clear_preview(&self) {
        let had_preview = {
            let mut inner = self.inner.write().unwrap();
            let had = !inner.preview.is_empty();
            inner.preview = PreviewOverlay::default();
            had
        };
        if had_preview {
            self.bus.publish(&ThemeEvent::PreviewCleared);
        }
    }

    // ---- commit (invoked after a successful persist) ----

    pub fn set_mode(&self, mode: ThemeMode) {
        {
            let mut inner = self.inner.write().unwrap();
            inner.committed.mode = mode;
            inner.preview.mode = None;
        }
        self.bus.publish(&ThemeEvent::CommittedChanged);
    }

    pub fn set_light_theme(&self, colors: ThemeColorSet) {
        {
            let mut inner = self.inner.write().unwrap();
            inner.committed.light_theme = colors;
            inner.preview.light = None;
        }
        self.bus.publish(&ThemeEvent::CommittedChanged);
    }

    pub fn set_dark_theme(&self, colors: ThemeColorSet) {
        {
            let mut inner = self.inner.write().unwrap();
            inner.committed.dark_theme = colors;
            inner.preview.dark = None;
        }
        self.bus.publish(&ThemeEvent::CommittedChanged);
    }

    pub fn set_background_image(&self, image: Option<String>) {
        {
            let mut inner = self.inner.write().unwrap();
            inner.committed.background_image = image;
            inner.preview.background_image = None;
        }
        self.bus.publish(&ThemeEvent::CommittedChanged);
    }

    pub fn set_background_opacity(&self, opacity: f64) {
        {
            let mut inner = self.inner.write().unwrap();
            inner.committed.background_opacity = opacity;
            inner.preview.background_opacity = None;
        }
        self.bus.publish(&ThemeEvent::CommittedChanged);
    }

    /// Replace the committed record wholesale and drop the preview.
    pub fn set_committed(&self, settings: ThemeSettings) {
        {
            let mut inner = self.inner.write().unwrap();
            inner.committed = settings;
            inner.preview = PreviewOverlay::default();
        }
        self.bus.publish(&ThemeEvent::CommittedChanged);
    }

    /// Apply a committed-state change observed from another session.
    ///
    /// The preview overlay is left untouched: an in-progress draft keeps its
    /// visual state and reconciles at save time. Returns `true` if the
    /// committed record actually changed.
    pub fn apply_external(&self, settings: ThemeSettings) -> bool {
        let changed = {
            let mut inner = self.inner.write().unwrap();
            if inner.committed == settings {
                false
            } else {
                inner.committed = settings;
                true
            }
        };
        if changed {
            self.bus.publish(&ThemeEvent::ExternalUpdate);
        }
        changed
    }

    /// Load committed state and mark the store ready.
    ///
    /// Idempotent unless `force_reinit`; concurrent calls collapse into a
    /// single load. Never fails: if nothing loads, factory defaults apply
    /// and the store still becomes ready.
    pub async fn initialize(
        &self,
        resolver: &PersistenceResolver,
        user_settings: Option<ThemeSettings>,
        force_reinit: bool,
    ) -> ThemeSnapshot {
        let _guard = self.init_guard.lock().await;

        if self.is_ready() && !force_reinit {
            debug!("theme store already initialized");
            return self.state();
        }

        let settings = match user_settings {
            Some(settings) => match validation::validate(&settings) {
                Ok(()) => settings,
                Err(e) => {
                    warn!("provided theme settings are invalid: {e}, resolving from storage");
                    resolver.load().await
                }
            },
            None => resolver.load().await,
        };

        {
            let mut inner = self.inner.write().unwrap();
            inner.committed = settings;
            inner.preview = PreviewOverlay::default();
            inner.is_ready = true;
        }
        self.bus.publish(&ThemeEvent::Initialized);
        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MemoryStore, SettingsBackend};
    use crate::resolver::{PersistenceResolver, USER_SETTINGS_KEY};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> ThemeStore {
        ThemeStore::new(Arc::new(ChangeBus::new()))
    }

    fn resolver_with(backend: Arc<MemoryBackend>) -> PersistenceResolver {
        PersistenceResolver::new(backend, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn state_defaults_to_factory_and_not_ready() {
        let store = store();
        let snapshot = store.state();
        assert!(!snapshot.is_ready);
        assert_eq!(snapshot.settings(), defaults::factory_settings());
    }

    #[test]
    fn preview_overlays_without_touching_committed() {
        let store = store();
        let mut colors = defaults::factory_light();
        colors.background_color = "#123456".into();

        store.preview_theme(colors.clone(), ThemeMode::Light);

        assert_eq!(store.state().light_theme, colors);
        assert_eq!(store.committed(), defaults::factory_settings());
        assert!(store.has_active_preview());
    }

    #[test]
    fn preview_theme_switches_displayed_mode() {
        let store = store();
        store.preview_theme(defaults::factory_dark(), ThemeMode::Dark);
        assert_eq!(store.state().mode, ThemeMode::Dark);
        assert_eq!(store.committed().mode, ThemeMode::Light);
    }

    #[test]
    fn preview_is_idempotent() {
        let store = store();
        let events = Arc::new(AtomicUsize::new(0));
        let e = events.clone();
        store.subscribe(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });

        store.preview_background(Some("https://x/bg.png".into()), 0.5);
        let first = store.state();
        store.preview_background(Some("https://x/bg.png".into()), 0.5);

        assert_eq!(store.state(), first);
        // Second identical preview publishes nothing.
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_preview_restores_committed_view() {
        let store = store();
        store.preview_background(Some("https://x/bg.png".into()), 0.3);
        store.clear_preview();
        let snapshot = store.state();
        assert_eq!(snapshot.background_image, None);
        assert!((snapshot.background_opacity - 1.0).abs() < f64::EPSILON);
        assert!(!store.has_active_preview());
    }

    #[test]
    fn commit_clears_only_that_fields_preview() {
        let store = store();
        store.preview_background(Some("https://x/bg.png".into()), 0.3);
        store.preview_theme(defaults::factory_dark(), ThemeMode::Dark);

        store.set_background_image(Some("https://x/committed.png".into()));
        store.set_background_opacity(0.8);

        let snapshot = store.state();
        assert_eq!(
            snapshot.background_image.as_deref(),
            Some("https://x/committed.png")
        );
        assert!((snapshot.background_opacity - 0.8).abs() < f64::EPSILON);
        // The unrelated mode/color preview is still live.
        assert_eq!(snapshot.mode, ThemeMode::Dark);
    }

    #[test]
    fn set_committed_drops_whole_preview() {
        let store = store();
        store.preview_theme(defaults::factory_dark(), ThemeMode::Dark);

        let mut settings = defaults::factory_settings();
        settings.mode = ThemeMode::Dark;
        store.set_committed(settings.clone());

        assert!(!store.has_active_preview());
        assert_eq!(store.committed(), settings);
        assert_eq!(store.state().settings(), settings);
    }

    #[test]
    fn apply_external_keeps_preview() {
        let store = store();
        store.preview_background(Some("https://x/draft.png".into()), 0.2);

        let mut external = defaults::factory_settings();
        external.background_opacity = 0.9;
        assert!(store.apply_external(external.clone()));

        // Committed moved; the draft preview still wins the merge.
        assert_eq!(store.committed(), external);
        let snapshot = store.state();
        assert_eq!(snapshot.background_image.as_deref(), Some("https://x/draft.png"));
        assert!((snapshot.background_opacity - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn apply_external_with_identical_settings_is_a_no_op() {
        let store = store();
        let events = Arc::new(AtomicUsize::new(0));
        let e = events.clone();
        store.subscribe(move |event| {
            if *event == ThemeEvent::ExternalUpdate {
                e.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert!(!store.apply_external(store.committed()));
        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn initialize_loads_user_record() {
        let backend = Arc::new(MemoryBackend::new());
        let mut saved = defaults::factory_settings();
        saved.mode = ThemeMode::Dark;
        backend.insert(USER_SETTINGS_KEY, &serde_json::to_string(&saved).unwrap());

        let store = store();
        let snapshot = store
            .initialize(&resolver_with(backend), None, false)
            .await;
        assert!(snapshot.is_ready);
        assert_eq!(snapshot.mode, ThemeMode::Dark);
    }

    #[tokio::test]
    async fn initialize_failure_falls_back_to_factory_but_marks_ready() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_reads(true);

        let store = store();
        let snapshot = store
            .initialize(&resolver_with(backend), None, false)
            .await;
        assert!(snapshot.is_ready);
        assert_eq!(snapshot.settings(), defaults::factory_settings());
    }

    #[tokio::test]
    async fn initialize_is_idempotent_without_force() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store();
        let resolver = resolver_with(backend.clone());

        store.initialize(&resolver, None, false).await;

        let mut saved = defaults::factory_settings();
        saved.mode = ThemeMode::Dark;
        backend.insert(USER_SETTINGS_KEY, &serde_json::to_string(&saved).unwrap());

        // Without force, nothing reloads.
        let snapshot = store.initialize(&resolver, None, false).await;
        assert_eq!(snapshot.mode, ThemeMode::Light);

        // With force, the new record lands.
        let snapshot = store.initialize(&resolver, None, true).await;
        assert_eq!(snapshot.mode, ThemeMode::Dark);
    }

    #[tokio::test]
    async fn initialize_rejects_invalid_provided_settings() {
        let backend = Arc::new(MemoryBackend::new());
        let store = store();

        let mut invalid = defaults::factory_settings();
        invalid.light_theme.background_color = "nope".into();

        let snapshot = store
            .initialize(&resolver_with(backend), Some(invalid), false)
            .await;
        assert!(snapshot.is_ready);
        assert_eq!(snapshot.settings(), defaults::factory_settings());
    }

    #[tokio::test]
    async fn concurrent_initialize_collapses_into_one_load() {
        struct CountingBackend {
            fetches: AtomicUsize,
        }

        #[async_trait::async_trait]
        impl SettingsBackend for CountingBackend {
            async fn fetch_all_settings(
                &self,
            ) -> Result<std::collections::HashMap<String, String>, crate::backend::BackendError>
            {
                self.fetches.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(std::collections::HashMap::new())
            }

            async fn write_setting(
                &self,
                _key: &str,
                _value: &str,
            ) -> Result<(), crate::backend::BackendError> {
                Ok(())
            }
        }

        let backend = Arc::new(CountingBackend {
            fetches: AtomicUsize::new(0),
        });
        let resolver = Arc::new(PersistenceResolver::new(
            backend.clone(),
            Arc::new(MemoryStore::new()),
        ));
        let store = Arc::new(store());

        let (a, b) = tokio::join!(
            {
                let store = store.clone();
                let resolver = resolver.clone();
                async move { store.initialize(&resolver, None, false).await }
            },
            {
                let store = store.clone();
                let resolver = resolver.clone();
                async move { store.initialize(&resolver, None, false).await }
            }
        );

        assert!(a.is_ready && b.is_ready);
        assert_eq!(a.settings(), b.settings());
        // load() probes the user tier then the admin tier: two fetches for
        // the single winning initialize, none for the collapsed one.
        assert!(backend.fetches.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn css_variable_map_reflects_active_mode() {
        let store = store();
        let vars = store.state().css_variable_map();
        assert_eq!(vars.get("theme-mode").map(String::as_str), Some("light"));
        assert_eq!(
            vars.get("background-color").map(String::as_str),
            Some("#ffffff")
        );
        assert_eq!(
            vars.get("user-bubble-color").map(String::as_str),
            Some("rgba(59,130,246,1)")
        );
        assert_eq!(
            vars.get("chat-background-image").map(String::as_str),
            Some("none")
        );
    }

    #[test]
    fn css_variable_map_applies_auto_dim_in_dark() {
        let store = store();
        let mut settings = defaults::factory_settings();
        settings.mode = ThemeMode::Dark;
        settings.background_image = Some("https://x/bg.png".into());
        settings.background_opacity = 0.8;
        settings.auto_dim_in_dark = Some(true);
        store.set_committed(settings);

        let vars = store.state().css_variable_map();
        assert_eq!(
            vars.get("chat-background-image").map(String::as_str),
            Some("url(https://x/bg.png)")
        );
        assert_eq!(
            vars.get("chat-background-opacity").map(String::as_str),
            Some("0.4")
        );
    }

    #[test]
    fn auto_dim_never_dims_below_minimum_opacity() {
        let snapshot = ThemeSnapshot {
            mode: ThemeMode::Dark,
            light_theme: defaults::factory_light(),
            dark_theme: defaults::factory_dark(),
            background_image: Some("https://x/bg.png".into()),
            background_opacity: 0.1,
            auto_dim_in_dark: true,
            is_ready: true,
        };
        assert!((snapshot.effective_background_opacity() - 0.1).abs() < f64::EPSILON);
    }
}
