//! Draft settings session.
//!
//! While settings mode is active the user edits a full copy of the
//! committed record. Every edit is pushed to the store as a preview so the
//! UI reflects it immediately; nothing persists until `save_changes`.
//! Dirty tracking is structural comparison of the draft against the
//! committed baseline, so toggling a field back to its committed value
//! clears dirtiness on its own.

use crate::resolver::{PersistenceResolver, SaveTarget};
use crate::schema::{ThemeColorSet, ThemeMode, ThemeSettings};
use crate::store::ThemeStore;
use lumen_common::{SessionToken, ThemeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    ActiveClean,
    ActiveDirty,
}

#[derive(Default)]
struct SessionInner {
    /// In-progress edits; `Some` iff settings mode is active.
    draft: Option<ThemeSettings>,
    /// Committed snapshot the draft is compared against. Rebased when an
    /// external update lands mid-session.
    baseline: Option<ThemeSettings>,
    token: Option<SessionToken>,
}

pub struct DraftSession {
    store: Arc<ThemeStore>,
    resolver: Arc<PersistenceResolver>,
    inner: Mutex<SessionInner>,
    save_in_flight: AtomicBool,
}

impl DraftSession {
    pub fn new(store: Arc<ThemeStore>, resolver: Arc<PersistenceResolver>) -> Self {
        Self {
            store,
            resolver,
            inner: Mutex::new(SessionInner::default()),
            save_in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        let inner = self.inner.lock().unwrap();
        match (&inner.draft, &inner.baseline) {
            (Some(draft), Some(baseline)) if draft == baseline => SessionState::ActiveClean,
            (Some(_), Some(_)) => SessionState::ActiveDirty,
            _ => SessionState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().unwrap().draft.is_some()
    }

    pub fn has_changes(&self) -> bool {
        self.state() == SessionState::ActiveDirty
    }

    pub fn draft(&self) -> Option<ThemeSettings> {
        self.inner.lock().unwrap().draft.clone()
    }

    /// Snapshot the committed record and open a draft over it.
    pub fn enter_settings_mode(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.draft.is_some() {
            warn!("settings mode already active, ignoring re-entry");
            return;
        }
        let committed = self.store.committed();
        inner.draft = Some(committed.clone());
        inner.baseline = Some(committed);
        inner.token = Some(SessionToken::new());
        debug!("entered settings mode");
    }

    /// Destroy the draft without saving and drop the preview.
    pub fn exit_settings_mode(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.draft.is_none() {
                return;
            }
            inner.draft = None;
            inner.baseline = None;
            inner.token = None;
        }
        self.store.clear_preview();
        debug!("exited settings mode");
    }

    // ---- draft mutation ----

    pub fn update_draft_mode(&self, mode: ThemeMode) -> Result<(), ThemeError> {
        let colors = {
            let mut inner = self.inner.lock().unwrap();
            let draft = inner.draft.as_mut().ok_or(ThemeError::NoActiveSession)?;
            draft.mode = mode;
            draft.colors_for(mode).clone()
        };
        self.store.preview_theme(colors, mode);
        Ok(())
    }

    pub fn update_draft_light_theme(&self, colors: ThemeColorSet) -> Result<(), ThemeError> {
        {
            let mut inner = self.inner.lock().unwrap();
            let draft = inner.draft.as_mut().ok_or(ThemeError::NoActiveSession)?;
            draft.light_theme = colors.clone();
        }
        self.store.preview_theme(colors, ThemeMode::Light);
        Ok(())
    }

    pub fn update_draft_dark_theme(&self, colors: ThemeColorSet) -> Result<(), ThemeError> {
        {
            let mut inner = self.inner.lock().unwrap();
            let draft = inner.draft.as_mut().ok_or(ThemeError::NoActiveSession)?;
            draft.dark_theme = colors.clone();
        }
        self.store.preview_theme(colors, ThemeMode::Dark);
        Ok(())
    }

    pub fn update_draft_background_image(&self, image: Option<String>) -> Result<(), ThemeError> {
        let opacity = {
            let mut inner = self.inner.lock().unwrap();
            let draft = inner.draft.as_mut().ok_or(ThemeError::NoActiveSession)?;
            draft.background_image = image.clone();
            draft.background_opacity
        };
        self.store.preview_background(image, opacity);
        Ok(())
    }

    pub fn update_draft_background_opacity(&self, opacity: f64) -> Result<(), ThemeError> {
        let image = {
            let mut inner = self.inner.lock().unwrap();
            let draft = inner.draft.as_mut().ok_or(ThemeError::NoActiveSession)?;
            draft.background_opacity = opacity;
            draft.background_image.clone()
        };
        self.store.preview_background(image, opacity);
        Ok(())
    }

    // ---- session actions ----

    /// Persist the draft and promote it to committed state.
    ///
    /// A clean session is a no-op. A save already in flight rejects the
    /// second call rather than interleaving writes. On failure the draft is
    /// untouched and the session stays dirty so the user can retry.
    pub async fn save_changes(&self, target: SaveTarget) -> Result<(), ThemeError> {
        if self.save_in_flight.swap(true, Ordering::SeqCst) {
            return Err(ThemeError::SaveInProgress);
        }
        let result = self.save_inner(target).await;
        self.save_in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn save_inner(&self, target: SaveTarget) -> Result<(), ThemeError> {
        let (draft, token) = {
            let inner = self.inner.lock().unwrap();
            let draft = inner
                .draft
                .clone()
                .ok_or(ThemeError::NoActiveSession)?;
            if inner.baseline.as_ref() == Some(&draft) {
                debug!("no changes to save");
                return Ok(());
            }
            (draft, inner.token.clone())
        };

        self.resolver.save(&draft, target).await?;

        // The session may have exited (or restarted) while the write was in
        // flight; a stale result must not touch committed state.
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.token != token {
                warn!("discarding save result from a stale settings session");
                return Ok(());
            }
            inner.baseline = Some(draft.clone());
        }
        self.store.set_committed(draft);
        Ok(())
    }

    /// Throw away draft edits; the live UI snaps back to committed state.
    pub fn discard_changes(&self) -> Result<(), ThemeError> {
        {
            let mut inner = self.inner.lock().unwrap();
            let baseline = inner
                .baseline
                .clone()
                .ok_or(ThemeError::NoActiveSession)?;
            inner.draft = Some(baseline);
        }
        self.store.clear_preview();
        debug!("discarded draft changes");
        Ok(())
    }

    /// Replace the draft with the admin default (else factory) settings.
    ///
    /// Dirtiness is still computed against the committed baseline, so a
    /// reset that happens to equal it reports no changes.
    pub async fn reset_to_defaults(&self) -> Result<(), ThemeError> {
        let token = {
            let inner = self.inner.lock().unwrap();
            if inner.draft.is_none() {
                return Err(ThemeError::NoActiveSession);
            }
            inner.token.clone()
        };

        let settings = self.resolver.load_default_settings().await;

        {
            let mut inner = self.inner.lock().unwrap();
            if inner.token != token || inner.draft.is_none() {
                warn!("settings session ended during reset, dropping defaults");
                return Err(ThemeError::NoActiveSession);
            }
            inner.draft = Some(settings.clone());
        }
        self.store.preview_settings(&settings);
        debug!("reset draft to default settings");
        Ok(())
    }

    /// Re-anchor the session after an externally observed committed change.
    ///
    /// Clean sessions re-snapshot transparently; dirty sessions keep the
    /// draft and only move the baseline (the draft wins at save time).
    pub fn rebase(&self, new_committed: &ThemeSettings) {
        let mut inner = self.inner.lock().unwrap();
        if inner.draft.is_none() || inner.baseline.is_none() {
            return;
        }
        if inner.draft == inner.baseline {
            inner.draft = Some(new_committed.clone());
            inner.baseline = Some(new_committed.clone());
            debug!("re-snapshotted clean settings session after external update");
        } else {
            inner.baseline = Some(new_committed.clone());
            debug!("rebased dirty settings session after external update");
        }
    }
}
