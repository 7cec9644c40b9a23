//! Composition root for the theme engine.
//!
//! A `ThemeService` is constructed explicitly with its storage
//! collaborators injected, so tests can run any number of isolated
//! instances side by side. Lifecycle: [`create`] → [`initialize`] →
//! [`dispose`].
//!
//! [`create`]: ThemeService::create
//! [`initialize`]: ThemeService::initialize
//! [`dispose`]: ThemeService::dispose

use crate::backend::{LocalStore, SettingsBackend};
use crate::bus::ChangeBus;
use crate::refresh::{self, RefreshHandle};
use crate::resolver::{PersistenceResolver, DEFAULT_BACKEND_TIMEOUT};
use crate::schema::ThemeSettings;
use crate::session::DraftSession;
use crate::store::{ThemeSnapshot, ThemeStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ThemeServiceOptions {
    /// Bound on every backend read/write.
    pub backend_timeout: Duration,
    /// When set, a background task re-fetches the user record at this
    /// period and applies external saves. `None` disables polling.
    pub refresh_period: Option<Duration>,
}

impl Default for ThemeServiceOptions {
    fn default() -> Self {
        Self {
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            refresh_period: None,
        }
    }
}

pub struct ThemeService {
    options: ThemeServiceOptions,
    bus: Arc<ChangeBus>,
    store: Arc<ThemeStore>,
    resolver: Arc<PersistenceResolver>,
    session: Arc<DraftSession>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl ThemeService {
    pub fn create(
        backend: Arc<dyn SettingsBackend>,
        local: Arc<dyn LocalStore>,
        options: ThemeServiceOptions,
    ) -> Arc<Self> {
        let bus = Arc::new(ChangeBus::new());
        let store = Arc::new(ThemeStore::new(bus.clone()));
        let resolver =
            Arc::new(PersistenceResolver::new(backend, local).with_timeout(options.backend_timeout));
        let session = Arc::new(DraftSession::new(store.clone(), resolver.clone()));
        Arc::new(Self {
            options,
            bus,
            store,
            resolver,
            session,
            refresh: Mutex::new(None),
        })
    }

    /// Load committed state and start the refresh task if configured.
    pub async fn initialize(&self) -> ThemeSnapshot {
        self.initialize_with(None, false).await
    }

    /// `initialize` with pre-fetched settings and/or a forced reload.
    pub async fn initialize_with(
        &self,
        user_settings: Option<ThemeSettings>,
        force_reinit: bool,
    ) -> ThemeSnapshot {
        let snapshot = self
            .store
            .initialize(&self.resolver, user_settings, force_reinit)
            .await;

        if let Some(period) = self.options.refresh_period {
            let mut refresh = self.refresh.lock().unwrap();
            if refresh.is_none() {
                *refresh = Some(refresh::spawn(
                    &self.store,
                    &self.resolver,
                    &self.session,
                    period,
                ));
            }
        }
        snapshot
    }

    /// Route a committed-state change observed outside this session.
    ///
    /// The store moves first so subscribers see the new committed state,
    /// then the draft session re-anchors against it.
    pub fn handle_external_update(&self, settings: ThemeSettings) {
        if self.store.apply_external(settings.clone()) {
            self.session.rebase(&settings);
        }
    }

    /// Tear down: end any settings session, stop the refresh task, and
    /// drop all subscribers.
    pub fn dispose(&self) {
        self.session.exit_settings_mode();
        if let Some(handle) = &*self.refresh.lock().unwrap() {
            handle.cancel();
        }
        self.bus.clear();
    }

    pub fn store(&self) -> &ThemeStore {
        &self.store
    }

    pub fn session(&self) -> &DraftSession {
        &self.session
    }

    pub fn resolver(&self) -> &PersistenceResolver {
        &self.resolver
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    /// `true` once no refresh task is running.
    pub fn refresh_stopped(&self) -> bool {
        match &*self.refresh.lock().unwrap() {
            Some(handle) => handle.is_finished(),
            None => true,
        }
    }

    #[cfg(test)]
    pub(crate) fn take_refresh_handle(&self) -> Option<RefreshHandle> {
        self.refresh.lock().unwrap().take()
    }
}
