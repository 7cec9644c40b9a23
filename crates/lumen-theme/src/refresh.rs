//! Scheduled re-fetch of the user settings record.
//!
//! Picks up saves made by other sessions/tabs and applies them as external
//! updates. An explicit cancellation token replaces a bare interval loop so
//! teardown is deterministic; the task holds only weak references and also
//! stops on its own if the service is dropped.

use crate::resolver::PersistenceResolver;
use crate::session::DraftSession;
use crate::store::ThemeStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct RefreshHandle {
    token: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl RefreshHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub(crate) fn spawn(
    store: &Arc<ThemeStore>,
    resolver: &Arc<PersistenceResolver>,
    session: &Arc<DraftSession>,
    period: Duration,
) -> RefreshHandle {
    let token = CancellationToken::new();
    let child = token.clone();
    let store = Arc::downgrade(store);
    let resolver = Arc::downgrade(resolver);
    let session = Arc::downgrade(session);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; initialization already
        // loaded current state, so skip it.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = child.cancelled() => {
                    debug!("theme refresh task cancelled");
                    break;
                }
                _ = interval.tick() => {
                    let (Some(store), Some(resolver), Some(session)) =
                        (store.upgrade(), resolver.upgrade(), session.upgrade())
                    else {
                        debug!("theme service dropped, stopping refresh task");
                        break;
                    };
                    if let Some(latest) = resolver.load_user_record().await {
                        if store.apply_external(latest.clone()) {
                            info!("observed external theme settings update");
                            session.rebase(&latest);
                        }
                    }
                }
            }
        }
    });

    RefreshHandle { token, task }
}
