//! Lumen theme engine.
//!
//! Draft/preview theme settings for the chat UI: a committed record with a
//! live preview overlay, an explicit edit session with save/discard/reset,
//! tiered persistence (user record → local fallback → admin default →
//! factory), and synchronous change notification to renderers.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lumen_theme::backend::{MemoryBackend, MemoryStore};
//! use lumen_theme::{ThemeService, ThemeServiceOptions};
//!
//! # async fn run() {
//! let service = ThemeService::create(
//!     Arc::new(MemoryBackend::new()),
//!     Arc::new(MemoryStore::new()),
//!     ThemeServiceOptions::default(),
//! );
//! let snapshot = service.initialize().await;
//! println!("{}", snapshot.mode.as_str());
//! # }
//! ```

pub mod backend;
pub mod bus;
pub mod defaults;
pub mod refresh;
pub mod resolver;
pub mod schema;
pub mod service;
pub mod session;
pub mod share;
pub mod store;
pub mod validation;

// Re-export core types for convenience
pub use backend::{BackendError, LocalStore, SettingsBackend};
pub use bus::{ChangeBus, SubscriberId, ThemeEvent};
pub use resolver::{PersistenceResolver, SaveTarget};
pub use schema::{BackgroundConfig, ThemeColorSet, ThemeMode, ThemeSettings};
pub use service::{ThemeService, ThemeServiceOptions};
pub use session::{DraftSession, SessionState};
pub use store::{ThemeSnapshot, ThemeStore};

pub use lumen_common::ThemeError;
