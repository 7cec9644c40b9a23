#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("a save is already in flight")]
    SaveInProgress,

    #[error("no active settings session")]
    NoActiveSession,
}

impl ThemeError {
    /// Returns `true` for errors the user can fix by correcting input.
    pub fn is_validation(&self) -> bool {
        matches!(self, ThemeError::Validation(_))
    }

    /// Returns `true` for errors worth a retry (backend write/read failures).
    pub fn is_persistence(&self) -> bool {
        matches!(self, ThemeError::Persistence(_))
    }
}
