pub mod errors;
pub mod id;
pub mod types;

pub use errors::ThemeError;
pub use id::{new_correlation_id, new_id, SessionToken};
pub use types::Color;

pub type Result<T> = std::result::Result<T, ThemeError>;
