//! HTTP surface over the triage engine, assistant, locator and store.

pub mod error;
pub mod handlers;
pub mod router;
pub mod types;

pub use error::ApiError;
pub use router::build_router;
pub use types::AppState;
