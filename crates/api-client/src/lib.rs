//! HTTP client for the inkview device content API.
//!
//! One authenticated GET per poll cycle fetches the device's view
//! configuration and content items. Failures are classified into the
//! retry categories the sync scheduler acts on.

mod client;
mod error;
mod types;

pub use client::{ApiClient, ContentSource};
pub use error::{ApiError, FetchClass, Result};
pub use types::{ContentItem, ContentPayload, DateRange, RemoteConfig, ViewType};
