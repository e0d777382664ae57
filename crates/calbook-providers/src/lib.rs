//! Calendar backends for calbook.
//!
//! - [`CalendarProvider`]: the trait the calendar glue talks to
//! - [`EventQuery`]: listing options (time bounds, limits, ordering)
//! - [`ProviderError`]: error taxonomy shared by all backends
//! - [`MemoryProvider`]: in-memory backend used by tests
//! - [`google`]: Google Calendar v3 backend (feature `google`)

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::MemoryProvider;
pub use provider::{BoxFuture, CalendarProvider, EventQuery};
