//! Calendar service access.
//!
//! - [`CalendarProvider`]: the operations the CLI performs against a calendar
//! - [`ProviderError`]: error type shared by all providers
//! - [`google`]: Google Calendar implementation (feature `google`)
//! - `MemoryProvider`: in-process implementation for tests (feature `test-util`)

pub mod error;
#[cfg(feature = "google")]
pub mod google;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod provider;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryProvider;
pub use provider::{BoxFuture, CalendarProvider, CreatedEvent, EventPage, ListedEvent};
