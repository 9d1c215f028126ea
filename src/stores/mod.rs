//! Resource stores
//!
//! Thin CRUD wrappers over the backend. Every mutation refreshes the CSRF
//! token, issues one call, and on failure pushes a notification. Nothing is
//! cached: callers refetch after a change.

pub mod devices;
pub mod marks;
pub mod users;

pub use devices::DeviceStore;
pub use marks::MarkStore;
pub use users::UserStore;

use crate::error::Result;
use crate::notify::{Notification, Notifier};
use tracing::warn;

/// Collapse a result into an option, reporting the error
pub(crate) fn report<T>(notifier: &dyn Notifier, action: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{} failed: {}", action, e);
            notifier.notify(Notification::error(e.user_message()));
            None
        }
    }
}
