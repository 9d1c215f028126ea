//! LAN gate console
//!
//! Typed client for the LAN gate network access control API: session
//! handling, route guards and CRUD stores for users, devices and marks.
//!
//! # Architecture
//!
//! ```text
//! Console ──► SessionStore ──┐
//!    │                       ├──► ApiClient ──► Backend API
//!    ├──► guard()            │    (cookies + CSRF token)
//!    └──► DeviceStore ───────┤
//!         MarkStore ─────────┤
//!         UserStore ─────────┘
//!              │
//!              └── failures ──► Notifier
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod notify;
pub mod session;
pub mod stores;

pub use client::ApiClient;
pub use config::Config;
pub use error::{ApiError, Result};
pub use guard::{guard, ManagementPage, Navigation, Route};
pub use notify::{LogNotifier, Notification, NotificationLevel, NotificationQueue, Notifier};
pub use session::{SessionSnapshot, SessionStore};
pub use stores::{DeviceStore, MarkStore, UserStore};
