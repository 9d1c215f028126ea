//! API data models
//!
//! Mirrors of the backend serializers. The server is authoritative; these
//! are snapshots from the last successful fetch.

pub mod device;
pub mod mark;
pub mod user;

pub use device::{
    normalize_mac, AnyDevice, Device, DeviceOrder, DeviceOrderField, DeviceQuery, DeviceUpdate,
    NewDevice, UserDevice,
};
pub use mark::{dangling_game_marks, validate_marks, EditableMark, GameMarks, Mark};
pub use user::{PasswordChange, RegisterRequest, User, UserPatch, UserRole};

use serde::{Deserialize, Serialize};

/// Default page size of the backend paginator
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size the backend accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Paginated list envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Page selector for list endpoints (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Query string pairs understood by the paginator
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("page_size", self.page_size.to_string()),
        ]
    }
}

/// Accept a JSON string or number, keep it as a string
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected string or number, got {}", other))),
    }
}
