//! User accounts

use super::device::UserDevice;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Player,
    Manager,
    Guest,
    Staff,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Manager => "manager",
            Self::Guest => "guest",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    /// Allowed into the management pages
    pub fn is_staff_like(&self) -> bool {
        matches!(self, Self::Staff | Self::Admin)
    }

    /// Role of a backend that only exposes the Django permission flags
    pub fn from_flags(is_staff: bool, is_superuser: bool) -> Self {
        if is_superuser {
            Self::Admin
        } else if is_staff {
            Self::Staff
        } else {
            Self::default()
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Player
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "player" => Ok(Self::Player),
            "manager" => Ok(Self::Manager),
            "guest" => Ok(Self::Guest),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

fn default_active() -> bool {
    true
}

/// User as returned by `/user/me/` and `/user/users/`.
///
/// Backends without a `role` field get one from `is_staff` and
/// `is_superuser`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "UserRecord")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub is_active: bool,
    /// How many devices the user may register
    pub max_device_nb: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<UserDevice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_joined: Option<DateTime<Utc>>,
}

/// Wire form of [`User`]
#[derive(Deserialize)]
struct UserRecord {
    id: i64,
    username: String,
    #[serde(default)]
    role: Option<UserRole>,
    #[serde(default)]
    is_staff: bool,
    #[serde(default)]
    is_superuser: bool,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    max_device_nb: u32,
    #[serde(default)]
    tournament: Option<String>,
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    devices: Vec<UserDevice>,
    #[serde(default)]
    last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    date_joined: Option<DateTime<Utc>>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let role = record
            .role
            .unwrap_or_else(|| UserRole::from_flags(record.is_staff, record.is_superuser));
        Self {
            id: record.id,
            username: record.username,
            role,
            is_active: record.is_active,
            max_device_nb: record.max_device_nb,
            tournament: record.tournament,
            team: record.team,
            devices: record.devices,
            last_login: record.last_login,
            date_joined: record.date_joined,
        }
    }
}

impl User {
    /// Room left before hitting `max_device_nb`
    pub fn remaining_devices(&self) -> u32 {
        self.max_device_nb
            .saturating_sub(self.devices.len() as u32)
    }
}

/// Partial update for `/user/users/{id}/`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_device_nb: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Registration form body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_validation: String,
}

/// Body of `/user/change-password/{id}/`
#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub password: String,
}
