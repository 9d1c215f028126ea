//! Network devices

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A machine known to the gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub mac: String,
    #[serde(default)]
    pub whitelisted: bool,
    /// Skips the gate entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<u32>,
}

/// A device registered by a user from their own session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDevice {
    #[serde(flatten)]
    pub device: Device,
    /// Owner (username, or id on older backends)
    #[serde(deserialize_with = "super::string_or_number")]
    pub user: String,
    pub ip: IpAddr,
    /// LAN or WiFi
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

/// Entry of the mixed `/network/devices/` listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyDevice {
    User(UserDevice),
    Plain(Device),
}

impl AnyDevice {
    pub fn device(&self) -> &Device {
        match self {
            Self::User(d) => &d.device,
            Self::Plain(d) => d,
        }
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            Self::User(d) => Some(d.user.as_str()),
            Self::Plain(_) => None,
        }
    }
}

/// Body for `POST /network/devices/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    /// Left empty, the backend picks a name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mac: String,
    #[serde(default)]
    pub whitelisted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<u32>,
}

/// Partial device edit, only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelisted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass: Option<bool>,
}

impl DeviceUpdate {
    pub fn mark(mark: u32) -> Self {
        Self {
            mark: Some(mark),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Lowercase `aa:bb:cc:dd:ee:ff` form of a MAC address.
///
/// Accepts `:` or `-` separators. Returns None for anything else.
pub fn normalize_mac(mac: &str) -> Option<String> {
    let parts: Vec<&str> = mac.trim().split(|c: char| c == ':' || c == '-').collect();
    if parts.len() != 6 {
        return None;
    }
    if !parts
        .iter()
        .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
    {
        return None;
    }
    Some(parts.join(":").to_ascii_lowercase())
}

/// Sortable columns of `/network/userdevices/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOrderField {
    Id,
    Ip,
    Mac,
    Name,
    Area,
    User,
    Mark,
}

impl DeviceOrderField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Ip => "ip",
            Self::Mac => "mac",
            Self::Name => "name",
            Self::Area => "area",
            Self::User => "user",
            Self::Mark => "mark",
        }
    }
}

/// Ordering parameter, `-name` sorts descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOrder {
    pub field: DeviceOrderField,
    pub descending: bool,
}

impl fmt::Display for DeviceOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(self.field.as_str())
    }
}

impl FromStr for DeviceOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "id" => DeviceOrderField::Id,
            "ip" => DeviceOrderField::Ip,
            "mac" => DeviceOrderField::Mac,
            "name" => DeviceOrderField::Name,
            "area" => DeviceOrderField::Area,
            "user" => DeviceOrderField::User,
            "mark" => DeviceOrderField::Mark,
            other => return Err(format!("cannot order devices by {}", other)),
        };
        Ok(Self { field, descending })
    }
}

/// Listing options for `/network/userdevices/` and the whitelist.
///
/// The whitelist has no ip, area or owner, so it only filters and orders
/// on mac, name and mark; other columns are ignored by the backend.
#[derive(Debug, Clone, Default)]
pub struct DeviceQuery {
    pub page: super::PageRequest,
    /// Fuzzy match on the listing's text columns
    pub filter: Option<String>,
    pub order: Option<DeviceOrder>,
}

impl DeviceQuery {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self.page.query();
        if let Some(filter) = self.filter.as_ref().filter(|f| !f.is_empty()) {
            pairs.push(("filter", filter.clone()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.to_string()));
        }
        pairs
    }
}
