//! Route guards
//!
//! Decide whether the console may enter a page given the current session.

use crate::models::UserRole;
use crate::session::SessionStore;
use std::fmt;

/// Management pages (staff and admins only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementPage {
    Users,
    Marks,
    Devices,
    Whitelist,
    Announces,
}

impl ManagementPage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Marks => "marks",
            Self::Devices => "devices",
            Self::Whitelist => "whitelist",
            Self::Announces => "announces",
        }
    }
}

/// Known console locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The connected user's own page
    Home,
    Login,
    Faq,
    Management(ManagementPage),
    NotFound(String),
}

impl Route {
    /// Resolve a path, ignoring query string and trailing slash
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');

        match trimmed {
            "" => Self::Home,
            "/login" => Self::Login,
            "/faq" => Self::Faq,
            "/management/users" => Self::Management(ManagementPage::Users),
            "/management/marks" => Self::Management(ManagementPage::Marks),
            "/management/devices" => Self::Management(ManagementPage::Devices),
            "/management/whitelist" => Self::Management(ManagementPage::Whitelist),
            "/management/announces" => Self::Management(ManagementPage::Announces),
            _ => Self::NotFound(path.to_string()),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Faq => "/faq".to_string(),
            Self::Management(page) => format!("/management/{}", page.as_str()),
            Self::NotFound(path) => path.clone(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of a guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(Route),
}

impl Navigation {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

/// Guard decision from raw session facts
pub fn decide(route: &Route, is_connected: bool, role: Option<UserRole>) -> Navigation {
    match route {
        Route::Home if !is_connected => Navigation::Redirect(Route::Login),
        Route::Management(_) => {
            let privileged = role.map(|r| r.is_staff_like()).unwrap_or(false);
            if is_connected && privileged {
                Navigation::Proceed
            } else {
                Navigation::Redirect(Route::Home)
            }
        }
        _ => Navigation::Proceed,
    }
}

/// Guard a route against the live session
pub fn guard(route: &Route, session: &SessionStore) -> Navigation {
    decide(route, session.is_connected(), session.role())
}
