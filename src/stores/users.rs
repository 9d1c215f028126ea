//! User management store (staff only on the backend)

use super::report;
use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::{Page, PageRequest, PasswordChange, User, UserPatch};
use crate::notify::Notifier;
use reqwest::Method;
use std::sync::Arc;
use tracing::info;

/// Minimum password length accepted by the backend validators
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct UserStore {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl UserStore {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    pub async fn fetch_users(&self, page: PageRequest) -> Option<Page<User>> {
        let result = self
            .client
            .get_json_query("/user/users/", &page.query())
            .await;
        report(self.notifier.as_ref(), "Fetching users", result)
    }

    pub async fn fetch_user(&self, id: i64) -> Option<User> {
        let result = self.client.get_json(&format!("/user/users/{}/", id)).await;
        report(self.notifier.as_ref(), "Fetching user", result)
    }

    /// Partial edit; returns the updated user
    pub async fn edit_user(&self, id: i64, patch: &UserPatch) -> Option<User> {
        let result: Result<User> = if patch.is_empty() {
            Err(ApiError::Validation("nothing to update".to_string()))
        } else {
            self.client
                .mutate_json(Method::PATCH, &format!("/user/users/{}/", id), Some(patch))
                .await
        };
        report(self.notifier.as_ref(), "Editing user", result)
    }

    pub async fn delete_user(&self, id: i64) -> bool {
        let result = self
            .client
            .mutate_empty(Method::DELETE, &format!("/user/users/{}/", id))
            .await;
        let ok = report(self.notifier.as_ref(), "Deleting user", result).is_some();
        if ok {
            info!("Deleted user {}", id);
        }
        ok
    }

    pub async fn change_password(&self, id: i64, password: &str) -> bool {
        let result = if password.chars().count() < MIN_PASSWORD_LEN {
            Err(ApiError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )))
        } else {
            let body = PasswordChange {
                password: password.to_string(),
            };
            self.client
                .mutate(Method::PATCH, &format!("/user/change-password/{}/", id), Some(&body))
                .await
        };
        let ok = report(self.notifier.as_ref(), "Changing password", result).is_some();
        if ok {
            info!("Changed password of user {}", id);
        }
        ok
    }
}
