//! Mark store

use super::report;
use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{validate_marks, EditableMark, GameMarks, Mark};
use crate::notify::Notifier;
use reqwest::Method;
use std::sync::Arc;
use tracing::info;

/// Marks and the per-game mark tables
#[derive(Clone)]
pub struct MarkStore {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl MarkStore {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    pub async fn fetch_marks(&self) -> Option<Vec<Mark>> {
        let result = self.client.get_json("/network/marks/").await;
        report(self.notifier.as_ref(), "Fetching marks", result)
    }

    /// Replace the whole mark list. Returns the list the backend stored.
    pub async fn patch_marks(&self, marks: &[EditableMark]) -> Option<Vec<Mark>> {
        let result: Result<Vec<Mark>> = match validate_marks(marks) {
            Ok(()) => {
                self.client
                    .mutate_json(Method::PATCH, "/network/marks/", Some(marks))
                    .await
            }
            Err(e) => Err(e),
        };
        let stored = report(self.notifier.as_ref(), "Saving marks", result)?;
        info!("Saved {} marks", stored.len());
        Some(stored)
    }

    /// Move every device carrying mark `old` to mark `new`
    pub async fn move_mark(&self, old: u32, new: u32) -> bool {
        let result = self
            .client
            .mutate_empty(Method::POST, &format!("/network/mark/{}/move/{}/", old, new))
            .await;
        let ok = report(self.notifier.as_ref(), "Moving mark", result).is_some();
        if ok {
            info!("Moved devices from mark {} to {}", old, new);
        }
        ok
    }

    /// Redistribute the devices of mark `old` over the other marks
    pub async fn spread_mark(&self, old: u32) -> bool {
        let result = self
            .client
            .mutate_empty(Method::POST, &format!("/network/mark/{}/spread/", old))
            .await;
        let ok = report(self.notifier.as_ref(), "Spreading mark", result).is_some();
        if ok {
            info!("Spread devices of mark {}", old);
        }
        ok
    }

    pub async fn fetch_game_marks(&self) -> Option<GameMarks> {
        let result = self.client.get_json("/network/games/").await;
        report(self.notifier.as_ref(), "Fetching game marks", result)
    }

    pub async fn patch_game_marks(&self, games: &GameMarks) -> bool {
        let result = self
            .client
            .mutate(Method::PATCH, "/network/games/", Some(games))
            .await;
        let ok = report(self.notifier.as_ref(), "Saving game marks", result).is_some();
        if ok {
            info!("Saved mark tables for {} games", games.len());
        }
        ok
    }
}
