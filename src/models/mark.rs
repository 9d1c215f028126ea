//! Marks (device classification tags)

use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Fields of a mark an administrator may change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditableMark {
    pub name: String,
    /// Packet mark applied to the device's traffic
    pub value: u32,
    /// Relative weight when the backend assigns marks
    pub priority: f64,
}

/// Mark with the aggregates computed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub name: String,
    pub value: u32,
    pub priority: f64,
    /// Devices currently carrying this mark
    #[serde(default)]
    pub devices: u64,
    /// Whitelisted devices among them
    #[serde(default)]
    pub whitelisted: u64,
}

impl Mark {
    pub fn editable(&self) -> EditableMark {
        EditableMark {
            name: self.name.clone(),
            value: self.value,
            priority: self.priority,
        }
    }
}

impl From<&Mark> for EditableMark {
    fn from(mark: &Mark) -> Self {
        mark.editable()
    }
}

/// Game name to the mark values its players may receive
pub type GameMarks = BTreeMap<String, Vec<u32>>;

/// Reject mark lists the backend would refuse
pub fn validate_marks(marks: &[EditableMark]) -> Result<()> {
    if marks.is_empty() {
        return Err(ApiError::Validation("at least one mark is required".to_string()));
    }

    let mut seen = HashSet::new();
    for mark in marks {
        if mark.name.trim().is_empty() {
            return Err(ApiError::Validation(format!("mark {} has no name", mark.value)));
        }
        if !mark.priority.is_finite() || mark.priority < 0.0 {
            return Err(ApiError::Validation(format!(
                "mark {} has an invalid priority",
                mark.name
            )));
        }
        if !seen.insert(mark.value) {
            return Err(ApiError::Validation(format!("duplicate mark value {}", mark.value)));
        }
    }

    Ok(())
}

/// Values referenced by games that no mark defines
pub fn dangling_game_marks(games: &GameMarks, marks: &[Mark]) -> Vec<(String, u32)> {
    let known: HashSet<u32> = marks.iter().map(|m| m.value).collect();
    games
        .iter()
        .flat_map(|(game, values)| {
            values
                .iter()
                .filter(|v| !known.contains(v))
                .map(move |v| (game.clone(), *v))
        })
        .collect()
}
