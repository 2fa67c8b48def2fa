// src/dag/work_unit.rs

use serde::{Deserialize, Serialize};

use crate::types::TargetId;

/// An ordered batch of targets handed to one minion.
///
/// The minion builds `target_ids` front to back. Any target in the unit
/// appears after every dependency of it that is also in the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkUnit {
    pub target_ids: Vec<TargetId>,
}

impl WorkUnit {
    pub fn new(target_ids: Vec<TargetId>) -> Self {
        Self { target_ids }
    }

    pub fn len(&self) -> usize {
        self.target_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target_ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.target_ids.iter().map(|s| s.as_str())
    }
}
