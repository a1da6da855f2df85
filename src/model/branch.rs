//! Branch list entries and their sort orders.

use crate::model::ArtifactId;
use chrono::{DateTime, Utc};
use std::fmt;

/// One branch as shown in the branch view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchEntry {
    /// Branch name.
    pub name: String,
    /// Id of the branch tip.
    pub tip: ArtifactId,
    /// Whether the branch is still open.
    pub open: bool,
    /// Private (never synced) branch.
    pub private: bool,
    /// Whether the local checkout is on this branch.
    pub current: bool,
    /// Time of the most recent commit on the branch.
    pub last_activity: DateTime<Utc>,
}

/// Sort order for the branch list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchSort {
    /// Lexicographic by name.
    #[default]
    Name,
    /// Most recently active first.
    MostRecent,
    /// Open branches first, then closed; each group by name.
    State,
}

impl BranchSort {
    /// Parse a setting value (`name`, `mru`, `state`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "name" => Some(Self::Name),
            "mru" | "recent" | "mtime" => Some(Self::MostRecent),
            "state" | "status" => Some(Self::State),
            _ => None,
        }
    }

    /// Next order in the `s` key cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Name => Self::MostRecent,
            Self::MostRecent => Self::State,
            Self::State => Self::Name,
        }
    }
}

impl fmt::Display for BranchSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::MostRecent => "mru",
            Self::State => "state",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_cycle_visits_every_order() {
        let start = BranchSort::Name;
        assert_eq!(start.next().next().next(), start);
        assert_ne!(start.next(), start);
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(BranchSort::parse("MRU"), Some(BranchSort::MostRecent));
        assert_eq!(BranchSort::parse("status"), Some(BranchSort::State));
        assert_eq!(BranchSort::parse("size"), None);
    }
}
