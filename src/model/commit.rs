//! Commit records and the ordered queue a timeline owns.

use crate::model::ArtifactId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of event recorded in the repository history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    /// File change.
    Checkin,
    /// Wiki page edit.
    Wiki,
    /// Ticket change.
    Ticket,
    /// Technical note.
    Technote,
    /// Tag added to or removed from another artifact.
    Tag,
    /// Forum post.
    Forum,
}

impl ArtifactType {
    /// Parse the short names accepted by `--type` (`ci`, `w`, `t`, `e`, `g`, `f`) or the long ones.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ci" | "checkin" => Some(Self::Checkin),
            "w" | "wiki" => Some(Self::Wiki),
            "t" | "ticket" => Some(Self::Ticket),
            "e" | "technote" => Some(Self::Technote),
            "g" | "tag" => Some(Self::Tag),
            "f" | "forum" => Some(Self::Forum),
            _ => None,
        }
    }

    /// Label shown in timeline rows and diff headers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Checkin => "checkin",
            Self::Wiki => "wiki",
            Self::Ticket => "ticket",
            Self::Technote => "technote",
            Self::Tag => "tag",
            Self::Forum => "forum",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the timeline.
///
/// Immutable once built; `index` is its position in the owning [`CommitQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    /// Position in the queue, strictly increasing in insertion order.
    pub index: usize,
    /// Artifact id of the commit (or wiki/ticket/... event).
    pub id: ArtifactId,
    /// Primary parent, if any.
    pub parent: Option<ArtifactId>,
    /// Author.
    pub user: String,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Branch the commit belongs to.
    pub branch: Option<String>,
    /// Event kind.
    pub kind: ArtifactType,
    /// Full comment text.
    pub comment: String,
    /// Symbolic tags attached to the commit.
    pub tags: Vec<String>,
}

impl CommitEntry {
    /// First line of the comment, used for one-line display.
    pub fn summary(&self) -> &str {
        self.comment.lines().next().unwrap_or("")
    }
}

/// Ordered sequence of commits, newest first.
#[derive(Debug, Default, Clone)]
pub struct CommitQueue {
    entries: Vec<CommitEntry>,
}

impl CommitQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, rejecting anything that would break index ordering.
    ///
    /// Returns `false` (and drops the entry) when the index does not match the
    /// queue length.
    pub fn push(&mut self, entry: CommitEntry) -> bool {
        if entry.index != self.entries.len() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been queued yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`.
    pub fn get(&self, index: usize) -> Option<&CommitEntry> {
        self.entries.get(index)
    }

    /// Oldest queued entry.
    pub fn last(&self) -> Option<&CommitEntry> {
        self.entries.last()
    }

    /// All entries, newest first.
    pub fn iter(&self) -> std::slice::Iter<'_, CommitEntry> {
        self.entries.iter()
    }

    /// Entries in `start..end`, clamped to the queue.
    pub fn window(&self, start: usize, end: usize) -> &[CommitEntry] {
        let end = end.min(self.entries.len());
        let start = start.min(end);
        &self.entries[start..end]
    }
}
