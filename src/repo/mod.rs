//! Repository engine boundary.
//!
//! The browser consumes repositories only through the [`Repository`] trait: a
//! prepare/step history cursor, symbolic-name resolution, manifest and blob
//! loading, non-checkin artifacts, the local checkout, annotate and the branch
//! list. [`snapshot::SnapshotRepository`] is the engine shipped with the crate.

pub mod annotate;
pub mod snapshot;

use crate::model::{AnnotateError, ArtifactId, ArtifactType, Cancelled, RepoError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub use snapshot::{CommitSpec, Snapshot, SnapshotBuilder, SnapshotRepository};

/// Repository shared between the event loop and producer threads.
pub type SharedRepository = Arc<dyn Repository>;

/// Narrow query/iteration interface to the storage engine.
///
/// Every method is synchronous; producers call them from their own threads.
pub trait Repository: Send + Sync {
    /// Prepare a history query. Rows come out newest first.
    fn history(&self, query: &HistoryQuery) -> Result<Box<dyn HistoryCursor>, RepoError>;

    /// Resolve a symbolic name (id, unique id prefix, `tip`, `current`, branch, tag).
    fn resolve(&self, name: &str) -> Result<ArtifactId, RepoError>;

    /// Load the manifest of a checkin.
    fn manifest(&self, id: &ArtifactId) -> Result<Manifest, RepoError>;

    /// Raw content of a file artifact.
    fn blob(&self, id: &ArtifactId) -> Result<Vec<u8>, RepoError>;

    /// Load any artifact, checkin or not.
    fn artifact(&self, id: &ArtifactId) -> Result<Artifact, RepoError>;

    /// Local checkout state, when the repository has one.
    fn checkout(&self) -> Option<Checkout>;

    /// Checkins having `id` as a parent, oldest first.
    fn children(&self, id: &ArtifactId) -> Result<Vec<ArtifactId>, RepoError>;

    /// Attribute each line of a file to a commit, reporting lines as they are found.
    ///
    /// The callback returns `Err(Cancelled)` to stop the walk early.
    fn annotate(
        &self,
        request: &AnnotateRequest,
        on_line: &mut dyn FnMut(AnnotatedLine) -> Result<(), Cancelled>,
    ) -> Result<AnnotateStatus, AnnotateError>;

    /// Branches matching `filter`, in engine order.
    fn branches(&self, filter: &BranchFilter) -> Result<Vec<BranchRow>, RepoError>;
}

/// A prepared history query.
pub trait HistoryCursor: Send {
    /// Next row, `Ok(None)` once the history is exhausted.
    fn step(&mut self) -> Result<Option<HistoryRow>, RepoError>;
}

/// Filters for a history query. Empty filter means "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Only events at or before this commit's time.
    pub start: Option<ArtifactId>,
    /// Only checkins that touch this file or directory.
    pub path: Option<String>,
    /// Only checkins on this branch.
    pub branch: Option<String>,
    /// Only events by this user.
    pub user: Option<String>,
    /// Only events of this kind.
    pub kind: Option<ArtifactType>,
    /// Reposition: only events at or before this time (inclusive).
    pub resume_at: Option<DateTime<Utc>>,
}

/// One row produced by a history cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// Event id.
    pub id: ArtifactId,
    /// Primary parent.
    pub parent: Option<ArtifactId>,
    /// Author.
    pub user: String,
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// Branch, for checkins.
    pub branch: Option<String>,
    /// Event kind.
    pub kind: ArtifactType,
    /// Comment or title.
    pub comment: String,
    /// Tags attached to the event.
    pub tags: Vec<String>,
}

/// File permission recorded on a file card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Plain file.
    #[default]
    Regular,
    /// Executable file.
    Executable,
    /// Symbolic link; the blob holds the target.
    Symlink,
}

/// One file entry of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCard {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// Content id.
    pub id: ArtifactId,
    /// Permission bits.
    #[serde(default)]
    pub perm: Permission,
    /// Previous path when the file was renamed in this commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_name: Option<String>,
}

/// A checkin's file list and metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Checkin id.
    pub id: ArtifactId,
    /// Parents, primary first.
    pub parents: Vec<ArtifactId>,
    /// Author.
    pub user: String,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
    /// Check-in comment.
    pub comment: String,
    /// Branch.
    pub branch: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// File cards sorted by path.
    pub cards: Vec<FileCard>,
}

impl Manifest {
    /// Primary parent.
    pub fn parent(&self) -> Option<&ArtifactId> {
        self.parents.first()
    }

    /// Card for `path`, by binary search over the sorted card list.
    pub fn card(&self, path: &str) -> Option<&FileCard> {
        self.cards
            .binary_search_by(|card| card.path.as_str().cmp(path))
            .ok()
            .map(|i| &self.cards[i])
    }

    /// Whether `path` names a directory in this manifest.
    pub fn has_directory(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.cards.iter().any(|card| card.path.starts_with(&prefix))
    }
}

/// Non-checkin artifact or a checkin manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// A checkin.
    Checkin(Manifest),
    /// A wiki page version.
    Wiki(WikiPage),
    /// A forum post version.
    Forum(WikiPage),
    /// A ticket change.
    Ticket(TicketChange),
    /// A tag control artifact.
    Tag(TagArtifact),
    /// A technote.
    Technote(Technote),
}

impl Artifact {
    /// Kind of the artifact.
    pub fn kind(&self) -> ArtifactType {
        match self {
            Artifact::Checkin(_) => ArtifactType::Checkin,
            Artifact::Wiki(_) => ArtifactType::Wiki,
            Artifact::Forum(_) => ArtifactType::Forum,
            Artifact::Ticket(_) => ArtifactType::Ticket,
            Artifact::Tag(_) => ArtifactType::Tag,
            Artifact::Technote(_) => ArtifactType::Technote,
        }
    }
}

/// One version of a wiki page or forum post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPage {
    /// Artifact id.
    pub id: ArtifactId,
    /// Page title.
    pub title: String,
    /// Author.
    pub user: String,
    /// Edit time.
    pub time: DateTime<Utc>,
    /// Page text.
    pub content: String,
    /// Previous version of the page.
    #[serde(default)]
    pub parent: Option<ArtifactId>,
    /// Markup type.
    #[serde(default)]
    pub mimetype: Option<String>,
}

/// Fields changed on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketChange {
    /// Artifact id.
    pub id: ArtifactId,
    /// Ticket the change applies to.
    pub ticket: String,
    /// Author.
    pub user: String,
    /// Change time.
    pub time: DateTime<Utc>,
    /// Field name to new value.
    pub fields: BTreeMap<String, String>,
}

/// Operation of one tag card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagOp {
    /// Add a singleton tag.
    Add,
    /// Cancel a tag.
    Cancel,
    /// Add a tag that propagates to descendants.
    Propagate,
}

impl TagOp {
    /// Card prefix character.
    pub fn symbol(self) -> char {
        match self {
            TagOp::Add => '+',
            TagOp::Cancel => '-',
            TagOp::Propagate => '*',
        }
    }
}

/// One tag card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCard {
    /// Operation.
    pub op: TagOp,
    /// Tag name.
    pub name: String,
    /// Optional value.
    #[serde(default)]
    pub value: Option<String>,
}

/// A tag control artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagArtifact {
    /// Artifact id.
    pub id: ArtifactId,
    /// Author.
    pub user: String,
    /// Time of the change.
    pub time: DateTime<Utc>,
    /// Artifact the tags apply to.
    pub target: ArtifactId,
    /// Tag cards.
    pub cards: Vec<TagCard>,
}

/// A technote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technote {
    /// Artifact id.
    pub id: ArtifactId,
    /// Author.
    pub user: String,
    /// Time of the edit.
    pub time: DateTime<Utc>,
    /// Time the note is attached to on the timeline.
    pub event_time: DateTime<Utc>,
    /// Comment shown on the timeline.
    pub comment: String,
    /// Body text.
    pub text: String,
}

/// Change flags of a file in the local checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum VFileState {
    /// Identical to the stored version.
    Unchanged,
    /// Content edited.
    Edited,
    /// Scheduled for addition.
    Added,
    /// Scheduled for removal.
    Deleted,
    /// Missing from disk.
    Missing,
    /// Renamed from another path (and possibly edited).
    Renamed {
        /// Stored path.
        from: String,
    },
}

/// One file of the local checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VFile {
    /// Path on disk.
    pub path: String,
    /// Change flags.
    #[serde(flatten)]
    pub state: VFileState,
    /// Current on-disk content, absent for deleted/missing files.
    #[serde(default)]
    pub content: Option<String>,
}

/// The local checkout: a base checkin plus file states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    /// Checkin the checkout is based on.
    pub base: ArtifactId,
    /// Files tracked by the checkout.
    pub files: Vec<VFile>,
}

/// Bounds on an annotate walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateLimit {
    /// Stop after this many distinct file versions.
    pub max_versions: Option<usize>,
    /// Soft wall-clock budget for the whole walk.
    pub budget: Option<Duration>,
}

impl AnnotateLimit {
    /// Whether either bound is set.
    pub fn is_bounded(&self) -> bool {
        self.max_versions.is_some() || self.budget.is_some()
    }
}

/// Parameters of an annotate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateRequest {
    /// File to annotate.
    pub path: String,
    /// Version to annotate (forward), or root to walk from (reverse).
    pub start: ArtifactId,
    /// Walk bounds.
    pub limit: AnnotateLimit,
    /// Attribute each line to its first later modification.
    pub reverse: bool,
}

/// One attribution reported by annotate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedLine {
    /// 0-based line number in the annotated version.
    pub line: usize,
    /// Commit the line is attributed to.
    pub commit: ArtifactId,
}

/// How an annotate run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotateStatus {
    /// The walk reached the file's origin (or tip in reverse mode).
    Complete {
        /// Versions examined.
        versions: usize,
    },
    /// A limit stopped the walk; unresolved lines went to the last version examined.
    Truncated {
        /// Versions examined.
        versions: usize,
    },
}

/// Branch list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchFilter {
    /// `Some(true)`: open only; `Some(false)`: closed only.
    pub open: Option<bool>,
    /// Include private branches.
    pub include_private: bool,
    /// Case-insensitive substring the name must contain.
    pub name_contains: Option<String>,
    /// Only branches active at or after this time.
    pub since: Option<DateTime<Utc>>,
}

/// Branch metadata as returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRow {
    /// Branch name.
    pub name: String,
    /// Tip id.
    pub tip: ArtifactId,
    /// Open or closed.
    pub open: bool,
    /// Private branch.
    pub private: bool,
    /// Checkout is on this branch.
    pub current: bool,
    /// Time of the tip.
    pub last_activity: DateTime<Utc>,
}

/// Ids already queued at the resume timestamp; rows repeating them are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumePoint {
    /// Inclusive time bound the query restarts from.
    pub at: Option<DateTime<Utc>>,
    /// Entries already seen at exactly that time.
    pub seen: HashSet<ArtifactId>,
}

/// Split text into display lines the same way everywhere (diff, blame, annotate).
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}
