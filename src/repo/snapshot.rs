//! In-memory repository loaded from a JSON snapshot.
//!
//! A snapshot lists checkins (with their complete file cards), file contents,
//! non-checkin artifacts, branch states and an optional local checkout. It is
//! the engine the binary opens by default and the one tests build with
//! [`SnapshotBuilder`].

use crate::model::{AnnotateError, ArtifactId, ArtifactType, Cancelled, RepoError};
use crate::repo::{
    annotate, AnnotateRequest, AnnotateStatus, AnnotatedLine, Artifact, BranchFilter, BranchRow,
    Checkout, FileCard, HistoryCursor, HistoryQuery, HistoryRow, Manifest, Permission,
    Repository, TagArtifact, TagCard, Technote, TicketChange, VFile, WikiPage,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Minimum length of an id prefix accepted by `resolve`.
const MIN_PREFIX_LEN: usize = 4;

/// Serialized form of a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Checkins, in any order.
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    /// File contents by id.
    #[serde(default)]
    pub blobs: BTreeMap<ArtifactId, String>,
    /// Wiki pages, tickets, tags, technotes and forum posts.
    #[serde(default)]
    pub artifacts: Vec<ArtifactRecord>,
    /// Branch states; branches not listed are open and public.
    #[serde(default)]
    pub branches: Vec<BranchRecord>,
    /// Local checkout.
    #[serde(default)]
    pub checkout: Option<Checkout>,
}

/// One checkin as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Checkin id.
    pub id: ArtifactId,
    /// Parents, primary first.
    #[serde(default)]
    pub parents: Vec<ArtifactId>,
    /// Author.
    pub user: String,
    /// Commit time.
    pub time: DateTime<Utc>,
    /// Branch.
    #[serde(default)]
    pub branch: Option<String>,
    /// Comment.
    #[serde(default)]
    pub comment: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Complete file list of the checkin.
    #[serde(default)]
    pub files: Vec<FileCard>,
}

/// Non-checkin artifact as stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArtifactRecord {
    /// Wiki page version.
    Wiki(WikiPage),
    /// Forum post version.
    Forum(WikiPage),
    /// Ticket change.
    Ticket(TicketChange),
    /// Tag control artifact.
    Tag(TagArtifact),
    /// Technote.
    Technote(Technote),
}

impl ArtifactRecord {
    fn into_artifact(self) -> Artifact {
        match self {
            ArtifactRecord::Wiki(page) => Artifact::Wiki(page),
            ArtifactRecord::Forum(page) => Artifact::Forum(page),
            ArtifactRecord::Ticket(change) => Artifact::Ticket(change),
            ArtifactRecord::Tag(tag) => Artifact::Tag(tag),
            ArtifactRecord::Technote(note) => Artifact::Technote(note),
        }
    }
}

/// Stored branch state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Branch name.
    pub name: String,
    /// Open or closed.
    #[serde(default = "default_true")]
    pub open: bool,
    /// Private branch.
    #[serde(default)]
    pub private: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Commit(usize),
    Artifact(usize),
}

#[derive(Debug, Clone)]
struct Event {
    time: DateTime<Utc>,
    node: Node,
}

#[derive(Debug)]
struct Index {
    commits: Vec<Manifest>,
    artifacts: Vec<Artifact>,
    by_id: HashMap<ArtifactId, Node>,
    blobs: HashMap<ArtifactId, String>,
    /// Every event, newest first.
    events: Vec<Event>,
    children: HashMap<ArtifactId, Vec<ArtifactId>>,
    branch_states: HashMap<String, BranchRecord>,
    checkout: Option<Checkout>,
}

/// Repository backed by an in-memory snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotRepository {
    index: Arc<Index>,
}

impl SnapshotRepository {
    /// Index a snapshot, validating parent links.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::Corrupt` for duplicate ids or dangling parents.
    pub fn new(snapshot: Snapshot) -> Result<Self, RepoError> {
        let mut by_id = HashMap::new();
        let mut commits = Vec::with_capacity(snapshot.commits.len());
        let mut events = Vec::new();

        for record in snapshot.commits {
            let mut cards = record.files;
            cards.sort_by(|a, b| a.path.cmp(&b.path));
            if by_id
                .insert(record.id.clone(), Node::Commit(commits.len()))
                .is_some()
            {
                return Err(RepoError::Corrupt(format!("duplicate id {}", record.id)));
            }
            events.push(Event {
                time: record.time,
                node: Node::Commit(commits.len()),
            });
            commits.push(Manifest {
                id: record.id,
                parents: record.parents,
                user: record.user,
                timestamp: record.time,
                comment: record.comment,
                branch: record.branch,
                tags: record.tags,
                cards,
            });
        }

        let mut artifacts = Vec::with_capacity(snapshot.artifacts.len());
        for record in snapshot.artifacts {
            let artifact = record.into_artifact();
            let (id, time) = artifact_id_and_time(&artifact);
            if by_id
                .insert(id.clone(), Node::Artifact(artifacts.len()))
                .is_some()
            {
                return Err(RepoError::Corrupt(format!("duplicate id {id}")));
            }
            events.push(Event {
                time,
                node: Node::Artifact(artifacts.len()),
            });
            artifacts.push(artifact);
        }

        let mut children: HashMap<ArtifactId, Vec<ArtifactId>> = HashMap::new();
        for manifest in &commits {
            for parent in &manifest.parents {
                if !matches!(by_id.get(parent), Some(Node::Commit(_))) {
                    return Err(RepoError::Corrupt(format!(
                        "{} has unknown parent {parent}",
                        manifest.id
                    )));
                }
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(manifest.id.clone());
            }
        }
        for kids in children.values_mut() {
            kids.sort_by_key(|id| match by_id.get(id) {
                Some(Node::Commit(i)) => commits[*i].timestamp,
                _ => DateTime::<Utc>::MIN_UTC,
            });
        }

        // Newest first; among equal times, later insertion first.
        let mut order: Vec<(usize, Event)> = events.into_iter().enumerate().collect();
        order.sort_by(|(ia, a), (ib, b)| b.time.cmp(&a.time).then(ib.cmp(ia)));
        let events = order.into_iter().map(|(_, e)| e).collect();

        let branch_states = snapshot
            .branches
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();

        info!(
            commits = commits.len(),
            artifacts = artifacts.len(),
            "repository snapshot indexed"
        );

        Ok(Self {
            index: Arc::new(Index {
                commits,
                artifacts,
                by_id,
                blobs: snapshot.blobs.into_iter().collect(),
                events,
                children,
                branch_states,
                checkout: snapshot.checkout,
            }),
        })
    }

    /// Load a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `RepoError::Io` if the file cannot be read and
    /// `RepoError::Snapshot` if it is not a valid snapshot.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let snapshot: Snapshot =
            serde_json::from_str(&contents).map_err(|e| RepoError::Snapshot {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Self::new(snapshot)
    }

    fn commit(&self, id: &ArtifactId) -> Option<&Manifest> {
        match self.index.by_id.get(id) {
            Some(Node::Commit(i)) => self.index.commits.get(*i),
            _ => None,
        }
    }

    fn latest_checkin(&self, pred: impl Fn(&Manifest) -> bool) -> Option<&Manifest> {
        self.index.events.iter().find_map(|event| match event.node {
            Node::Commit(i) if pred(&self.index.commits[i]) => Some(&self.index.commits[i]),
            _ => None,
        })
    }

    fn resolve_prefix(&self, prefix: &str) -> Result<ArtifactId, RepoError> {
        let mut found: BTreeSet<&ArtifactId> = self
            .index
            .by_id
            .keys()
            .filter(|id| id.has_prefix(prefix))
            .collect();
        found.extend(self.index.blobs.keys().filter(|id| id.has_prefix(prefix)));
        let mut found = found.into_iter();
        match (found.next(), found.next()) {
            (Some(id), None) => Ok(id.clone()),
            (Some(_), Some(_)) => Err(RepoError::Ambiguous {
                prefix: prefix.to_string(),
            }),
            _ => Err(RepoError::UnknownName {
                name: prefix.to_string(),
            }),
        }
    }
}

fn artifact_id_and_time(artifact: &Artifact) -> (ArtifactId, DateTime<Utc>) {
    match artifact {
        Artifact::Checkin(m) => (m.id.clone(), m.timestamp),
        Artifact::Wiki(p) | Artifact::Forum(p) => (p.id.clone(), p.time),
        Artifact::Ticket(t) => (t.id.clone(), t.time),
        Artifact::Tag(t) => (t.id.clone(), t.time),
        Artifact::Technote(t) => (t.id.clone(), t.event_time),
    }
}

fn artifact_row(artifact: &Artifact) -> HistoryRow {
    let (id, timestamp) = artifact_id_and_time(artifact);
    let (user, parent, comment) = match artifact {
        Artifact::Checkin(m) => (m.user.clone(), m.parent().cloned(), m.comment.clone()),
        Artifact::Wiki(p) => (
            p.user.clone(),
            p.parent.clone(),
            format!("Changes to wiki page [{}]", p.title),
        ),
        Artifact::Forum(p) => (p.user.clone(), p.parent.clone(), format!("Post: {}", p.title)),
        Artifact::Ticket(t) => {
            let title = t
                .fields
                .get("title")
                .map(|title| format!(": {title}"))
                .unwrap_or_default();
            let short: String = t.ticket.chars().take(10).collect();
            (t.user.clone(), None, format!("Ticket [{short}]{title}"))
        }
        Artifact::Tag(t) => {
            let cards: Vec<String> = t
                .cards
                .iter()
                .map(|c| format!("{}{}", c.op.symbol(), c.name))
                .collect();
            (
                t.user.clone(),
                None,
                format!("Edit [{}]: {}", t.target.short(), cards.join(" ")),
            )
        }
        Artifact::Technote(t) => (t.user.clone(), None, t.comment.clone()),
    };
    HistoryRow {
        id,
        parent,
        user,
        timestamp,
        branch: None,
        kind: artifact.kind(),
        comment,
        tags: Vec::new(),
    }
}

/// Whether `card` falls under the path filter (a file or a directory prefix).
fn under(card: &FileCard, path: &str) -> bool {
    let path = path.trim_end_matches('/');
    card.path == path
        || (card.path.len() > path.len()
            && card.path.starts_with(path)
            && card.path.as_bytes()[path.len()] == b'/')
}

struct SnapshotCursor {
    repo: SnapshotRepository,
    query: HistoryQuery,
    upper: Option<DateTime<Utc>>,
    position: usize,
}

impl SnapshotCursor {
    fn touches(&self, manifest: &Manifest, path: &str) -> bool {
        let mine: Vec<(&str, &ArtifactId)> = manifest
            .cards
            .iter()
            .filter(|c| under(c, path))
            .map(|c| (c.path.as_str(), &c.id))
            .collect();
        let theirs: Vec<(&str, &ArtifactId)> = manifest
            .parent()
            .and_then(|p| self.repo.commit(p))
            .map(|parent| {
                parent
                    .cards
                    .iter()
                    .filter(|c| under(c, path))
                    .map(|c| (c.path.as_str(), &c.id))
                    .collect()
            })
            .unwrap_or_default();
        mine != theirs
    }

    fn accepts(&self, event: &Event) -> Option<HistoryRow> {
        if self.upper.is_some_and(|upper| event.time > upper) {
            return None;
        }
        if self.query.resume_at.is_some_and(|at| event.time > at) {
            return None;
        }
        let row = match event.node {
            Node::Commit(i) => {
                let manifest = &self.repo.index.commits[i];
                if let Some(branch) = &self.query.branch {
                    if manifest.branch.as_deref() != Some(branch.as_str()) {
                        return None;
                    }
                }
                if let Some(path) = &self.query.path {
                    if !self.touches(manifest, path) {
                        return None;
                    }
                }
                HistoryRow {
                    id: manifest.id.clone(),
                    parent: manifest.parent().cloned(),
                    user: manifest.user.clone(),
                    timestamp: manifest.timestamp,
                    branch: manifest.branch.clone(),
                    kind: ArtifactType::Checkin,
                    comment: manifest.comment.clone(),
                    tags: manifest.tags.clone(),
                }
            }
            Node::Artifact(i) => {
                if self.query.branch.is_some() || self.query.path.is_some() {
                    return None;
                }
                artifact_row(&self.repo.index.artifacts[i])
            }
        };
        if self.query.kind.is_some_and(|kind| kind != row.kind) {
            return None;
        }
        if self
            .query
            .user
            .as_ref()
            .is_some_and(|user| *user != row.user)
        {
            return None;
        }
        Some(row)
    }
}

impl HistoryCursor for SnapshotCursor {
    fn step(&mut self) -> Result<Option<HistoryRow>, RepoError> {
        while let Some(event) = self.repo.index.events.get(self.position) {
            self.position += 1;
            if let Some(row) = self.accepts(event) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

impl Repository for SnapshotRepository {
    fn history(&self, query: &HistoryQuery) -> Result<Box<dyn HistoryCursor>, RepoError> {
        let upper = match &query.start {
            Some(start) => {
                let node = self
                    .index
                    .by_id
                    .get(start)
                    .ok_or_else(|| RepoError::MissingArtifact {
                        id: start.to_string(),
                    })?;
                Some(match node {
                    Node::Commit(i) => self.index.commits[*i].timestamp,
                    Node::Artifact(i) => artifact_id_and_time(&self.index.artifacts[*i]).1,
                })
            }
            None => None,
        };
        Ok(Box::new(SnapshotCursor {
            repo: self.clone(),
            query: query.clone(),
            upper,
            position: 0,
        }))
    }

    fn resolve(&self, name: &str) -> Result<ArtifactId, RepoError> {
        let name = name.trim();
        match name {
            "tip" => {
                return self
                    .latest_checkin(|_| true)
                    .map(|m| m.id.clone())
                    .ok_or_else(|| RepoError::UnknownName {
                        name: name.to_string(),
                    })
            }
            "current" | "checkout" => {
                return self
                    .index
                    .checkout
                    .as_ref()
                    .map(|c| c.base.clone())
                    .ok_or(RepoError::NoCheckout)
            }
            _ => {}
        }
        if let Ok(id) = ArtifactId::new(name) {
            if self.index.by_id.contains_key(&id) || self.index.blobs.contains_key(&id) {
                return Ok(id);
            }
        }
        if let Some(tip) = self.latest_checkin(|m| m.branch.as_deref() == Some(name)) {
            return Ok(tip.id.clone());
        }
        if let Some(tagged) = self.latest_checkin(|m| m.tags.iter().any(|t| t == name)) {
            return Ok(tagged.id.clone());
        }
        if name.len() >= MIN_PREFIX_LEN && ArtifactId::new(name).is_ok() {
            return self.resolve_prefix(name);
        }
        Err(RepoError::UnknownName {
            name: name.to_string(),
        })
    }

    fn manifest(&self, id: &ArtifactId) -> Result<Manifest, RepoError> {
        match self.index.by_id.get(id) {
            Some(Node::Commit(i)) => Ok(self.index.commits[*i].clone()),
            Some(Node::Artifact(_)) => Err(RepoError::WrongKind {
                id: id.to_string(),
                expected: "checkin",
            }),
            None => Err(RepoError::MissingArtifact { id: id.to_string() }),
        }
    }

    fn blob(&self, id: &ArtifactId) -> Result<Vec<u8>, RepoError> {
        self.index
            .blobs
            .get(id)
            .map(|text| text.as_bytes().to_vec())
            .ok_or_else(|| RepoError::MissingArtifact { id: id.to_string() })
    }

    fn artifact(&self, id: &ArtifactId) -> Result<Artifact, RepoError> {
        match self.index.by_id.get(id) {
            Some(Node::Commit(i)) => Ok(Artifact::Checkin(self.index.commits[*i].clone())),
            Some(Node::Artifact(i)) => Ok(self.index.artifacts[*i].clone()),
            None => Err(RepoError::MissingArtifact { id: id.to_string() }),
        }
    }

    fn checkout(&self) -> Option<Checkout> {
        self.index.checkout.clone()
    }

    fn children(&self, id: &ArtifactId) -> Result<Vec<ArtifactId>, RepoError> {
        if self.commit(id).is_none() {
            return Err(RepoError::MissingArtifact { id: id.to_string() });
        }
        Ok(self.index.children.get(id).cloned().unwrap_or_default())
    }

    fn annotate(
        &self,
        request: &AnnotateRequest,
        on_line: &mut dyn FnMut(AnnotatedLine) -> Result<(), Cancelled>,
    ) -> Result<AnnotateStatus, AnnotateError> {
        annotate::annotate(self, request, on_line)
    }

    fn branches(&self, filter: &BranchFilter) -> Result<Vec<BranchRow>, RepoError> {
        let current_branch = self
            .index
            .checkout
            .as_ref()
            .and_then(|c| self.commit(&c.base))
            .and_then(|m| m.branch.clone());
        let needle = filter.name_contains.as_ref().map(|s| s.to_lowercase());

        let mut seen = BTreeSet::new();
        let mut rows = Vec::new();
        for event in &self.index.events {
            let Node::Commit(i) = event.node else { continue };
            let manifest = &self.index.commits[i];
            let Some(name) = &manifest.branch else { continue };
            if !seen.insert(name.clone()) {
                continue;
            }
            let state = self.index.branch_states.get(name);
            let row = BranchRow {
                name: name.clone(),
                tip: manifest.id.clone(),
                open: state.map_or(true, |s| s.open),
                private: state.is_some_and(|s| s.private),
                current: current_branch.as_deref() == Some(name.as_str()),
                last_activity: manifest.timestamp,
            };
            if filter.open.is_some_and(|open| open != row.open) {
                continue;
            }
            if row.private && !filter.include_private {
                continue;
            }
            if needle
                .as_ref()
                .is_some_and(|n| !row.name.to_lowercase().contains(n.as_str()))
            {
                continue;
            }
            if filter.since.is_some_and(|since| row.last_activity < since) {
                continue;
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

// ===== Builder =====

/// Deterministic 40-digit hex id derived from `parts` (FNV-1a, four lanes).
fn mint_id(parts: &[&str]) -> ArtifactId {
    let mut hex = String::with_capacity(64);
    for lane in 0u64..4 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325 ^ lane.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        for part in parts {
            for byte in part.bytes().chain(std::iter::once(0xff)) {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
        }
        hex.push_str(&format!("{hash:016x}"));
    }
    hex.truncate(40);
    ArtifactId::from_digest(hex)
}

/// Description of one checkin for [`SnapshotBuilder::commit`].
///
/// `files` is the complete file set of the checkin, not a delta.
#[derive(Debug, Clone)]
pub struct CommitSpec {
    user: String,
    time: DateTime<Utc>,
    comment: String,
    branch: Option<String>,
    parents: Vec<ArtifactId>,
    files: Vec<(String, String, Permission)>,
    renames: Vec<(String, String)>,
    tags: Vec<String>,
}

impl CommitSpec {
    /// New checkin by `user` at `time`.
    pub fn new(user: &str, time: DateTime<Utc>, comment: &str) -> Self {
        Self {
            user: user.to_string(),
            time,
            comment: comment.to_string(),
            branch: None,
            parents: Vec::new(),
            files: Vec::new(),
            renames: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Add a parent (the first one added is primary).
    pub fn parent(mut self, id: &ArtifactId) -> Self {
        self.parents.push(id.clone());
        self
    }

    /// Set the branch; defaults to the primary parent's branch, else `trunk`.
    pub fn branch(mut self, name: &str) -> Self {
        self.branch = Some(name.to_string());
        self
    }

    /// Add a regular file.
    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files
            .push((path.to_string(), content.to_string(), Permission::Regular));
        self
    }

    /// Add an executable file.
    pub fn executable(mut self, path: &str, content: &str) -> Self {
        self.files
            .push((path.to_string(), content.to_string(), Permission::Executable));
        self
    }

    /// Record that `to` was renamed from `from` in this checkin.
    pub fn rename(mut self, from: &str, to: &str) -> Self {
        self.renames.push((from.to_string(), to.to_string()));
        self
    }

    /// Attach a tag.
    pub fn tag(mut self, name: &str) -> Self {
        self.tags.push(name.to_string());
        self
    }
}

/// Programmatic snapshot construction.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
    seq: u64,
}

impl SnapshotBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> String {
        self.seq += 1;
        self.seq.to_string()
    }

    /// Store file content, returning its id.
    pub fn blob(&mut self, content: &str) -> ArtifactId {
        let id = mint_id(&["blob", content]);
        self.snapshot
            .blobs
            .entry(id.clone())
            .or_insert_with(|| content.to_string());
        id
    }

    /// Add a checkin, returning its id.
    pub fn commit(&mut self, spec: CommitSpec) -> ArtifactId {
        let seq = self.next_seq();
        let id = mint_id(&["commit", &seq, &spec.user, &spec.comment]);
        let branch = spec.branch.or_else(|| {
            spec.parents.first().and_then(|p| {
                self.snapshot
                    .commits
                    .iter()
                    .find(|c| &c.id == p)
                    .and_then(|c| c.branch.clone())
            })
        });
        let mut files = Vec::with_capacity(spec.files.len());
        for (path, content, perm) in &spec.files {
            let prior_name = spec
                .renames
                .iter()
                .find(|(_, to)| to == path)
                .map(|(from, _)| from.clone());
            files.push(FileCard {
                path: path.clone(),
                id: self.blob(content),
                perm: *perm,
                prior_name,
            });
        }
        self.snapshot.commits.push(CommitRecord {
            id: id.clone(),
            parents: spec.parents,
            user: spec.user,
            time: spec.time,
            branch: Some(branch.unwrap_or_else(|| "trunk".to_string())),
            comment: spec.comment,
            tags: spec.tags,
            files,
        });
        id
    }

    /// Add a wiki page version.
    pub fn wiki(
        &mut self,
        title: &str,
        user: &str,
        time: DateTime<Utc>,
        content: &str,
        parent: Option<&ArtifactId>,
    ) -> ArtifactId {
        let seq = self.next_seq();
        let id = mint_id(&["wiki", &seq, title]);
        self.snapshot.artifacts.push(ArtifactRecord::Wiki(WikiPage {
            id: id.clone(),
            title: title.to_string(),
            user: user.to_string(),
            time,
            content: content.to_string(),
            parent: parent.cloned(),
            mimetype: None,
        }));
        id
    }

    /// Add a ticket change.
    pub fn ticket(
        &mut self,
        ticket: &str,
        user: &str,
        time: DateTime<Utc>,
        fields: &[(&str, &str)],
    ) -> ArtifactId {
        let seq = self.next_seq();
        let id = mint_id(&["ticket", &seq, ticket]);
        self.snapshot
            .artifacts
            .push(ArtifactRecord::Ticket(TicketChange {
                id: id.clone(),
                ticket: ticket.to_string(),
                user: user.to_string(),
                time,
                fields: fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }));
        id
    }

    /// Add a tag control artifact.
    pub fn tag(
        &mut self,
        user: &str,
        time: DateTime<Utc>,
        target: &ArtifactId,
        cards: Vec<TagCard>,
    ) -> ArtifactId {
        let seq = self.next_seq();
        let id = mint_id(&["tag", &seq, target.as_str()]);
        self.snapshot.artifacts.push(ArtifactRecord::Tag(TagArtifact {
            id: id.clone(),
            user: user.to_string(),
            time,
            target: target.clone(),
            cards,
        }));
        id
    }

    /// Add a technote.
    pub fn technote(
        &mut self,
        user: &str,
        event_time: DateTime<Utc>,
        comment: &str,
        text: &str,
    ) -> ArtifactId {
        let seq = self.next_seq();
        let id = mint_id(&["technote", &seq, comment]);
        self.snapshot
            .artifacts
            .push(ArtifactRecord::Technote(Technote {
                id: id.clone(),
                user: user.to_string(),
                time: event_time,
                event_time,
                comment: comment.to_string(),
                text: text.to_string(),
            }));
        id
    }

    /// Set a branch's open/private state.
    pub fn branch_state(&mut self, name: &str, open: bool, private: bool) -> &mut Self {
        self.snapshot.branches.retain(|b| b.name != name);
        self.snapshot.branches.push(BranchRecord {
            name: name.to_string(),
            open,
            private,
        });
        self
    }

    /// Set the local checkout.
    pub fn checkout(&mut self, base: &ArtifactId, files: Vec<VFile>) -> &mut Self {
        self.snapshot.checkout = Some(Checkout {
            base: base.clone(),
            files,
        });
        self
    }

    /// The snapshot built so far, for serialization.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Index the snapshot.
    ///
    /// # Errors
    ///
    /// See [`SnapshotRepository::new`].
    pub fn build(self) -> Result<SnapshotRepository, RepoError> {
        SnapshotRepository::new(self.snapshot)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
