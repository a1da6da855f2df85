//! Diff text builder.
//!
//! The builder writes the whole diff once into a scratch stream and records
//! the byte offset of every output line in an offset table. Views then page
//! and search the text by seeking, without running the diff again. Changing
//! an option (context, whitespace, invert) rebuilds the text.
//!
//! Four kinds are supported:
//!
//! - checkin to checkin: a merge walk over the two path-sorted card lists
//! - local checkout against its base checkin
//! - blob to blob
//! - non-checkin artifacts (wiki, forum, ticket, tag, technote)

use crate::model::{ArtifactId, ArtifactType, RepoError};
use crate::repo::{split_lines, Artifact, FileCard, Repository, VFileState};
use chrono::{DateTime, Utc};
use similar::{Algorithm, DiffTag};
use std::collections::HashSet;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use tracing::debug;

/// Separator line written under each file header.
const DIVIDER: &str =
    "===================================================================";

/// What to diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffKind {
    /// A checkin against another (usually its parent). `from: None` diffs
    /// against the empty tree.
    Checkin {
        /// Older side.
        from: Option<ArtifactId>,
        /// Newer side.
        to: ArtifactId,
    },
    /// The local checkout against its base checkin.
    Local,
    /// Two file contents.
    Blobs {
        /// Older content.
        from: ArtifactId,
        /// Newer content.
        to: ArtifactId,
    },
    /// Wiki, forum, ticket, tag or technote artifact.
    NonCheckin(ArtifactId),
}

impl DiffKind {
    /// Kind to use for artifact `id`: checkins diff against their primary parent.
    ///
    /// # Errors
    ///
    /// Propagates the repository lookup failure.
    pub fn for_artifact(repo: &dyn Repository, id: &ArtifactId) -> Result<Self, RepoError> {
        Ok(match repo.artifact(id)? {
            Artifact::Checkin(m) => DiffKind::Checkin {
                from: m.parent().cloned(),
                to: id.clone(),
            },
            _ => DiffKind::NonCheckin(id.clone()),
        })
    }
}

/// Diff rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Unchanged lines shown around each change.
    pub context: usize,
    /// Compare lines with all whitespace removed.
    pub ignore_whitespace: bool,
    /// Swap the old and new sides.
    pub invert: bool,
    /// Show full text of added and removed files.
    pub verbose: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context: 5,
            ignore_whitespace: false,
            invert: false,
            verbose: false,
        }
    }
}

/// How a file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// New file.
    Added,
    /// File removed.
    Removed,
    /// Content changed.
    Modified,
    /// Moved, possibly with edits.
    Renamed {
        /// Old path.
        from: String,
    },
    /// Same content, different permission.
    ModeChanged,
}

impl FileChange {
    /// One-letter code used in the change summary.
    pub fn code(&self) -> char {
        match self {
            FileChange::Added => 'A',
            FileChange::Removed => 'D',
            FileChange::Modified => 'M',
            FileChange::Renamed { .. } => 'R',
            FileChange::ModeChanged => 'X',
        }
    }
}

/// Where one file's section starts in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSegment {
    /// Path on the new side.
    pub path: String,
    /// Kind of change.
    pub change: FileChange,
    /// Output line of the section header.
    pub start: usize,
}

/// Rendered diff: a seekable stream plus its line offset table.
#[derive(Debug)]
pub struct DiffText<S = Cursor<Vec<u8>>> {
    stream: S,
    offsets: Vec<u64>,
    end: u64,
    segments: Vec<FileSegment>,
}

impl<S: Read + Seek> DiffText<S> {
    /// Number of output lines.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether nothing was written.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Byte offset of line `k`.
    pub fn offset(&self, k: usize) -> Option<u64> {
        self.offsets.get(k).copied()
    }

    /// Line `k` without its newline.
    ///
    /// # Errors
    ///
    /// Returns the stream's seek or read failure.
    pub fn line(&mut self, k: usize) -> io::Result<Option<String>> {
        let Some(&start) = self.offsets.get(k) else {
            return Ok(None);
        };
        let end = self.offsets.get(k + 1).copied().unwrap_or(self.end);
        self.stream.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0; (end - start) as usize];
        self.stream.read_exact(&mut buf)?;
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    /// Up to `count` lines starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns the stream's seek or read failure.
    pub fn lines(&mut self, start: usize, count: usize) -> io::Result<Vec<String>> {
        let end = start.saturating_add(count).min(self.len());
        let mut out = Vec::with_capacity(end.saturating_sub(start));
        for k in start..end {
            if let Some(line) = self.line(k)? {
                out.push(line);
            }
        }
        Ok(out)
    }

    /// File sections in output order.
    pub fn segments(&self) -> &[FileSegment] {
        &self.segments
    }

    /// First segment starting after `line`.
    pub fn next_segment(&self, line: usize) -> Option<&FileSegment> {
        self.segments.iter().find(|s| s.start > line)
    }

    /// Last segment starting before `line`.
    pub fn prev_segment(&self, line: usize) -> Option<&FileSegment> {
        self.segments.iter().rev().find(|s| s.start < line)
    }

    /// The underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Line-recording writer over the scratch stream.
struct Writer<S> {
    stream: S,
    offsets: Vec<u64>,
    pos: u64,
    segments: Vec<FileSegment>,
}

impl<S: Write> Writer<S> {
    /// Write one output line. Embedded newlines start further lines, so
    /// every line stays in the offset table.
    fn line(&mut self, text: &str) -> io::Result<()> {
        for piece in text.split('\n') {
            self.offsets.push(self.pos);
            self.stream.write_all(piece.as_bytes())?;
            self.stream.write_all(b"\n")?;
            self.pos += piece.len() as u64 + 1;
        }
        Ok(())
    }

    /// Write `label` and a possibly multi-line value, continuation lines
    /// aligned under the first.
    fn field(&mut self, label: &str, value: &str) -> io::Result<()> {
        let mut lines = split_lines(value).into_iter();
        self.line(&format!("{label}{}", lines.next().unwrap_or_default()))?;
        let indent = " ".repeat(label.chars().count());
        for rest in lines {
            self.line(&format!("{indent}{rest}"))?;
        }
        Ok(())
    }

    fn blank(&mut self) -> io::Result<()> {
        self.line("")
    }

    /// Write possibly multi-line text, one output line per source line.
    fn text(&mut self, prefix: &str, text: &str) -> io::Result<()> {
        for line in split_lines(text) {
            self.line(&format!("{prefix}{line}"))?;
        }
        Ok(())
    }

    fn segment(&mut self, path: &str, change: FileChange) {
        self.segments.push(FileSegment {
            path: path.to_string(),
            change,
            start: self.offsets.len(),
        });
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn is_binary(bytes: &[u8]) -> bool {
    bytes.contains(&0)
}

fn unified_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

/// One paired change between two card lists.
#[derive(Debug)]
struct CardChange<'a> {
    old: Option<&'a FileCard>,
    new: Option<&'a FileCard>,
    change: FileChange,
}

impl CardChange<'_> {
    fn path(&self) -> &str {
        self.new
            .or(self.old)
            .map(|c| c.path.as_str())
            .unwrap_or_default()
    }
}

fn find<'c>(cards: &'c [FileCard], path: &str) -> Option<&'c FileCard> {
    cards
        .binary_search_by(|c| c.path.as_str().cmp(path))
        .ok()
        .map(|i| &cards[i])
}

/// Merge-walk two path-sorted card lists into a change list.
///
/// A card's `prior_name` describes a rename relative to the parent of the
/// checkin that carries it, so only the target side is consulted: `new` when
/// diffing forward, `old` when inverted.
fn pair_cards<'a>(
    old: &'a [FileCard],
    new: &'a [FileCard],
    inverted: bool,
) -> Vec<CardChange<'a>> {
    let mut changes = Vec::new();
    let mut paired_old: HashSet<&str> = HashSet::new();
    let mut paired_new: HashSet<&str> = HashSet::new();

    let (target, other) = if inverted { (old, new) } else { (new, old) };
    for card in target {
        let Some(prior) = card.prior_name.as_deref() else {
            continue;
        };
        // The prior path must be gone from the target and present on the other side.
        let (Some(counterpart), None) = (find(other, prior), find(target, prior)) else {
            continue;
        };
        let (o, n) = if inverted {
            (card, counterpart)
        } else {
            (counterpart, card)
        };
        paired_old.insert(o.path.as_str());
        paired_new.insert(n.path.as_str());
        changes.push(CardChange {
            old: Some(o),
            new: Some(n),
            change: FileChange::Renamed {
                from: o.path.clone(),
            },
        });
    }

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut old_iter = old
        .iter()
        .filter(|c| !paired_old.contains(c.path.as_str()))
        .peekable();
    let mut new_iter = new
        .iter()
        .filter(|c| !paired_new.contains(c.path.as_str()))
        .peekable();
    loop {
        match (old_iter.peek(), new_iter.peek()) {
            (Some(o), Some(n)) => match o.path.cmp(&n.path) {
                std::cmp::Ordering::Less => removed.extend(old_iter.next()),
                std::cmp::Ordering::Greater => added.extend(new_iter.next()),
                std::cmp::Ordering::Equal => {
                    let (o, n) = (*o, *n);
                    old_iter.next();
                    new_iter.next();
                    let change = if o.id != n.id {
                        Some(FileChange::Modified)
                    } else if o.perm != n.perm {
                        Some(FileChange::ModeChanged)
                    } else {
                        None
                    };
                    if let Some(change) = change {
                        changes.push(CardChange {
                            old: Some(o),
                            new: Some(n),
                            change,
                        });
                    }
                }
            },
            (Some(_), None) => removed.extend(old_iter.next()),
            (None, Some(_)) => added.extend(new_iter.next()),
            (None, None) => break,
        }
    }

    // Unrecorded renames: an add and a remove of identical content.
    let mut unpaired_removed: Vec<Option<&FileCard>> = removed.into_iter().map(Some).collect();
    for n in added {
        let matched = unpaired_removed
            .iter_mut()
            .find(|slot| slot.is_some_and(|o| o.id == n.id))
            .and_then(Option::take);
        changes.push(match matched {
            Some(o) => CardChange {
                old: Some(o),
                new: Some(n),
                change: FileChange::Renamed {
                    from: o.path.clone(),
                },
            },
            None => CardChange {
                old: None,
                new: Some(n),
                change: FileChange::Added,
            },
        });
    }
    changes.extend(unpaired_removed.into_iter().flatten().map(|o| CardChange {
        old: Some(o),
        new: None,
        change: FileChange::Removed,
    }));

    changes.sort_by(|a, b| a.path().cmp(b.path()));
    changes
}

/// Builds [`DiffText`] from repository content.
pub struct DiffBuilder<'a> {
    repo: &'a dyn Repository,
    options: DiffOptions,
}

impl<'a> DiffBuilder<'a> {
    /// Builder over `repo` with `options`.
    pub fn new(repo: &'a dyn Repository, options: DiffOptions) -> Self {
        Self { repo, options }
    }

    /// Render `kind` into an in-memory stream.
    ///
    /// # Errors
    ///
    /// Returns the repository failure (missing artifact, no checkout, ...).
    pub fn build(&self, kind: &DiffKind) -> Result<DiffText, RepoError> {
        self.build_into(kind, Cursor::new(Vec::new()))
    }

    /// Render `kind` into `stream`.
    ///
    /// # Errors
    ///
    /// Returns the repository failure or the stream's write failure.
    pub fn build_into<S: Read + Write + Seek>(
        &self,
        kind: &DiffKind,
        mut stream: S,
    ) -> Result<DiffText<S>, RepoError> {
        stream.seek(SeekFrom::Start(0))?;
        let mut w = Writer {
            stream,
            offsets: Vec::new(),
            pos: 0,
            segments: Vec::new(),
        };
        match kind {
            DiffKind::Checkin { from, to } => self.checkin(&mut w, from.as_ref(), to)?,
            DiffKind::Local => self.local(&mut w)?,
            DiffKind::Blobs { from, to } => self.blobs(&mut w, from, to)?,
            DiffKind::NonCheckin(id) => self.artifact(&mut w, id)?,
        }
        w.stream.flush()?;
        debug!(
            lines = w.offsets.len(),
            files = w.segments.len(),
            "diff rendered"
        );
        Ok(DiffText {
            stream: w.stream,
            offsets: w.offsets,
            end: w.pos,
            segments: w.segments,
        })
    }

    fn content(&self, card: Option<&FileCard>) -> Result<Vec<u8>, RepoError> {
        match card {
            Some(card) => self.repo.blob(&card.id),
            None => Ok(Vec::new()),
        }
    }

    fn checkin<S: Write>(
        &self,
        w: &mut Writer<S>,
        from: Option<&ArtifactId>,
        to: &ArtifactId,
    ) -> Result<(), RepoError> {
        let target = self.repo.manifest(to)?;
        let base = from.map(|id| self.repo.manifest(id)).transpose()?;

        w.line(&format!("Checkin:  {}", target.id))?;
        w.line(&format!(
            "Parent:   {}",
            base.as_ref()
                .map_or_else(|| "(root)".to_string(), |m| m.id.to_string())
        ))?;
        w.field("User:     ", &target.user)?;
        w.line(&format!("Date:     {}", format_time(&target.timestamp)))?;
        if let Some(branch) = &target.branch {
            w.field("Branch:   ", branch)?;
        }
        if !target.tags.is_empty() {
            w.field("Tags:     ", &target.tags.join(", "))?;
        }
        if self.options.invert {
            w.line("Inverted: showing the parent relative to this checkin")?;
        }
        w.blank()?;
        w.text("    ", &target.comment)?;
        w.blank()?;

        let empty: Vec<FileCard> = Vec::new();
        let base_cards: &Vec<FileCard> = base.as_ref().map_or(&empty, |m| &m.cards);
        let (old, new) = if self.options.invert {
            (&target.cards, base_cards)
        } else {
            (base_cards, &target.cards)
        };
        let changes = pair_cards(old, new, self.options.invert);
        self.write_changes(w, &changes)
    }

    fn write_changes<S: Write>(
        &self,
        w: &mut Writer<S>,
        changes: &[CardChange<'_>],
    ) -> Result<(), RepoError> {
        let noun = if changes.len() == 1 { "file" } else { "files" };
        w.line(&format!("{} {noun} changed", changes.len()))?;
        for change in changes {
            match &change.change {
                FileChange::Renamed { from } => w.line(&format!(
                    "  {} {from} -> {}",
                    change.change.code(),
                    change.path()
                ))?,
                other => w.line(&format!("  {} {}", other.code(), change.path()))?,
            }
        }

        for change in changes {
            w.blank()?;
            let old = self.content(change.old)?;
            let new = self.content(change.new)?;
            let old_name = change.old.map_or("/dev/null", |c| c.path.as_str());
            let new_name = change.new.map_or("/dev/null", |c| c.path.as_str());
            self.file_section(w, change.path(), &change.change, old_name, new_name, &old, &new)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn file_section<S: Write>(
        &self,
        w: &mut Writer<S>,
        path: &str,
        change: &FileChange,
        old_name: &str,
        new_name: &str,
        old: &[u8],
        new: &[u8],
    ) -> io::Result<()> {
        w.segment(path, change.clone());
        match change {
            FileChange::Added => w.line(&format!("ADDED    {path}"))?,
            FileChange::Removed => w.line(&format!("DELETED  {path}"))?,
            FileChange::Modified => w.line(&format!("CHANGED  {path}"))?,
            FileChange::Renamed { from } => w.line(&format!("RENAMED  {from} -> {path}"))?,
            FileChange::ModeChanged => w.line(&format!("MODE     {path}"))?,
        }
        w.line(DIVIDER)?;
        let show_body = match change {
            FileChange::Added | FileChange::Removed => self.options.verbose,
            FileChange::ModeChanged => false,
            FileChange::Modified | FileChange::Renamed { .. } => old != new,
        };
        if show_body {
            self.text_diff(w, old_name, new_name, old, new)?;
        }
        Ok(())
    }

    fn text_diff<S: Write>(
        &self,
        w: &mut Writer<S>,
        old_name: &str,
        new_name: &str,
        old: &[u8],
        new: &[u8],
    ) -> io::Result<()> {
        if is_binary(old) || is_binary(new) {
            return w.line("cannot compute difference between binary files");
        }
        let old_text = String::from_utf8_lossy(old);
        let new_text = String::from_utf8_lossy(new);
        let old_lines = split_lines(&old_text);
        let new_lines = split_lines(&new_text);

        let normalize = |line: &&str| -> String {
            if self.options.ignore_whitespace {
                line.split_whitespace().collect()
            } else {
                (*line).to_string()
            }
        };
        let a: Vec<String> = old_lines.iter().map(normalize).collect();
        let b: Vec<String> = new_lines.iter().map(normalize).collect();
        let ops = similar::capture_diff_slices(Algorithm::Myers, &a, &b);
        let groups = similar::group_diff_ops(ops, self.options.context);
        if groups.is_empty() {
            if old != new {
                w.line("(whitespace changes only)")?;
            }
            return Ok(());
        }

        w.line(&format!("--- {old_name}"))?;
        w.line(&format!("+++ {new_name}"))?;
        for group in groups {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };
            let old_start = first.old_range().start;
            let new_start = first.new_range().start;
            let old_len = last.old_range().end - old_start;
            let new_len = last.new_range().end - new_start;
            w.line(&format!(
                "@@ -{} +{} @@",
                unified_range(old_start, old_len),
                unified_range(new_start, new_len)
            ))?;
            for op in &group {
                let (tag, old_range, new_range) = op.as_tag_tuple();
                match tag {
                    DiffTag::Equal => {
                        for i in new_range {
                            w.line(&format!(" {}", new_lines[i]))?;
                        }
                    }
                    DiffTag::Delete => {
                        for i in old_range {
                            w.line(&format!("-{}", old_lines[i]))?;
                        }
                    }
                    DiffTag::Insert => {
                        for i in new_range {
                            w.line(&format!("+{}", new_lines[i]))?;
                        }
                    }
                    DiffTag::Replace => {
                        for i in old_range {
                            w.line(&format!("-{}", old_lines[i]))?;
                        }
                        for i in new_range {
                            w.line(&format!("+{}", new_lines[i]))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn local<S: Write>(&self, w: &mut Writer<S>) -> Result<(), RepoError> {
        let checkout = self.repo.checkout().ok_or(RepoError::NoCheckout)?;
        let base = self.repo.manifest(&checkout.base)?;
        w.line(&format!("Local changes against {}", base.id))?;
        w.blank()?;

        let mut files: Vec<_> = checkout
            .files
            .iter()
            .filter(|f| f.state != VFileState::Unchanged)
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        if files.is_empty() {
            w.line("no local changes")?;
            return Ok(());
        }

        let noun = if files.len() == 1 { "file" } else { "files" };
        w.line(&format!("{} {noun} changed", files.len()))?;
        let mut sections = Vec::with_capacity(files.len());
        for file in files {
            let on_disk = file.content.as_deref().unwrap_or_default().as_bytes().to_vec();
            let (change, stored_path) = match &file.state {
                VFileState::Edited | VFileState::Unchanged => {
                    (FileChange::Modified, Some(file.path.as_str()))
                }
                VFileState::Added => (FileChange::Added, None),
                VFileState::Deleted | VFileState::Missing => {
                    (FileChange::Removed, Some(file.path.as_str()))
                }
                VFileState::Renamed { from } => (
                    FileChange::Renamed { from: from.clone() },
                    Some(from.as_str()),
                ),
            };
            let stored = match stored_path {
                Some(path) => match base.card(path) {
                    Some(card) => self.repo.blob(&card.id)?,
                    None => {
                        return Err(RepoError::PathNotFound {
                            path: path.to_string(),
                            commit: base.id.to_string(),
                        })
                    }
                },
                None => Vec::new(),
            };
            let new = match change {
                FileChange::Removed => Vec::new(),
                _ => on_disk,
            };
            w.line(&format!("  {} {}", change.code(), file.path))?;
            sections.push((file.path.as_str(), stored_path, change, stored, new));
        }

        for (path, stored_path, change, stored, new) in sections {
            w.blank()?;
            let (old, new) = if self.options.invert {
                (new, stored)
            } else {
                (stored, new)
            };
            let old_name = stored_path.unwrap_or("/dev/null");
            self.file_section(w, path, &change, old_name, path, &old, &new)?;
        }
        Ok(())
    }

    fn blobs<S: Write>(
        &self,
        w: &mut Writer<S>,
        from: &ArtifactId,
        to: &ArtifactId,
    ) -> Result<(), RepoError> {
        let (from, to) = if self.options.invert {
            (to, from)
        } else {
            (from, to)
        };
        let old = self.repo.blob(from)?;
        let new = self.repo.blob(to)?;
        let path = format!("{} -> {}", from.short(), to.short());
        w.segment(&path, FileChange::Modified);
        w.line(&format!("Blob {} -> {}", from, to))?;
        w.line(DIVIDER)?;
        if old == new {
            w.line("(identical)")?;
            return Ok(());
        }
        self.text_diff(w, from.short(), to.short(), &old, &new)?;
        Ok(())
    }

    fn artifact<S: Write>(&self, w: &mut Writer<S>, id: &ArtifactId) -> Result<(), RepoError> {
        let artifact = self.repo.artifact(id)?;
        let label = match artifact.kind() {
            ArtifactType::Forum => "Forum post",
            _ => "Wiki page",
        };
        match artifact {
            Artifact::Checkin(m) => self.checkin(w, m.parent(), id),
            Artifact::Wiki(page) | Artifact::Forum(page) => {
                w.field(&format!("{label}: "), &page.title)?;
                w.line(&format!("Artifact: {}", page.id))?;
                w.field("User:     ", &page.user)?;
                w.line(&format!("Date:     {}", format_time(&page.time)))?;
                w.blank()?;
                let previous = match &page.parent {
                    Some(parent) => match self.repo.artifact(parent)? {
                        Artifact::Wiki(p) | Artifact::Forum(p) => p.content,
                        _ => String::new(),
                    },
                    None => String::new(),
                };
                let (old, new) = if self.options.invert {
                    (page.content.as_str(), previous.as_str())
                } else {
                    (previous.as_str(), page.content.as_str())
                };
                w.segment(&page.title, FileChange::Modified);
                self.text_diff(w, "previous", &page.title, old.as_bytes(), new.as_bytes())?;
                Ok(())
            }
            Artifact::Ticket(change) => {
                w.field("Ticket:   ", &change.ticket)?;
                w.line(&format!("Change:   {}", change.id))?;
                w.field("User:     ", &change.user)?;
                w.line(&format!("Date:     {}", format_time(&change.time)))?;
                w.blank()?;
                w.line("Fields changed:")?;
                for (field, value) in &change.fields {
                    let mut lines = split_lines(value).into_iter();
                    w.line(&format!("  {field}: {}", lines.next().unwrap_or_default()))?;
                    for rest in lines {
                        w.line(&format!("    {rest}"))?;
                    }
                }
                Ok(())
            }
            Artifact::Tag(tag) => {
                w.line(&format!("Tag change: {}", tag.id))?;
                w.line(&format!("Target:   {}", tag.target))?;
                w.field("User:     ", &tag.user)?;
                w.line(&format!("Date:     {}", format_time(&tag.time)))?;
                w.blank()?;
                for card in &tag.cards {
                    match &card.value {
                        Some(value) => {
                            w.field(&format!("  {}{}=", card.op.symbol(), card.name), value)?
                        }
                        None => w.line(&format!("  {}{}", card.op.symbol(), card.name))?,
                    }
                }
                Ok(())
            }
            Artifact::Technote(note) => {
                w.line(&format!("Technote: {}", note.id))?;
                w.field("User:     ", &note.user)?;
                w.line(&format!("Event:    {}", format_time(&note.event_time)))?;
                w.blank()?;
                w.text("    ", &note.comment)?;
                w.blank()?;
                w.text("", &note.text)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
