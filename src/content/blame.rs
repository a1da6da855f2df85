//! Blame line builder.

use crate::model::{ArtifactId, BlameLine, RepoError, SHORT_ID_LEN};
use crate::repo::{split_lines, Repository};
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthChar;

/// Width of the user column.
const USER_WIDTH: usize = 10;

/// The file being blamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameSource {
    /// Path in the repository.
    pub path: String,
    /// Version being blamed.
    pub commit: ArtifactId,
    /// File lines.
    pub lines: Vec<String>,
}

/// Load `path` as of `commit`.
///
/// # Errors
///
/// `RepoError::PathNotFound` when the checkin has no such file.
pub fn load_blame_source(
    repo: &dyn Repository,
    path: &str,
    commit: &ArtifactId,
) -> Result<BlameSource, RepoError> {
    let manifest = repo.manifest(commit)?;
    let card = manifest
        .card(path)
        .ok_or_else(|| RepoError::PathNotFound {
            path: path.to_string(),
            commit: commit.to_string(),
        })?;
    let bytes = repo.blob(&card.id)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(BlameSource {
        path: path.to_string(),
        commit: commit.clone(),
        lines: split_lines(&text).into_iter().map(str::to_string).collect(),
    })
}

/// Who and when, for an attributed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    /// Commit id.
    pub id: ArtifactId,
    /// Author.
    pub user: String,
    /// Commit time.
    pub timestamp: DateTime<Utc>,
}

fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str(&" ".repeat(width - used));
    out
}

/// One formatted blame row: id, user, date, line number, text.
///
/// Lines not yet attributed show dots in place of the metadata.
pub fn format_blame_line(
    attribution: &BlameLine,
    meta: Option<&CommitMeta>,
    number: usize,
    number_width: usize,
    text: &str,
) -> String {
    let prefix = match (&attribution.commit, meta) {
        (Some(_), Some(meta)) => format!(
            "{} {} {}",
            fit(meta.id.short(), SHORT_ID_LEN),
            fit(&meta.user, USER_WIDTH),
            meta.timestamp.format("%Y-%m-%d")
        ),
        (Some(id), None) => format!(
            "{} {} {}",
            fit(id.short(), SHORT_ID_LEN),
            fit("", USER_WIDTH),
            " ".repeat(10)
        ),
        (None, _) => format!(
            "{} {} {}",
            ".".repeat(SHORT_ID_LEN),
            fit("", USER_WIDTH),
            " ".repeat(10)
        ),
    };
    format!("{prefix} {number:>number_width$}: {text}")
}

/// Digits needed to print line numbers up to `count`.
pub fn number_width(count: usize) -> usize {
    count.max(1).to_string().len()
}
