//! Branch list loader.

use crate::model::{BranchEntry, BranchSort, RepoError};
use crate::repo::{BranchFilter, Repository};
use std::cmp::Reverse;

/// Load the branches matching `filter`, sorted by `sort`.
///
/// # Errors
///
/// Propagates the repository failure.
pub fn load_branches(
    repo: &dyn Repository,
    filter: &BranchFilter,
    sort: BranchSort,
) -> Result<Vec<BranchEntry>, RepoError> {
    let mut entries: Vec<BranchEntry> = repo
        .branches(filter)?
        .into_iter()
        .map(|row| BranchEntry {
            name: row.name,
            tip: row.tip,
            open: row.open,
            private: row.private,
            current: row.current,
            last_activity: row.last_activity,
        })
        .collect();
    sort_branches(&mut entries, sort);
    Ok(entries)
}

/// Sort in place; ties always fall back to the name.
pub fn sort_branches(entries: &mut [BranchEntry], sort: BranchSort) {
    match sort {
        BranchSort::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),
        BranchSort::MostRecent => {
            entries.sort_by(|a, b| {
                Reverse(a.last_activity)
                    .cmp(&Reverse(b.last_activity))
                    .then_with(|| a.name.cmp(&b.name))
            });
        }
        BranchSort::State => {
            entries.sort_by(|a, b| b.open.cmp(&a.open).then_with(|| a.name.cmp(&b.name)));
        }
    }
}
