//! Timeline record builder.

use crate::model::CommitEntry;
use crate::repo::HistoryRow;

/// Turn a history row into the queue entry at position `index`.
pub fn build_commit_entry(row: HistoryRow, index: usize) -> CommitEntry {
    CommitEntry {
        index,
        id: row.id,
        parent: row.parent,
        user: row.user,
        timestamp: row.timestamp,
        branch: row.branch,
        kind: row.kind,
        comment: row.comment,
        tags: row.tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactId, ArtifactType};
    use chrono::Utc;

    #[test]
    fn entry_keeps_row_fields_and_index() {
        let row = HistoryRow {
            id: ArtifactId::new("abcd").unwrap(),
            parent: Some(ArtifactId::new("1234").unwrap()),
            user: "alice".into(),
            timestamp: Utc::now(),
            branch: Some("trunk".into()),
            kind: ArtifactType::Checkin,
            comment: "fix\n\nlong body".into(),
            tags: vec!["v1".into()],
        };
        let entry = build_commit_entry(row.clone(), 7);
        assert_eq!(entry.index, 7);
        assert_eq!(entry.id, row.id);
        assert_eq!(entry.summary(), "fix");
        assert_eq!(entry.tags, vec!["v1".to_string()]);
    }
}
