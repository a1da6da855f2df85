//! Per-line blame attribution.

use crate::model::ArtifactId;

/// Attribution of one source line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlameLine {
    /// Commit the line is attributed to, once known.
    pub commit: Option<ArtifactId>,
}

impl BlameLine {
    /// Whether an attribution has been recorded.
    pub fn is_annotated(&self) -> bool {
        self.commit.is_some()
    }
}

/// Attribution array sized to a file's line count.
///
/// Lines only ever move from unset to set; a second attribution for the same
/// line is ignored.
#[derive(Debug, Clone, Default)]
pub struct BlameLines {
    lines: Vec<BlameLine>,
    annotated: usize,
}

impl BlameLines {
    /// `count` unannotated lines.
    pub fn new(count: usize) -> Self {
        Self {
            lines: vec![BlameLine::default(); count],
            annotated: 0,
        }
    }

    /// Record `commit` for `line` (0-based). Returns `true` if the line changed.
    pub fn annotate(&mut self, line: usize, commit: ArtifactId) -> bool {
        match self.lines.get_mut(line) {
            Some(slot) if slot.commit.is_none() => {
                slot.commit = Some(commit);
                self.annotated += 1;
                true
            }
            _ => false,
        }
    }

    /// Attribution for `line`.
    pub fn get(&self, line: usize) -> Option<&BlameLine> {
        self.lines.get(line)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the file has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of annotated lines.
    pub fn annotated(&self) -> usize {
        self.annotated
    }

    /// Whether every line is attributed.
    pub fn is_complete(&self) -> bool {
        self.annotated == self.lines.len()
    }

    /// Iterate attributions in line order.
    pub fn iter(&self) -> impl Iterator<Item = &BlameLine> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ArtifactId {
        ArtifactId::new(s).unwrap()
    }

    #[test]
    fn annotate_is_idempotent() {
        let mut lines = BlameLines::new(2);
        assert!(lines.annotate(0, id("aa")));
        assert!(!lines.annotate(0, id("bb")), "second write must be ignored");
        assert_eq!(lines.get(0).and_then(|l| l.commit.clone()), Some(id("aa")));
        assert_eq!(lines.annotated(), 1);
    }

    #[test]
    fn out_of_range_line_is_ignored() {
        let mut lines = BlameLines::new(1);
        assert!(!lines.annotate(5, id("aa")));
        assert_eq!(lines.annotated(), 0);
    }

    #[test]
    fn complete_when_all_lines_set() {
        let mut lines = BlameLines::new(2);
        lines.annotate(1, id("aa"));
        assert!(!lines.is_complete());
        lines.annotate(0, id("aa"));
        assert!(lines.is_complete());
    }
}
