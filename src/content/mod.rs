//! In-memory content builders.
//!
//! Each builder turns repository data into the form a view renders:
//! timeline rows, directory trees, diff text with an offset table, blame
//! lines and the branch list. Builders are pure functions of the repository
//! and their options; none of them touch the terminal.

pub mod blame;
pub mod branch;
pub mod commit;
pub mod diff;
pub mod tree;

pub use blame::{format_blame_line, load_blame_source, number_width, BlameSource, CommitMeta};
pub use branch::{load_branches, sort_branches};
pub use commit::build_commit_entry;
pub use diff::{DiffBuilder, DiffKind, DiffOptions, DiffText, FileChange, FileSegment};
pub use tree::{NodeId, ParentFrame, RepositoryTree, TreeEntry, TreeObject, ROOT};
