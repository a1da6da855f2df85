//! Domain model types (pure).
//!
//! All types in this module are pure data with smart constructors.

pub mod blame;
pub mod branch;
pub mod commit;
pub mod error;
pub mod identifiers;
pub mod key_action;

// Re-export for convenience
pub use blame::{BlameLine, BlameLines};
pub use branch::{BranchEntry, BranchSort};
pub use commit::{ArtifactType, CommitEntry, CommitQueue};
pub use error::{AnnotateError, AppError, Cancelled, RepoError, WorkerError};
pub use identifiers::{ArtifactId, InvalidArtifactId, SHORT_ID_LEN};
pub use key_action::KeyAction;
