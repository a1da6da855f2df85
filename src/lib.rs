//! repotui
//!
//! Terminal browser for repository history: timeline, diff, tree, blame and
//! branch views over a [`repo::Repository`].
//!
//! The crate follows a Pure Core / Impure Shell split. `model`, `content`,
//! `search` and `repo` are pure; `producer` runs background workers; `view`
//! owns the terminal.

pub mod config;
pub mod content;
pub mod logging;
pub mod model;
pub mod producer;
pub mod repo;
pub mod search;
pub mod view;

#[cfg(test)]
mod test_harness;
