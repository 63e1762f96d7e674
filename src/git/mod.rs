//! Git integration: staged diff retrieval.

pub mod diff;

pub use diff::{DiffSource, GitDiff, check_git_installed};

#[cfg(test)]
pub use diff::MockDiffSource;
