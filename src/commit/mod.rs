//! AI-generated commit messages for the staged changes.

pub mod generator;

pub use generator::{GenerationResult, Generator, NO_STAGED_CHANGES};
