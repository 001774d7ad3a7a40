//! External collaborators behind narrow trait surfaces.
//!
//! The engine's correctness depends only on these traits, never on a
//! concrete implementation: a mailbox to read from, a browser to drive, and
//! an optional summarizer for candidate decoration.

pub mod ai;
pub mod browser;
pub mod mailbox;
