//! raidvod CLI library
//!
//! Configuration, error reporting, progress display and the watch loop
//! behind the `raidvod` binary.

pub mod auth;
pub mod config;
pub mod error;
pub mod orchestrators;
pub mod paths;
pub mod progress;
pub mod terminal;
