//! Utility modules.

pub mod command;
pub mod git;
