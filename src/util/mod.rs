//! Utility modules: file helpers.

pub mod fs;
