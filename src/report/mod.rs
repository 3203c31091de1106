//! Reporting utilities: formatted terminal output for runs, scans and curves.

pub mod format;

pub use format::*;
