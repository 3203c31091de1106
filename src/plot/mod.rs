//! Plotting.
//!
//! - `ascii`: terminal plots for the CLI
//! - `svg`: vector plots rendered with Plotters
//! - `pdf`: scan plots written as PDF

pub mod ascii;
pub mod pdf;
pub mod svg;

pub use ascii::*;
pub use pdf::*;
pub use svg::*;
