//! Shared utility functions.
//!
//! - `html`: escaping for the picker page
//! - `sanitize`: output file name cleanup

mod html;
mod sanitize;

pub use html::html_escape;
pub use sanitize::{sanitize_output_name, DEFAULT_OUTPUT_NAME};
