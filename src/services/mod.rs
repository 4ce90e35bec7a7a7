//! Service layer.
//!
//! Domain logic shared by the CLI and the web server.

pub mod merge;

pub use merge::{MergeError, MergeOutcome, MergePipeline, SkippedInput};
