//! HTTP request handlers for the web server.

mod merge;
mod picker;
mod static_files;

pub use merge::{merge_files, MergeRequest};
pub use picker::{api_records, picker_page};
pub use static_files::{serve_css, serve_download, serve_js};
