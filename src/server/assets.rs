//! Static asset constants (CSS and JavaScript).

/// Stylesheet for the picker page.
pub const CSS: &str = include_str!("static/picker.css");

/// Selection and merge submission for the picker page.
pub const JS: &str = include_str!("static/picker.js");
