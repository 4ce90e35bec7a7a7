//! Site profile configuration.
//!
//! A profile captures the site-specific heuristics of one listing site:
//! how listing pages are addressed, which anchors count as record links,
//! what the pager looks like and which file type is being harvested.
//! Profiles can be declared in TOML; two presets are built in.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Image and archive extensions never treated as record detail pages.
const MEDIA_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".zip"];

/// Generic `/page/N/` pager shape.
pub(crate) static GENERIC_PAGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/page/(\d+)/?").unwrap());

static PAGE_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/page/)(\d+)(/)").unwrap());

/// Site-specific crawl heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    /// Profile name (used in logs and config lookup).
    pub name: String,
    /// Site root, e.g. `https://www.example.com`.
    pub base_url: String,
    /// Path of the first listing page, e.g. `/all-downloads/`.
    pub listing_path: String,
    /// Regex matching pager hrefs; capture group 1 is the page number.
    pub pager_pattern: String,
    /// URL substrings that mark an anchor as a record detail link.
    /// When empty, any same-site non-media link is accepted.
    pub detail_patterns: Vec<String>,
    /// Selectors for anchors considered on listing pages.
    pub listing_selectors: Vec<String>,
    /// Selectors tried in order for the record title.
    pub title_selectors: Vec<String>,
    /// Selectors tried in order for the first content image.
    pub image_selectors: Vec<String>,
    /// Extension of the harvested file type, without the dot.
    pub file_extension: String,
    /// Anchor-text keywords that mark a download link.
    pub download_keywords: Vec<String>,
    /// Known subject names used to rank category anchors.
    pub subject_keywords: Vec<String>,
    /// User agent override for this site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            base_url: String::new(),
            listing_path: "/".to_string(),
            pager_pattern: r"/page/(\d+)/?".to_string(),
            detail_patterns: Vec::new(),
            listing_selectors: vec!["a[href]".to_string()],
            title_selectors: vec!["h1".to_string()],
            image_selectors: vec!["img".to_string()],
            file_extension: "pdf".to_string(),
            download_keywords: vec!["download".to_string(), "pdf".to_string()],
            subject_keywords: default_subject_keywords(),
            user_agent: None,
        }
    }
}

fn default_subject_keywords() -> Vec<String> {
    [
        "math",
        "reading",
        "writing",
        "phonics",
        "alphabet",
        "numbers",
        "counting",
        "shapes",
        "colors",
        "tracing",
        "sight words",
        "vocabulary",
        "science",
        "social studies",
        "english",
        "art",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl SiteProfile {
    /// "All downloads" listing site with a path whitelist.
    pub fn kiddoworksheets() -> Self {
        Self {
            name: "kiddoworksheets".to_string(),
            base_url: "https://www.kiddoworksheets.com".to_string(),
            listing_path: "/all-downloads/".to_string(),
            pager_pattern: r"/all-downloads/page/(\d+)/?".to_string(),
            detail_patterns: [
                "/worksheet/",
                "/worksheets/",
                "/find-",
                "/tracing-",
                "/sight-words/",
                "/vocabulary/",
                "/shapes/",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ..Self::default()
        }
    }

    /// Blog-style site paginated as `/page/N/` with post containers.
    pub fn worksheetfun() -> Self {
        Self {
            name: "worksheetfun".to_string(),
            base_url: "https://www.worksheetfun.com".to_string(),
            listing_path: "/".to_string(),
            listing_selectors: vec![
                "article a[href]".to_string(),
                r#"[id^="post-"] > a[href]"#.to_string(),
                ".entry-title a[href]".to_string(),
            ],
            title_selectors: vec!["h1.entry-title".to_string(), "title".to_string()],
            image_selectors: vec!["article img".to_string(), ".entry-content img".to_string()],
            ..Self::default()
        }
    }

    /// Look up a built-in preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "kiddoworksheets" | "kiddo" => Some(Self::kiddoworksheets()),
            "worksheetfun" | "wsfun" => Some(Self::worksheetfun()),
            _ => None,
        }
    }

    /// Parsed site root.
    pub fn base(&self) -> Option<Url> {
        Url::parse(&self.base_url).ok()
    }

    /// Compiled pager regex; falls back to the generic `/page/N/` shape.
    pub fn pager_regex(&self) -> Regex {
        Regex::new(&self.pager_pattern).unwrap_or_else(|e| {
            tracing::warn!(
                "Invalid pager pattern {:?} for {}: {}",
                self.pager_pattern,
                self.name,
                e
            );
            GENERIC_PAGER.clone()
        })
    }

    /// Absolute URL of listing page `page` (1-based).
    pub fn listing_url(&self, page: u32) -> String {
        let root = self.base_url.trim_end_matches('/');
        let mut path = self.listing_path.clone();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if !path.ends_with('/') {
            path.push('/');
        }
        if page <= 1 {
            format!("{}{}", root, path)
        } else {
            format!("{}{}page/{}/", root, path, page)
        }
    }

    /// Whether an absolute URL is a record detail link for this site.
    pub fn accepts_detail(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let lowered = url.as_str().to_lowercase();

        if !self.detail_patterns.is_empty() {
            return self
                .detail_patterns
                .iter()
                .any(|p| lowered.contains(&p.to_lowercase()));
        }

        let base_host = self
            .base()
            .and_then(|b| b.host_str().map(str::to_string));
        let same_site = match (url.host_str(), base_host) {
            (Some(host), Some(base_host)) => host_matches(host, &base_host),
            _ => false,
        };
        let path = url.path().to_lowercase();
        same_site && !MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    /// Whether a URL points straight at a harvestable file.
    pub fn is_file_url(&self, url: &str) -> bool {
        let ext = format!(".{}", self.file_extension.to_lowercase());
        let lowered = url.to_lowercase();
        let path = lowered.split(['?', '#']).next().unwrap_or_default();
        path.ends_with(&ext)
    }
}

/// Hosts match when equal or when one is a `www.` variant of the other.
fn host_matches(host: &str, base_host: &str) -> bool {
    let strip = |h: &str| h.trim_start_matches("www.").to_lowercase();
    let (host, base_host) = (strip(host), strip(base_host));
    host == base_host || host.ends_with(&format!(".{}", base_host))
}

/// Normalize a collection (category) URL so it carries a `/page/<n>/` component.
pub fn normalize_collection_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }
    if !url.ends_with('/') {
        url.push('/');
    }
    if GENERIC_PAGER.is_match(&url) {
        return url;
    }
    format!("{}page/1/", url)
}

/// URL of page `page` within a collection.
pub fn collection_page_url(collection_url: &str, page: u32) -> String {
    let normalized = normalize_collection_url(collection_url);
    PAGE_COMPONENT
        .replace(&normalized, format!("${{1}}{}${{3}}", page).as_str())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url_first_and_later_pages() {
        let profile = SiteProfile::kiddoworksheets();
        assert_eq!(
            profile.listing_url(1),
            "https://www.kiddoworksheets.com/all-downloads/"
        );
        assert_eq!(
            profile.listing_url(4),
            "https://www.kiddoworksheets.com/all-downloads/page/4/"
        );

        let root = SiteProfile::worksheetfun();
        assert_eq!(root.listing_url(1), "https://www.worksheetfun.com/");
        assert_eq!(root.listing_url(2), "https://www.worksheetfun.com/page/2/");
    }

    #[test]
    fn test_whitelist_acceptance() {
        let profile = SiteProfile::kiddoworksheets();
        let ok = Url::parse("https://www.kiddoworksheets.com/worksheet/shapes-1/").unwrap();
        let no = Url::parse("https://www.kiddoworksheets.com/about/").unwrap();
        let mail = Url::parse("mailto:hi@kiddoworksheets.com").unwrap();
        assert!(profile.accepts_detail(&ok));
        assert!(!profile.accepts_detail(&no));
        assert!(!profile.accepts_detail(&mail));
    }

    #[test]
    fn test_same_site_acceptance_rejects_media_and_foreign_hosts() {
        let profile = SiteProfile::worksheetfun();
        let post = Url::parse("https://www.worksheetfun.com/2013/01/01/shapes/").unwrap();
        let bare = Url::parse("https://worksheetfun.com/2013/01/01/shapes/").unwrap();
        let image = Url::parse("https://www.worksheetfun.com/wp-content/a.PNG").unwrap();
        let other = Url::parse("https://elsewhere.com/post/").unwrap();
        assert!(profile.accepts_detail(&post));
        assert!(profile.accepts_detail(&bare));
        assert!(!profile.accepts_detail(&image));
        assert!(!profile.accepts_detail(&other));
    }

    #[test]
    fn test_is_file_url_ignores_query() {
        let profile = SiteProfile::default();
        assert!(profile.is_file_url("https://e.com/a/File.PDF"));
        assert!(profile.is_file_url("https://e.com/a/file.pdf?dl=1"));
        assert!(!profile.is_file_url("https://e.com/a/file.pdfx"));
    }

    #[test]
    fn test_collection_url_normalization() {
        assert_eq!(
            normalize_collection_url("https://e.com/category/math"),
            "https://e.com/category/math/page/1/"
        );
        assert_eq!(
            normalize_collection_url("https://e.com/category/math/page/3/"),
            "https://e.com/category/math/page/3/"
        );
        assert_eq!(
            collection_page_url("https://e.com/category/math/", 5),
            "https://e.com/category/math/page/5/"
        );
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(SiteProfile::preset("KIDDO").unwrap().name, "kiddoworksheets");
        assert_eq!(SiteProfile::preset("wsfun").unwrap().name, "worksheetfun");
        assert!(SiteProfile::preset("nope").is_none());
    }

    #[test]
    fn test_profile_from_toml_fills_defaults() {
        let profile: SiteProfile = toml::from_str(
            r#"
            name = "local"
            base_url = "http://127.0.0.1:9000"
            detail_patterns = ["/item/"]
            "#,
        )
        .unwrap();
        assert_eq!(profile.listing_path, "/");
        assert_eq!(profile.file_extension, "pdf");
        assert_eq!(profile.listing_selectors, vec!["a[href]"]);
    }
}
