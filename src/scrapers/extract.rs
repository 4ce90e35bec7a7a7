//! Record extraction from detail pages.
//!
//! Each field is produced by an ordered list of strategies; the first
//! strategy yielding a non-empty value wins.

use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

use super::config::SiteProfile;
use super::http_client::{FetchError, HttpClient};
use super::links::absolutize;
use crate::models::Record;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid detail URL {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// How a downloadable file link is recognised among a page's anchors.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLinkRule {
    /// Extension without the dot, e.g. `pdf`.
    pub extension: String,
    /// Anchor-text keywords accepted when no extension match exists.
    pub keywords: Vec<String>,
}

impl Default for FileLinkRule {
    fn default() -> Self {
        Self {
            extension: "pdf".to_string(),
            keywords: vec!["download".to_string(), "pdf".to_string()],
        }
    }
}

impl From<&SiteProfile> for FileLinkRule {
    fn from(profile: &SiteProfile) -> Self {
        Self {
            extension: profile.file_extension.clone(),
            keywords: profile.download_keywords.clone(),
        }
    }
}

impl FileLinkRule {
    pub fn matches_extension(&self, url: &str) -> bool {
        let suffix = format!(".{}", self.extension.to_lowercase());
        let lowered = url.to_lowercase();
        lowered
            .split(['?', '#'])
            .next()
            .is_some_and(|p| p.ends_with(&suffix))
    }

    fn matches_text(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
    }
}

/// Find the downloadable file link on a page.
///
/// An anchor whose href carries the file extension wins over one whose
/// text merely contains a download keyword; ties go to document order.
pub fn find_file_link(document: &Html, base: &Url, rule: &FileLinkRule) -> Option<String> {
    let anchors = Selector::parse("a[href]").ok()?;
    let mut keyword_match = None;

    for anchor in document.select(&anchors) {
        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| absolutize(base, href))
        else {
            continue;
        };
        if rule.matches_extension(url.as_str()) {
            return Some(url.to_string());
        }
        if keyword_match.is_none() && rule.matches_text(&element_text(anchor)) {
            keyword_match = Some(url.to_string());
        }
    }

    keyword_match
}

/// Title derived from the last URL path segment.
pub fn title_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let stem = match decoded.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 4 => stem.to_string(),
        _ => decoded,
    };
    collapse_whitespace(&stem.replace(['-', '_'], " "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Per-page inputs shared by strategies.
struct Page<'a> {
    document: Html,
    url: &'a Url,
    profile: &'a SiteProfile,
}

type Strategy = fn(&Page<'_>) -> Option<String>;

const TITLE_STRATEGIES: &[Strategy] = &[title_from_selectors, title_from_page_url];
const THUMBNAIL_STRATEGIES: &[Strategy] = &[open_graph_image, first_content_image];
const CATEGORY_STRATEGIES: &[Strategy] = &[labelled_block, emphasised_label, ranked_taxonomy_link];

fn first_of(strategies: &[Strategy], page: &Page<'_>) -> String {
    strategies
        .iter()
        .find_map(|strategy| strategy(page))
        .unwrap_or_default()
}

fn select_first_text(document: &Html, selectors: &[String]) -> Option<String> {
    selectors.iter().find_map(|s| {
        let selector = Selector::parse(s).ok()?;
        document
            .select(&selector)
            .map(element_text)
            .find(|t| !t.is_empty())
    })
}

fn title_from_selectors(page: &Page<'_>) -> Option<String> {
    select_first_text(&page.document, &page.profile.title_selectors)
}

fn title_from_page_url(page: &Page<'_>) -> Option<String> {
    non_empty(title_from_url(page.url.as_str()))
}

fn open_graph_image(page: &Page<'_>) -> Option<String> {
    let selector = Selector::parse(r#"meta[property="og:image"]"#).ok()?;
    page.document
        .select(&selector)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .and_then(|c| page.url.join(c).ok())
        .map(|u| u.to_string())
}

fn first_content_image(page: &Page<'_>) -> Option<String> {
    page.profile.image_selectors.iter().find_map(|s| {
        let selector = Selector::parse(s).ok()?;
        page.document
            .select(&selector)
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .and_then(|src| page.url.join(src).ok())
            .map(|u| u.to_string())
    })
}

fn starts_with_label(text: &str) -> bool {
    text.get(..7)
        .is_some_and(|head| head.eq_ignore_ascii_case("subject"))
}

fn after_colon(text: &str) -> Option<String> {
    text.split_once(':')
        .map(|(_, rest)| collapse_whitespace(rest))
        .and_then(non_empty)
}

/// `<p>Subject: Math</p>` and similar block elements.
fn labelled_block(page: &Page<'_>) -> Option<String> {
    let selector = Selector::parse("p, li, dt, dd, td").ok()?;
    page.document
        .select(&selector)
        .map(element_text)
        .filter(|t| starts_with_label(t))
        .find_map(|t| after_colon(&t))
}

/// `<strong>Subject:</strong> Math` inside an arbitrary container.
fn emphasised_label(page: &Page<'_>) -> Option<String> {
    let selector = Selector::parse("strong, b, em").ok()?;
    page.document
        .select(&selector)
        .filter(|el| starts_with_label(&element_text(*el)))
        .find_map(|el| {
            let from_parent = el
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|parent| after_colon(&element_text(parent)));
            from_parent.or_else(|| next_sibling_text(el))
        })
}

fn next_sibling_text(el: ElementRef<'_>) -> Option<String> {
    el.next_siblings().find_map(|sibling| match sibling.value() {
        Node::Text(text) => non_empty(collapse_whitespace(text)),
        Node::Element(_) => ElementRef::wrap(sibling)
            .map(element_text)
            .and_then(non_empty),
        _ => None,
    })
}

/// Category/tag anchors; the first naming a known subject wins.
fn ranked_taxonomy_link(page: &Page<'_>) -> Option<String> {
    let selector = Selector::parse(
        r#"a[rel~="category"], a[rel~="tag"], a[href*="/category/"], a[href*="/tag/"]"#,
    )
    .ok()?;
    let candidates: Vec<String> = page
        .document
        .select(&selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    let keywords: Vec<String> = page
        .profile
        .subject_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .collect();

    candidates
        .iter()
        .find(|c| {
            let lowered = c.to_lowercase();
            keywords.iter().any(|k| lowered.contains(k))
        })
        .or_else(|| candidates.first())
        .cloned()
}

/// Builds records from detail pages using a site profile's heuristics.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    profile: SiteProfile,
    file_rule: FileLinkRule,
}

impl RecordExtractor {
    pub fn new(profile: SiteProfile) -> Self {
        let file_rule = FileLinkRule::from(&profile);
        Self { profile, file_rule }
    }

    /// A detail link that already is the file becomes a record without a fetch.
    pub fn direct_file_record(&self, detail_url: &str) -> Option<Record> {
        if !self.profile.is_file_url(detail_url) {
            return None;
        }
        Some(Record {
            title: title_from_url(detail_url),
            downloadable_url: detail_url.to_string(),
            source_url: detail_url.to_string(),
            ..Record::default()
        })
    }

    /// Build a record from an already-fetched detail page.
    ///
    /// Fields that no strategy can fill are left empty; callers decide
    /// whether the record is usable.
    pub fn extract(&self, html: &str, detail_url: &str) -> Result<Record, ExtractionError> {
        let url =
            Url::parse(detail_url).map_err(|_| ExtractionError::InvalidUrl(detail_url.to_string()))?;
        let page = Page {
            document: Html::parse_document(html),
            url: &url,
            profile: &self.profile,
        };

        Ok(Record {
            title: first_of(TITLE_STRATEGIES, &page),
            downloadable_url: find_file_link(&page.document, &url, &self.file_rule)
                .unwrap_or_default(),
            thumbnail_url: first_of(THUMBNAIL_STRATEGIES, &page),
            source_url: detail_url.to_string(),
            category: first_of(CATEGORY_STRATEGIES, &page),
        })
    }

    /// Fetch a detail page and extract its record.
    pub async fn fetch(
        &self,
        client: &HttpClient,
        detail_url: &str,
    ) -> Result<Record, ExtractionError> {
        if let Some(record) = self.direct_file_record(detail_url) {
            return Ok(record);
        }
        let html = client.get_text(detail_url).await?;
        self.extract(&html, detail_url)
    }
}
