//! Listing-page link resolution.
//!
//! Turns a listing page into absolute detail links (in first-seen order),
//! thumbnail candidates per detail link and pager links.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::config::SiteProfile;

/// Links found on one listing page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListingLinks {
    /// Candidate listing pages (pager or `rel=next` anchors).
    pub next_pages: Vec<String>,
    /// Record detail links, deduplicated, in first-seen order.
    pub detail_links: Vec<String>,
    /// Thumbnail found inside an anchor, keyed by detail link.
    pub thumbnails: HashMap<String, String>,
}

impl ListingLinks {
    pub fn is_empty(&self) -> bool {
        self.detail_links.is_empty()
    }

    pub fn thumbnail_for(&self, detail_url: &str) -> Option<&str> {
        self.thumbnails.get(detail_url).map(String::as_str)
    }
}

/// Resolve an href against the page URL, skipping non-navigational links.
pub fn absolutize(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    let lowered = href.to_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
    {
        return None;
    }
    base.join(href).ok()
}

/// Listing-page parser for one site profile.
///
/// The pager regex and listing selectors are compiled once at construction.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    profile: SiteProfile,
    pager: Regex,
    listing_selectors: Vec<Selector>,
}

impl LinkResolver {
    pub fn new(profile: &SiteProfile) -> Self {
        let listing_selectors = profile
            .listing_selectors
            .iter()
            .filter_map(|s| match Selector::parse(s) {
                Ok(selector) => Some(selector),
                Err(_) => {
                    tracing::warn!("Invalid listing selector {:?}", s);
                    None
                }
            })
            .collect();

        Self {
            profile: profile.clone(),
            pager: profile.pager_regex(),
            listing_selectors,
        }
    }

    /// Extract detail links, thumbnails and pager links from a listing page.
    pub fn resolve_listing(&self, html: &str, base_url: &Url) -> ListingLinks {
        let document = Html::parse_document(html);
        let mut links = ListingLinks::default();
        let mut seen: HashSet<String> = HashSet::new();

        for selector in &self.listing_selectors {
            for anchor in document.select(selector) {
                let Some(mut url) = anchor
                    .value()
                    .attr("href")
                    .and_then(|href| absolutize(base_url, href))
                else {
                    continue;
                };
                url.set_fragment(None);
                if !self.profile.accepts_detail(&url) {
                    continue;
                }

                let detail = url.to_string();
                if let Some(thumb) = anchor_thumbnail(anchor, base_url) {
                    links.thumbnails.insert(detail.clone(), thumb);
                }
                if seen.insert(detail.clone()) {
                    links.detail_links.push(detail);
                }
            }
        }

        links.next_pages = self.pager_links(&document, base_url);
        links
    }

    /// Highest page number referenced by pager anchors (at least 1).
    pub fn detect_max_page(&self, html: &str) -> u32 {
        let document = Html::parse_document(html);
        let Ok(anchors) = Selector::parse("a[href]") else {
            return 1;
        };

        document
            .select(&anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| self.pager.captures(href))
            .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()))
            .fold(1, u32::max)
    }

    fn pager_links(&self, document: &Html, base_url: &Url) -> Vec<String> {
        let Ok(anchors) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let mut seen = HashSet::new();

        document
            .select(&anchors)
            .filter(|a| {
                let href = a.value().attr("href").unwrap_or_default();
                let rel = a.value().attr("rel").unwrap_or_default();
                self.pager.is_match(href) || rel.split_whitespace().any(|r| r == "next")
            })
            .filter_map(|a| a.value().attr("href").and_then(|h| absolutize(base_url, h)))
            .map(|u| u.to_string())
            .filter(|u| seen.insert(u.clone()))
            .collect()
    }
}

/// Absolute `src` of the first image nested inside an anchor.
fn anchor_thumbnail(anchor: ElementRef<'_>, base_url: &Url) -> Option<String> {
    let img = Selector::parse("img").ok()?;
    anchor
        .select(&img)
        .next()
        .and_then(|el| el.value().attr("src"))
        .filter(|src| !src.trim().is_empty())
        .and_then(|src| base_url.join(src.trim()).ok())
        .map(|u| u.to_string())
}
