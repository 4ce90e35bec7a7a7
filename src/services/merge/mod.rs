//! Fetch-and-merge pipeline.
//!
//! Downloads an ordered list of remote files into a scoped temporary
//! directory, following at most one HTML page to its file link, and
//! combines the successful downloads into one artifact.

mod combine;
mod types;

pub use combine::{CombineError, Combiner, PdfUniteCombiner, QpdfCombiner};
pub use types::{MergeOutcome, SkippedInput};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use scraper::Html;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::scrapers::extract::{find_file_link, FileLinkRule};
use crate::scrapers::http_client::{HttpClient, HttpResponse};
use crate::utils::sanitize_output_name;

/// Minimum number of inputs a merge needs.
pub const MIN_INPUTS: usize = 2;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("select at least 2 files (got {0})")]
    TooFewUrls(usize),

    #[error("not enough valid files to merge ({resolved} resolved, {} skipped)", .skipped.len())]
    InsufficientInputs {
        resolved: usize,
        skipped: Vec<SkippedInput>,
    },

    #[error("combining failed: {primary}; fallback: {fallback}")]
    Combination {
        primary: CombineError,
        fallback: CombineError,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Inputs skipped before the failure, if any were tracked.
    pub fn skipped(&self) -> &[SkippedInput] {
        match self {
            Self::InsufficientInputs { skipped, .. } => skipped,
            _ => &[],
        }
    }
}

/// Downloads remote files and merges them into the output directory.
#[derive(Clone)]
pub struct MergePipeline {
    client: HttpClient,
    output_dir: PathBuf,
    rule: FileLinkRule,
    primary: Arc<dyn Combiner>,
    fallback: Arc<dyn Combiner>,
}

impl MergePipeline {
    /// Pipeline producing PDFs with pdfunite, falling back to qpdf.
    pub fn new(client: HttpClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            rule: FileLinkRule::default(),
            primary: Arc::new(PdfUniteCombiner),
            fallback: Arc::new(QpdfCombiner),
        }
    }

    pub fn with_combiners(mut self, primary: Arc<dyn Combiner>, fallback: Arc<dyn Combiner>) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    pub fn with_rule(mut self, rule: FileLinkRule) -> Self {
        self.rule = rule;
        self
    }

    /// Rule used to recognise file responses and file links.
    pub fn rule(&self) -> &FileLinkRule {
        &self.rule
    }

    /// Download `urls` in order and combine them into `<output_name>.<ext>`.
    pub async fn run(&self, urls: &[String], output_name: &str) -> Result<MergeOutcome, MergeError> {
        let urls: Vec<&str> = urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.len() < MIN_INPUTS {
            return Err(MergeError::TooFewUrls(urls.len()));
        }

        let workdir = tempfile::Builder::new()
            .prefix("merge_dl_")
            .tempdir()
            .map_err(|e| MergeError::io(&std::env::temp_dir(), e))?;

        let mut local_files = Vec::new();
        let mut merged = Vec::new();
        let mut skipped = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            let dest = workdir
                .path()
                .join(format!("f_{}.{}", i, self.rule.extension));
            match self.download(url, &dest).await {
                Ok(bytes) => {
                    info!("Fetched {} ({} bytes)", url, bytes);
                    local_files.push(dest);
                    merged.push(url.to_string());
                }
                Err(reason) => {
                    warn!("Skipping {}: {}", url, reason);
                    skipped.push(SkippedInput::new(*url, reason));
                }
            }
        }

        if local_files.len() < MIN_INPUTS {
            return Err(MergeError::InsufficientInputs {
                resolved: local_files.len(),
                skipped,
            });
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| MergeError::io(&self.output_dir, e))?;
        let file_name = format!(
            "{}.{}",
            sanitize_output_name(output_name, &self.rule.extension),
            self.rule.extension
        );
        let output_path = self.output_dir.join(&file_name);

        self.combine(&local_files, &output_path).await?;
        info!(
            "Merged {} files into {} ({} skipped)",
            local_files.len(),
            output_path.display(),
            skipped.len()
        );

        Ok(MergeOutcome {
            output_path,
            file_name,
            merged,
            skipped,
        })
    }

    async fn combine(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MergeError> {
        let primary = match self.primary.combine(inputs, output).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        warn!(
            "{} failed ({}), retrying with {}",
            self.primary.name(),
            primary,
            self.fallback.name()
        );
        let _ = tokio::fs::remove_file(output).await;

        match self.fallback.combine(inputs, output).await {
            Ok(()) => Ok(()),
            Err(fallback) => {
                let _ = tokio::fs::remove_file(output).await;
                Err(MergeError::Combination { primary, fallback })
            }
        }
    }

    /// Resolve one URL to a local file. Errors are skip reasons.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, String> {
        let mut target = url.to_string();
        let mut followed_page = false;

        loop {
            let response = self
                .client
                .get(&target)
                .await
                .map_err(|e| format!("request failed: {}", e))?;
            if response.is_error() {
                return Err(format!("HTTP {} from {}", response.status.as_u16(), target));
            }

            if self.is_file_response(&response, &target) {
                return response
                    .save_to(dest)
                    .await
                    .map_err(|e| format!("download failed: {}", e));
            }

            let content_type = response.content_type().unwrap_or_default();
            if !is_html(&content_type) {
                return Err(format!("unsupported content type {:?}", content_type));
            }
            if followed_page {
                return Err(format!("{} is another HTML page", target));
            }

            let page_url = Url::parse(response.final_url())
                .map_err(|e| format!("invalid page URL: {}", e))?;
            let html = response
                .text()
                .await
                .map_err(|e| format!("read failed: {}", e))?;
            target = find_link_in_page(&html, &page_url, &self.rule)
                .ok_or_else(|| "no file link found in HTML page".to_string())?;
            followed_page = true;
        }
    }

    fn is_file_response(&self, response: &HttpResponse, url: &str) -> bool {
        let content_type = response.content_type().unwrap_or_default();
        content_type.contains(&self.rule.extension.to_lowercase())
            || content_type.starts_with("application/octet-stream")
            || self.rule.matches_extension(url)
    }
}

fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml")
}

fn find_link_in_page(html: &str, page_url: &Url, rule: &FileLinkRule) -> Option<String> {
    let document = Html::parse_document(html);
    find_file_link(&document, page_url, rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Failing(&'static str);

    #[async_trait]
    impl Combiner for Failing {
        fn name(&self) -> &str {
            self.0
        }

        async fn combine(&self, _inputs: &[PathBuf], output: &Path) -> Result<(), CombineError> {
            tokio::fs::write(output, b"partial").await?;
            Err(CombineError::Failed {
                tool: self.0.to_string(),
                message: "bad input".to_string(),
            })
        }
    }

    struct Concat;

    #[async_trait]
    impl Combiner for Concat {
        fn name(&self) -> &str {
            "concat"
        }

        async fn combine(&self, inputs: &[PathBuf], output: &Path) -> Result<(), CombineError> {
            let mut out = Vec::new();
            for input in inputs {
                out.extend(tokio::fs::read(input).await?);
            }
            tokio::fs::write(output, out).await?;
            Ok(())
        }
    }

    async fn serve_pdfs(server: &MockServer) {
        for name in ["a", "b"] {
            Mock::given(method("GET"))
                .and(path(format!("/{}.pdf", name)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_raw(format!("%PDF-{}", name), "application/pdf"),
                )
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn test_rejects_single_url() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = MergePipeline::new(HttpClient::new().unwrap(), dir.path());
        let err = pipeline
            .run(&["https://e.com/a.pdf".to_string(), " ".to_string()], "x")
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::TooFewUrls(1)));
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let server = MockServer::start().await;
        serve_pdfs(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let pipeline = MergePipeline::new(HttpClient::new().unwrap(), dir.path())
            .with_combiners(Arc::new(Failing("primary")), Arc::new(Concat));

        let urls = vec![
            format!("{}/a.pdf", server.uri()),
            format!("{}/b.pdf", server.uri()),
        ];
        let outcome = pipeline.run(&urls, "pair").await.unwrap();
        assert_eq!(std::fs::read(&outcome.output_path).unwrap(), b"%PDF-a%PDF-b");
    }

    #[tokio::test]
    async fn test_both_combiners_failing_leaves_no_output() {
        let server = MockServer::start().await;
        serve_pdfs(&server).await;
        let dir = tempfile::tempdir().unwrap();
        let pipeline = MergePipeline::new(HttpClient::new().unwrap(), dir.path())
            .with_combiners(Arc::new(Failing("one")), Arc::new(Failing("two")));

        let urls = vec![
            format!("{}/a.pdf", server.uri()),
            format!("{}/b.pdf", server.uri()),
        ];
        let err = pipeline.run(&urls, "pair").await.unwrap_err();
        assert!(matches!(err, MergeError::Combination { .. }));
        assert!(!dir.path().join("pair.pdf").exists());
    }

    #[tokio::test]
    async fn test_custom_rule_sets_file_type_and_link_keywords() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.epub"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("[a]", "application/epub+zip"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/book/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<a href="/b.pdf">Download</a><a href="/fetch?id=b">Grab ebook</a>"#,
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fetch"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("[b]", "application/octet-stream"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let rule = FileLinkRule {
            extension: "epub".to_string(),
            keywords: vec!["grab".to_string()],
        };
        let pipeline = MergePipeline::new(HttpClient::new().unwrap(), dir.path())
            .with_combiners(Arc::new(Concat), Arc::new(Concat))
            .with_rule(rule);

        let urls = vec![
            format!("{}/a.epub", server.uri()),
            format!("{}/book/", server.uri()),
        ];
        let outcome = pipeline.run(&urls, "shelf.epub").await.unwrap();
        assert_eq!(outcome.file_name, "shelf.epub");
        assert_eq!(std::fs::read(&outcome.output_path).unwrap(), b"[a][b]");
    }

    #[test]
    fn test_html_detection() {
        assert!(is_html("text/html; charset=utf-8"));
        assert!(!is_html("application/pdf"));
    }
}
