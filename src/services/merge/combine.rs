//! File combination backends.
//!
//! Combination is delegated to external PDF tools; the pipeline tries a
//! primary combiner and then a fallback.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum CombineError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Combines an ordered list of local files into one output file.
#[async_trait]
pub trait Combiner: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Write the concatenation of `inputs` (in order) to `output`.
    async fn combine(&self, inputs: &[PathBuf], output: &Path) -> Result<(), CombineError>;
}

/// Run a tool and map spawn/exit failures to `CombineError`.
async fn run_tool(tool: &str, command: &mut Command) -> Result<(), CombineError> {
    if which::which(tool).is_err() {
        return Err(CombineError::ToolNotFound(tool.to_string()));
    }

    match command.output().await {
        Ok(Output { status, .. }) if status.success() => Ok(()),
        Ok(output) => Err(CombineError::Failed {
            tool: tool.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(CombineError::ToolNotFound(tool.to_string()))
        }
        Err(e) => Err(CombineError::Io(e)),
    }
}

/// `pdfunite in1.pdf in2.pdf ... out.pdf` (poppler-utils).
#[derive(Debug, Clone, Default)]
pub struct PdfUniteCombiner;

#[async_trait]
impl Combiner for PdfUniteCombiner {
    fn name(&self) -> &str {
        "pdfunite"
    }

    async fn combine(&self, inputs: &[PathBuf], output: &Path) -> Result<(), CombineError> {
        let mut command = Command::new("pdfunite");
        command.args(inputs).arg(output);
        run_tool("pdfunite", &mut command).await
    }
}

/// `qpdf --empty --pages in1.pdf in2.pdf -- out.pdf`.
///
/// Builds the output page by page instead of merging document catalogs,
/// which copes with inputs pdfunite rejects.
#[derive(Debug, Clone, Default)]
pub struct QpdfCombiner;

#[async_trait]
impl Combiner for QpdfCombiner {
    fn name(&self) -> &str {
        "qpdf"
    }

    async fn combine(&self, inputs: &[PathBuf], output: &Path) -> Result<(), CombineError> {
        let mut command = Command::new("qpdf");
        command
            .arg("--empty")
            .arg("--pages")
            .args(inputs)
            .arg("--")
            .arg(output);
        run_tool("qpdf", &mut command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MissingTool;

    #[async_trait]
    impl Combiner for MissingTool {
        fn name(&self) -> &str {
            "missing"
        }

        async fn combine(&self, _inputs: &[PathBuf], _output: &Path) -> Result<(), CombineError> {
            let mut command = Command::new("harvest-no-such-tool");
            run_tool("harvest-no-such-tool", &mut command).await
        }
    }

    #[tokio::test]
    async fn test_missing_tool_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = MissingTool
            .combine(&[], &dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, CombineError::ToolNotFound(tool) if tool == "harvest-no-such-tool"));
    }
}
