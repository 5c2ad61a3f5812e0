//! File inspector: size and line count of the named file

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use asyncterm_core::CommandHandler;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const STARTUP_MESSAGE: &str = "🎯 File Processor Ready! Type file paths to analyze...";

/// Simulated I/O latency before each inspection
const INSPECT_DELAY: Duration = Duration::from_millis(100);

/// Inspects files relative to a root directory
pub struct FileInspector {
    root: Option<PathBuf>,
}

impl FileInspector {
    /// Inspect relative to `root`, or the working directory when `None`
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

/// Outcome of inspecting one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileReport {
    Found { size: u64, lines: usize },
    Missing,
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileReport::Found { size, lines } => write!(f, "{} bytes, {} lines", size, lines),
            FileReport::Missing => f.write_str("not found"),
        }
    }
}

#[async_trait]
impl CommandHandler for FileInspector {
    /// Canonical root directory
    type Resource = PathBuf;
    type Output = FileReport;

    async fn setup(&self) -> Result<Option<PathBuf>> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to read working directory")?,
        };
        let root = tokio::fs::canonicalize(&root)
            .await
            .with_context(|| format!("Invalid root directory {}", root.display()))?;
        if !tokio::fs::metadata(&root).await?.is_dir() {
            bail!("{} is not a directory", root.display());
        }
        tracing::info!("Inspecting files under {}", root.display());
        Ok(Some(root))
    }

    async fn handle(&self, line: &str, root: Option<&PathBuf>) -> Result<FileReport> {
        tokio::time::sleep(INSPECT_DELAY).await;
        let path = match root {
            Some(root) => root.join(line.trim()),
            None => PathBuf::from(line.trim()),
        };
        inspect(&path).await
    }

    fn format_output(&self, line: &str, report: &FileReport) -> String {
        let path = line.trim();
        match report {
            FileReport::Found { size, lines } => {
                format!("📄 {} | Size: {} bytes | Lines: {}", path, size, lines)
            }
            FileReport::Missing => format!("❌ File not found: {}", path),
        }
    }
}

async fn inspect(path: &Path) -> Result<FileReport> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(FileReport::Missing);
    }
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_dir() {
        bail!("{} is a directory", path.display());
    }
    let contents = tokio::fs::read(path).await?;
    Ok(FileReport::Found {
        size: metadata.len(),
        lines: count_lines(&contents),
    })
}

/// Count lines, including a final line without a trailing newline
fn count_lines(contents: &[u8]) -> usize {
    let newlines = contents.iter().filter(|&&b| b == b'\n').count();
    match contents.last() {
        Some(&last) if last != b'\n' => newlines + 1,
        _ => newlines,
    }
}
