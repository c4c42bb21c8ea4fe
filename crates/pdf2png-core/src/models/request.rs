//! Conversion request and output naming.

use std::path::{Path, PathBuf};

/// Input of a single conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Source PDF.
    pub source: PathBuf,

    /// Directory receiving the PNG files.
    pub output_dir: PathBuf,

    /// Filename stem shared by every output file.
    pub prefix: String,

    /// Replace output files that already exist.
    pub overwrite: bool,
}

impl ConversionRequest {
    /// Create a request whose prefix is the source file name without extension.
    pub fn new(source: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let prefix = default_prefix(&source);
        Self {
            source,
            output_dir: output_dir.into(),
            prefix,
            overwrite: false,
        }
    }

    /// Override the prefix. `None` or an empty string keeps the default.
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            self.prefix = prefix;
        }
        self
    }

    /// Allow replacing existing output files.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Destination of the PNG for a 1-based page number.
    pub fn output_path(&self, page: u32) -> PathBuf {
        self.output_dir.join(output_file_name(&self.prefix, page))
    }
}

/// `{prefix}_page_{page:03}.png`; pages past 999 simply widen.
pub fn output_file_name(prefix: &str, page: u32) -> String {
    format!("{prefix}_page_{page:03}.png")
}

fn default_prefix(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
