//! Configuration structures for the conversion pipeline.

use std::path::Path;

use image::codecs::png::{CompressionType, FilterType};
use serde::{Deserialize, Serialize};

use crate::error::{Pdf2PngError, Result};

/// Main configuration for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pdf2PngConfig {
    /// PNG output configuration.
    pub png: PngConfig,

    /// Raw image decoding configuration.
    pub decode: DecodeConfig,
}

/// PNG encoder configuration.
///
/// Both settings trade file size against speed; neither changes pixel values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PngConfig {
    /// Deflate effort.
    pub compression: PngCompression,

    /// Scanline filter strategy.
    pub filter: PngFilter,
}

impl Default for PngConfig {
    fn default() -> Self {
        Self {
            compression: PngCompression::Default,
            filter: PngFilter::Adaptive,
        }
    }
}

/// Deflate effort for PNG output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    Default,
    Best,
}

impl From<PngCompression> for CompressionType {
    fn from(value: PngCompression) -> Self {
        match value {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

/// PNG scanline filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngFilter {
    None,
    Sub,
    Up,
    Avg,
    Paeth,
    Adaptive,
}

impl From<PngFilter> for FilterType {
    fn from(value: PngFilter) -> Self {
        match value {
            PngFilter::None => FilterType::NoFilter,
            PngFilter::Sub => FilterType::Sub,
            PngFilter::Up => FilterType::Up,
            PngFilter::Avg => FilterType::Avg,
            PngFilter::Paeth => FilterType::Paeth,
            PngFilter::Adaptive => FilterType::Adaptive,
        }
    }
}

/// Raw image decoding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Honor `/Decode [1 0]` inversion on sampled images.
    pub apply_decode_array: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            apply_decode_array: true,
        }
    }
}

impl Pdf2PngConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Pdf2PngError::Config(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Pdf2PngError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
