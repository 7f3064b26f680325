//! mcwire Codec Configuration
//!
//! Limits applied to untrusted input and the compression level used on output,
//! loaded from a `key = value` options file.

use std::fs;
use std::path::Path;

use mcwire_core::{CodecError, Result, MAX_FRAME_LENGTH, MAX_STRING_LENGTH, MAX_UNCOMPRESSED_LENGTH};
use mcwire_protocol::compression::DEFAULT_COMPRESSION_LEVEL;

/// Largest value a 32-bit varint length prefix can carry
const MAX_VARINT_LENGTH: usize = i32::MAX as usize;

/// Codec limits and compression settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Longest string accepted, in characters (from "max_string_length")
    pub max_string_length: usize,
    /// Largest frame length prefix accepted from a peer (from "max_frame_length")
    pub max_frame_length: usize,
    /// Largest declared uncompressed body size (from "max_uncompressed_length")
    pub max_uncompressed_length: usize,
    /// zlib level 0-9 for compressed frames (from "compression_level")
    pub compression_level: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_string_length: MAX_STRING_LENGTH,
            max_frame_length: MAX_FRAME_LENGTH,
            max_uncompressed_length: MAX_UNCOMPRESSED_LENGTH,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl CodecConfig {
    /// Load configuration from an options file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::parse(&content)?;
        tracing::info!("Loaded codec configuration from {}", path.as_ref().display());
        config.display();
        Ok(config)
    }

    /// Parse options file content
    ///
    /// Unknown keys are skipped and values that fail to parse keep their
    /// default. The result is validated before it is returned.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                config.parse_option(key.trim(), value.trim());
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        match key {
            "max_string_length" => {
                self.max_string_length = value.parse().unwrap_or(MAX_STRING_LENGTH);
            }
            "max_frame_length" => {
                self.max_frame_length = value.parse().unwrap_or(MAX_FRAME_LENGTH);
            }
            "max_uncompressed_length" => {
                self.max_uncompressed_length = value.parse().unwrap_or(MAX_UNCOMPRESSED_LENGTH);
            }
            "compression_level" => {
                self.compression_level = value.parse().unwrap_or(DEFAULT_COMPRESSION_LEVEL);
            }
            _ => {
                tracing::warn!("Unknown config option: {} = {}", key, value);
            }
        }
    }

    /// Check that every limit is usable
    pub fn validate(&self) -> Result<()> {
        if self.max_string_length == 0 {
            return Err(CodecError::Config("max_string_length must be > 0".into()));
        }

        if self.max_frame_length == 0 {
            return Err(CodecError::Config("max_frame_length must be > 0".into()));
        }

        if self.max_frame_length > MAX_VARINT_LENGTH {
            return Err(CodecError::Config(format!(
                "max_frame_length must be <= {}",
                MAX_VARINT_LENGTH
            )));
        }

        if self.max_uncompressed_length == 0 {
            return Err(CodecError::Config("max_uncompressed_length must be > 0".into()));
        }

        if self.compression_level > 9 {
            return Err(CodecError::Config("compression_level must be 0-9".into()));
        }

        Ok(())
    }

    /// Log the active configuration
    pub fn display(&self) {
        tracing::info!("Codec configuration:");
        tracing::info!("    Max string length: {} chars", self.max_string_length);
        tracing::info!("    Max frame length: {} bytes", self.max_frame_length);
        tracing::info!("    Max uncompressed length: {} bytes", self.max_uncompressed_length);
        tracing::info!("    Compression level: {}", self.compression_level);
    }
}
