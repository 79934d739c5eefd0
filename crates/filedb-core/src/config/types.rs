//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Directory walking and parallelism.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of files processed concurrently
    pub parallel_workers: usize,

    /// Follow symbolic links while walking
    pub follow_links: bool,

    /// Skip dot-files and dot-directories
    pub skip_hidden: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            follow_links: false,
            skip_hidden: true,
        }
    }
}

/// Content digest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Read buffer size in bytes
    pub buffer_size: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
        }
    }
}

/// Resource limits for the format probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest file the raw and PDF probes will load into memory, in megabytes
    pub max_probe_size_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_probe_size_mb: 2048,
        }
    }
}

impl LimitsConfig {
    pub fn max_probe_bytes(&self) -> u64 {
        self.max_probe_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Catalog registration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Complete records accumulated before a commit
    pub batch_size: usize,

    /// Storage root objects are registered under
    pub root_name: String,

    /// Layout descriptor of that root
    pub root_layout: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            root_name: "Archive0".to_string(),
            root_layout: "ocfl".to_string(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "jsonl".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
