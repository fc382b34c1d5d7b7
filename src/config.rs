//! Configuration for SnapKV
//!
//! Centralized configuration with sensible defaults.
//!
//! A JSON config file may override any default; see [`Config::from_file`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, SnapError};

/// Main configuration for a SnapKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// JSON snapshot file, rewritten wholly after every write
    pub database_path: PathBuf,

    /// How the snapshot file is rewritten
    pub dump_strategy: DumpStrategy,

    // -------------------------------------------------------------------------
    // Engine Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the engine mailbox (pending requests before callers block)
    pub mailbox_capacity: usize,

    /// Upper bound on how long a caller waits for the engine.
    /// `None` waits forever.
    pub request_timeout: Option<Duration>,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// HTTP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,
}

/// Snapshot rewrite strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpStrategy {
    /// Truncate the file and write the new contents in place.
    /// A crash mid-write leaves a corrupt file.
    Truncate,

    /// Write `<path>.tmp`, then rename it over the snapshot
    AtomicRename,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./database.json"),
            dump_strategy: DumpStrategy::Truncate,
            mailbox_capacity: 1024,
            request_timeout: None,
            listen_addr: "0.0.0.0:8080".to_string(),
            max_connections: 1024,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a JSON config file on top of the defaults
    ///
    /// ```json
    /// { "database_path": "/var/lib/snapkv/db.json", "dump_strategy": "atomic_rename" }
    /// ```
    ///
    /// Missing fields keep their defaults; unknown fields are rejected.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| SnapError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Parse JSON config text on top of the defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let file: FileConfig =
            serde_json::from_str(text).map_err(|e| SnapError::Config(e.to_string()))?;
        Ok(file.apply(Config::builder()).build())
    }

    /// Turn back into a builder, e.g. to apply command-line overrides
    pub fn into_builder(self) -> ConfigBuilder {
        ConfigBuilder { config: self }
    }
}

/// On-disk shape of the config file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    database_path: Option<PathBuf>,
    dump_strategy: Option<DumpStrategy>,
    mailbox_capacity: Option<usize>,
    /// 0 waits forever
    request_timeout_ms: Option<u64>,
    listen_addr: Option<String>,
    max_connections: Option<usize>,
    read_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
}

impl FileConfig {
    fn apply(self, mut builder: ConfigBuilder) -> ConfigBuilder {
        if let Some(path) = self.database_path {
            builder = builder.database_path(path);
        }
        if let Some(strategy) = self.dump_strategy {
            builder = builder.dump_strategy(strategy);
        }
        if let Some(capacity) = self.mailbox_capacity {
            builder = builder.mailbox_capacity(capacity);
        }
        if let Some(ms) = self.request_timeout_ms {
            builder = builder.request_timeout((ms > 0).then(|| Duration::from_millis(ms)));
        }
        if let Some(addr) = self.listen_addr {
            builder = builder.listen_addr(addr);
        }
        if let Some(count) = self.max_connections {
            builder = builder.max_connections(count);
        }
        if let Some(ms) = self.read_timeout_ms {
            builder = builder.read_timeout_ms(ms);
        }
        if let Some(ms) = self.write_timeout_ms {
            builder = builder.write_timeout_ms(ms);
        }
        builder
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the snapshot file path
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Set the snapshot rewrite strategy
    pub fn dump_strategy(mut self, strategy: DumpStrategy) -> Self {
        self.config.dump_strategy = strategy;
        self
    }

    /// Set the engine mailbox capacity (clamped to at least 1)
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.config.mailbox_capacity = capacity.max(1);
        self
    }

    /// Bound how long callers wait on the engine
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the HTTP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
