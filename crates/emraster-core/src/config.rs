//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard memory cap (in bytes) for live block buffers.
    pub mem_cap_bytes: usize,

    /// Optional rows-per-block override; the scheduler sizes blocks from the cap otherwise.
    pub block_rows_hint: Option<usize>,

    /// Where results go: `memory://` (default) or a file path / `file://` URI.
    pub destination: String,

    /// Replace an existing output file.
    pub overwrite: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mem_cap_bytes: 256 * 1024 * 1024, // 256 MiB default
            block_rows_hint: None,
            destination: "memory://".to_string(),
            overwrite: false,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `EMRASTER_MEM_CAP_BYTES`: memory cap in bytes
    /// - `EMRASTER_BLOCK_ROWS`: rows per block
    /// - `EMRASTER_DESTINATION`: output destination
    /// - `EMRASTER_OVERWRITE`: `1`/`true` to replace existing outputs
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("EMRASTER_MEM_CAP_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.mem_cap_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("EMRASTER_BLOCK_ROWS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.block_rows_hint = Some(v);
            }
        }

        if let Ok(s) = std::env::var("EMRASTER_DESTINATION") {
            if !s.trim().is_empty() {
                cfg.destination = s;
            }
        }

        if let Ok(s) = std::env::var("EMRASTER_OVERWRITE") {
            if let Some(v) = parse_flag(&s) {
                cfg.overwrite = v;
            }
        }

        cfg
    }

    /// Reject configurations the scheduler cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.mem_cap_bytes == 0 {
            return Err(Error::Config("mem_cap_bytes must be > 0".into()));
        }
        if self.block_rows_hint == Some(0) {
            return Err(Error::Config("block_rows_hint must be > 0".into()));
        }
        if self.destination.trim().is_empty() {
            return Err(Error::Config("destination must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
