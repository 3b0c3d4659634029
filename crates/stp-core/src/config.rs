//! Process configuration: where the identity and known-peers files live,
//! and the ambient log level. Analogous to the donor's `ClientConfig`, but
//! STP has no chunk size or service type to carry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Directory and logging configuration for a process using STP. Does not
/// itself perform I/O; pair with [`crate::host::Host::load_or_create`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `id.key` and `known`.
    pub config_dir: PathBuf,

    /// `tracing` env-filter directive, e.g. "info" or "stp_core=debug".
    pub log_level: String,
}

impl Config {
    pub fn identity_path(&self) -> PathBuf {
        self.config_dir.join("id.key")
    }

    pub fn known_peers_path(&self) -> PathBuf {
        self.config_dir.join("known")
    }
}

impl Default for Config {
    /// Derives `config_dir` from the platform config directory
    /// (`$XDG_CONFIG_HOME`/`$HOME` on Unix, `%APPDATA%` on Windows) via the
    /// `dirs` crate, falling back to the current directory if the platform
    /// offers no such location.
    fn default() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            config_dir: base.join("stp"),
            log_level: "info".to_string(),
        }
    }
}
