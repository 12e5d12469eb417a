//! Compiler configuration.

use std::path::PathBuf;

/// Configuration for the Lessify compiler.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Compilation service backend (default: "lessc").
    pub service: String,

    /// Location of the `lessc` executable used by the "lessc" backend.
    pub lessc_path: PathBuf,

    /// Report `main` redirect cycles as errors instead of following them forever.
    pub detect_redirect_cycles: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            service: "lessc".to_string(),
            lessc_path: PathBuf::from("lessc"),
            detect_redirect_cycles: true,
        }
    }
}
