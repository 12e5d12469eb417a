//! Compiler error types.
#![allow(unused_assignments)]

use std::path::PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while compiling a Less file.
#[allow(unused_assignments)]
#[derive(Error, Diagnostic, Debug)]
pub enum CompilerError {
    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("Failed to read file '{}': {message}", .path.display())]
    #[diagnostic(code(lessify::io::read_error))]
    ReadFailed {
        path: PathBuf,
        message: String,
    },

    #[error("Failed to write file '{}': {message}", .path.display())]
    #[diagnostic(
        code(lessify::io::write_error),
        help("Check that the output location is writable. Files written before the failure are left in place.")
    )]
    WriteFailed {
        path: PathBuf,
        message: String,
    },

    // =========================================================================
    // Compilation Errors
    // =========================================================================
    #[error("Failed to compile '{}': {message}", .path.display())]
    #[diagnostic(code(lessify::compile::rejected))]
    CompileFailed {
        path: PathBuf,
        message: String,
    },

    #[error("Redirect cycle detected: {}", format_chain(.chain))]
    #[diagnostic(
        code(lessify::directive::redirect_cycle),
        help("A `main` directive points back to a file already in the chain. Remove one of the redirects.")
    )]
    RedirectCycle {
        chain: Vec<PathBuf>,
    },

    // =========================================================================
    // Service Errors
    // =========================================================================
    #[error("Compilation service '{service}' is unavailable: {message}")]
    #[diagnostic(
        code(lessify::service::unavailable),
        help("Install the Less compiler (npm install -g less) or pass --lessc with its location.")
    )]
    ServiceUnavailable {
        service: String,
        message: String,
    },

    #[error("Unsupported compilation service: {name}")]
    #[diagnostic(code(lessify::service::unsupported))]
    UnsupportedService {
        name: String,
    },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl CompilerError {
    /// Creates a read error.
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a compile error.
    pub fn compile(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CompileFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }
}
