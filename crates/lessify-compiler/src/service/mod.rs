//! Compilation services that turn Less source into CSS.
//!
//! The orchestrator treats the compiler as an opaque service: it hands over the
//! raw source text plus resolved options and receives the stylesheet and an
//! optional source map back.

pub mod lessc;

use crate::config::CompilerConfig;
use crate::diagnostic::CompilerError;
use crate::options::RenderOptions;

pub use lessc::LesscService;

/// Output of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub css: String,
    /// Source map text, when one was requested as a separate file.
    pub map: Option<String>,
}

/// Trait for compilation services.
#[allow(async_fn_in_trait)]
pub trait CompileService {
    /// Returns the service name (e.g., "lessc").
    fn name(&self) -> &str;

    /// Compiles `source` with the given options.
    async fn render(&self, source: &str, options: &RenderOptions) -> Result<RenderOutput, CompilerError>;

    /// Dotted compiler version used in the generated header (e.g., "4.2.0").
    async fn version(&self) -> Result<String, CompilerError>;
}

/// Creates the service configured by `config.service`.
pub fn create_service(config: &CompilerConfig) -> Result<LesscService, CompilerError> {
    match config.service.as_str() {
        "lessc" | "less" => Ok(LesscService::new(config.lessc_path.clone())),
        _ => Err(CompilerError::UnsupportedService {
            name: config.service.clone(),
        }),
    }
}
