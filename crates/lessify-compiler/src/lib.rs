//! # Lessify Compiler
//!
//! Compiles a single Less file, honoring the option directive on its first
//! line. The Less compiler itself is an external service; this crate decides
//! what to compile, where the output goes and how the service is configured.
//!
//! ## Architecture
//!
//! ```text
//! Source file
//!        │
//!        ▼
//! ┌──────────────┐
//! │  Directive   │  First-line `// key: value, ...` options
//! └──────┬───────┘
//!        │   main: other.less ──▶ restart with the referenced file
//!        ▼
//! ┌──────────────┐
//! │   Options    │  Output path, source map, plugins, passthrough
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │   Service    │  lessc (or any CompileService)
//! └──────┬───────┘
//!        │
//!        ▼
//!   CSS (+ map) written to disk
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lessify_compiler::{Compiler, CompilerConfig};
//!
//! let compiler = Compiler::from_config(CompilerConfig::default())?;
//! if let Some(result) = compiler.compile("styles/app.less").await? {
//!     println!("wrote {}", result.filepath.display());
//! }
//! ```

pub mod config;
pub mod diagnostic;
pub mod directive;
pub mod domain;
pub mod fsutil;
pub mod options;
pub mod service;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::Serialize;

pub use config::CompilerConfig;
pub use diagnostic::CompilerError;
pub use directive::{parse_directives, DirectiveValue, Directives};
pub use options::{OutputPlan, Plugin, RenderOptions, SourceMapOptions};
pub use service::{CompileService, LesscService, RenderOutput};

/// Result of a successful compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileResult {
    /// Absolute path of the written stylesheet.
    pub filepath: PathBuf,
    /// The stylesheet text as written.
    pub output: String,
}

type CompileFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<CompileResult>, CompilerError>> + 'a>>;

/// Orchestrates a compile: read, parse directives, redirect, resolve, render, write.
pub struct Compiler<S> {
    config: CompilerConfig,
    service: S,
}

impl Compiler<LesscService> {
    /// Creates a compiler using the service named in `config`.
    pub fn from_config(config: CompilerConfig) -> Result<Self, CompilerError> {
        let service = service::create_service(&config)?;
        Ok(Self::new(config, service))
    }
}

impl<S: CompileService> Compiler<S> {
    /// Creates a new compiler with the given configuration and service.
    pub fn new(config: CompilerConfig, service: S) -> Self {
        Self { config, service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Compiles the Less file at `path`.
    ///
    /// Returns `Ok(None)` when the file's directives suppress output
    /// (`out: null` or `out: false`). A `main` directive compiles the
    /// referenced file instead, following chains of redirects.
    pub async fn compile(&self, path: impl AsRef<Path>) -> Result<Option<CompileResult>, CompilerError> {
        let source = fsutil::absolutize(path.as_ref())?;
        self.compile_chain(source, Vec::new()).await
    }

    /// Reads the directives of `path` without compiling anything.
    pub async fn inspect(&self, path: impl AsRef<Path>) -> Result<Directives, CompilerError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CompilerError::read(path, e.to_string()))?;
        Ok(parse_directives(&content))
    }

    fn compile_chain(&self, source: PathBuf, mut visited: Vec<PathBuf>) -> CompileFuture<'_> {
        Box::pin(async move {
            if self.config.detect_redirect_cycles && visited.contains(&source) {
                visited.push(source);
                return Err(CompilerError::RedirectCycle { chain: visited });
            }

            let content = tokio::fs::read_to_string(&source)
                .await
                .map_err(|e| CompilerError::read(&source, e.to_string()))?;

            let mut directives = parse_directives(&content);
            tracing::debug!(source = %source.display(), ?directives, "parsed directives");

            // main is set: compile the referenced file instead
            if let Some(main) = directives.truthy("main").map(ToString::to_string) {
                let source_dir = source.parent().unwrap_or(Path::new("/"));
                let target = fsutil::resolve(source_dir, main);
                tracing::debug!(from = %source.display(), to = %target.display(), "following main redirect");
                if self.config.detect_redirect_cycles {
                    visited.push(source);
                }
                return self.compile_chain(target, visited).await;
            }
            directives.remove("main");

            let Some(plan) = options::resolve(&source, directives) else {
                tracing::debug!(source = %source.display(), "output suppressed by directive");
                return Ok(None);
            };

            self.render_and_write(&content, plan).await.map(Some)
        })
    }

    async fn render_and_write(&self, content: &str, plan: OutputPlan) -> Result<CompileResult, CompilerError> {
        tracing::debug!(
            source = %plan.options.filename.display(),
            css = %plan.css_path.display(),
            map = ?plan.source_map_path(),
            service = self.service.name(),
            "rendering"
        );

        let rendered = self.service.render(content, &plan.options).await?;

        let mut css = rendered.css;
        if plan.options.wants_version_header() {
            let version = self.service.version().await?;
            css = format!("/* Generated by less {} */\n{}", version, css);
        }

        fsutil::write_file(&plan.css_path, &css).await?;

        if let (Some(map), Some(map_path)) = (rendered.map.as_deref(), plan.source_map_path()) {
            fsutil::write_file(map_path, map).await?;
        }

        Ok(CompileResult {
            filepath: plan.css_path,
            output: css,
        })
    }
}
