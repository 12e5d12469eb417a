//! `lessc` process backend.
//!
//! Runs the Less command line compiler on the source file. Output goes to a
//! scratch directory so that both the stylesheet and its source map can be
//! read back and written by the orchestrator.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;

use super::{CompileService, RenderOutput};
use crate::diagnostic::CompilerError;
use crate::directive::DirectiveValue;
use crate::options::{Plugin, RenderOptions};

const SERVICE_NAME: &str = "lessc";

#[cfg(windows)]
const INCLUDE_PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const INCLUDE_PATH_SEPARATOR: &str = ":";

/// How a passthrough option is spelled on the `lessc` command line.
#[derive(Debug, Clone, Copy)]
enum FlagStyle {
    /// Bare flag when truthy.
    Switch,
    /// `=on` or `=off`.
    OnOff,
    /// `=<value>`.
    Value,
}

/// Render options a directive may set, with their `lessc` flag.
/// Directive keys outside this table never reach the command line.
const PASSTHROUGH_FLAGS: &[(&str, &str, FlagStyle)] = &[
    ("compress", "compress", FlagStyle::Switch),
    ("dumpLineNumbers", "line-numbers", FlagStyle::Value),
    ("ieCompat", "ie-compat", FlagStyle::Switch),
    ("insecure", "insecure", FlagStyle::Switch),
    ("javascriptEnabled", "js", FlagStyle::Switch),
    ("math", "math", FlagStyle::Value),
    ("relativeUrls", "relative-urls", FlagStyle::Switch),
    ("rewriteUrls", "rewrite-urls", FlagStyle::Value),
    ("rootpath", "rootpath", FlagStyle::Value),
    ("strictImports", "strict-imports", FlagStyle::Switch),
    ("strictMath", "strict-math", FlagStyle::OnOff),
    ("strictUnits", "strict-units", FlagStyle::OnOff),
    ("urlArgs", "url-args", FlagStyle::Value),
];

/// Compilation service backed by the `lessc` executable.
#[derive(Debug)]
pub struct LesscService {
    program: PathBuf,
    version: OnceCell<String>,
}

impl LesscService {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            version: OnceCell::new(),
        }
    }

    async fn query_version(&self) -> Result<String, CompilerError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_version(&stdout).ok_or_else(|| {
            CompilerError::unavailable(
                SERVICE_NAME,
                format!("unrecognized version output: {}", stdout.trim()),
            )
        })
    }

    fn spawn_error(&self, e: std::io::Error) -> CompilerError {
        CompilerError::unavailable(
            SERVICE_NAME,
            format!("failed to run '{}': {}", self.program.display(), e),
        )
    }
}

impl CompileService for LesscService {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    /// `lessc` reads `options.filename` itself so that diagnostics and source
    /// maps name the real file. `source` is piped on stdin only when no
    /// filename is set.
    async fn render(&self, source: &str, options: &RenderOptions) -> Result<RenderOutput, CompilerError> {
        let scratch = tempfile::TempDir::new().map_err(|e| {
            CompilerError::unavailable(SERVICE_NAME, format!("failed to create scratch directory: {}", e))
        })?;
        let css_out = scratch.path().join("out.css");
        let map_out = scratch.path().join("out.css.map");

        let args = build_args(options, &css_out, &map_out);
        tracing::debug!(program = %self.program.display(), ?args, "spawning lessc");

        let workdir = options
            .paths
            .first()
            .cloned()
            .or_else(|| options.filename.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        let from_stdin = reads_stdin(options);
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(&workdir)
            .stdin(if from_stdin { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if from_stdin {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                CompilerError::unavailable(SERVICE_NAME, "failed to capture stdin")
            })?;
            stdin
                .write_all(source.as_bytes())
                .await
                .map_err(|e| self.spawn_error(e))?;
            drop(stdin); // Close stdin to signal EOF
        }

        let output = child.wait_with_output().await.map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(CompilerError::compile(&options.filename, message));
        }

        let css = tokio::fs::read_to_string(&css_out)
            .await
            .map_err(|e| CompilerError::compile(&options.filename, format!("no output produced: {}", e)))?;

        let wants_map_file = options
            .source_map
            .as_ref()
            .is_some_and(|sm| sm.filename.is_some());
        let map = if wants_map_file {
            let map = tokio::fs::read_to_string(&map_out).await.map_err(|e| {
                CompilerError::compile(&options.filename, format!("no source map produced: {}", e))
            })?;
            Some(map)
        } else {
            None
        };

        Ok(RenderOutput { css, map })
    }

    async fn version(&self) -> Result<String, CompilerError> {
        self.version
            .get_or_try_init(|| self.query_version())
            .await
            .cloned()
    }
}

fn reads_stdin(options: &RenderOptions) -> bool {
    options.filename.as_os_str().is_empty()
}

/// Builds the `lessc` argument list for one render.
pub fn build_args(options: &RenderOptions, css_out: &Path, map_out: &Path) -> Vec<String> {
    let mut args = Vec::new();

    if !options.paths.is_empty() {
        let joined = options
            .paths
            .iter()
            .map(|p| p.to_string_lossy())
            .collect::<Vec<_>>()
            .join(INCLUDE_PATH_SEPARATOR);
        args.push(format!("--include-path={}", joined));
    }

    if let Some(sm) = &options.source_map {
        if sm.file_inline {
            args.push("--source-map-inline".to_string());
        } else {
            args.push(format!("--source-map={}", map_out.display()));
        }
        if let Some(url) = &sm.url {
            args.push(format!("--source-map-url={}", url));
        }
        args.push(format!("--source-map-basepath={}", sm.basepath));
        if let Some(rootpath) = &sm.rootpath {
            args.push(format!("--source-map-rootpath={}", rootpath));
        }
        if sm.output_source_files {
            args.push("--source-map-include-source".to_string());
        }
    }

    for plugin in &options.plugins {
        match plugin {
            Plugin::Autoprefix { browsers } if browsers.is_empty() => {
                args.push("--autoprefix".to_string());
            }
            Plugin::Autoprefix { browsers } => {
                args.push(format!("--autoprefix={}", browsers.join(",")));
            }
            Plugin::CleanCss { compatibility: None } => {
                args.push("--clean-css".to_string());
            }
            Plugin::CleanCss { compatibility: Some(mode) } => {
                args.push(format!("--clean-css=--compatibility={}", mode));
            }
        }
    }

    args.extend(
        options
            .extra
            .iter()
            .filter_map(|(key, value)| passthrough_arg(key, value)),
    );

    if reads_stdin(options) {
        args.push("-".to_string());
    } else {
        args.push(options.filename.to_string_lossy().to_string());
    }
    args.push(css_out.to_string_lossy().to_string());
    args
}

fn passthrough_arg(key: &str, value: &DirectiveValue) -> Option<String> {
    let Some((_, flag, style)) = PASSTHROUGH_FLAGS.iter().find(|(name, _, _)| *name == key) else {
        tracing::debug!(key, "ignoring directive with no lessc option");
        return None;
    };

    match (style, value) {
        (_, DirectiveValue::Null | DirectiveValue::Undefined) => None,
        (FlagStyle::Switch, value) => value.is_truthy().then(|| format!("--{}", flag)),
        (FlagStyle::OnOff, DirectiveValue::Str(s)) if s == "off" => Some(format!("--{}=off", flag)),
        (FlagStyle::OnOff, value) => {
            let state = if value.is_truthy() { "on" } else { "off" };
            Some(format!("--{}={}", flag, state))
        }
        (FlagStyle::Value, DirectiveValue::Bool(_)) => None,
        (FlagStyle::Value, value) => Some(format!("--{}={}", flag, value)),
    }
}

/// Extracts the dotted version from `lessc --version` output,
/// e.g. "lessc 4.2.0 (Less Compiler) [JavaScript]".
fn parse_version(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .map(|token| token.trim_start_matches('v'))
        .find(|token| {
            token.contains('.')
                && token.chars().next().is_some_and(|c| c.is_ascii_digit())
                && token.chars().all(|c| c.is_ascii_digit() || c == '.')
        })
        .map(str::to_string)
}
