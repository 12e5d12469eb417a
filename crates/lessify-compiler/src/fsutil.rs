//! Filesystem helpers shared by the orchestrator.

use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::diagnostic::CompilerError;

/// Makes `path` absolute against the current directory and removes `.`/`..` segments.
pub fn absolutize(path: &Path) -> Result<PathBuf, CompilerError> {
    let absolute = std::path::absolute(path)
        .map_err(|e| CompilerError::read(path, e.to_string()))?;
    Ok(absolute.clean())
}

/// Resolves `relative` against `base_dir`; an absolute `relative` replaces the base.
pub fn resolve(base_dir: &Path, relative: impl AsRef<Path>) -> PathBuf {
    base_dir.join(relative).clean()
}

/// Writes `content` to `path`, creating missing parent directories first.
pub async fn write_file(path: &Path, content: &str) -> Result<(), CompilerError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CompilerError::write(parent, e.to_string()))?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|e| CompilerError::write(path, e.to_string()))?;
    tracing::info!(path = %path.display(), bytes = content.len(), "wrote file");
    Ok(())
}
