//! Output and render option resolution.
//!
//! Turns the directives of a source file into the output location and the
//! option set handed to the compilation service.

use std::path::{Path, PathBuf};

use crate::directive::{DirectiveValue, Directives};
use crate::fsutil;

/// Directive keys interpreted here. Everything else is passed through.
const CONSUMED_KEYS: &[&str] = &[
    "main",
    "out",
    "cleancss",
    "autoprefixer",
    "sourceMap",
    "sourceMapURL",
    "sourceMapBasepath",
    "sourceMapRootpath",
    "sourceMapFilename",
    "sourceMapFileInline",
    "outputSourceFiles",
    // Always set from the source location
    "paths",
    "filename",
    "plugins",
];

/// Post-pass plugins applied by the compilation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plugin {
    /// Vendor prefixing. Empty `browsers` means the plugin defaults.
    Autoprefix { browsers: Vec<String> },
    /// Minification, optionally in a clean-css compatibility mode.
    CleanCss { compatibility: Option<String> },
}

/// Source map generation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMapOptions {
    /// URL written into the stylesheet's `sourceMappingURL` comment.
    pub url: Option<String>,
    /// Path prefix stripped from source paths inside the map.
    pub basepath: String,
    /// Path prefix prepended to source paths inside the map.
    pub rootpath: Option<String>,
    /// Embed the Less sources in the map.
    pub output_source_files: bool,
    /// Embed the map in the stylesheet instead of a separate file.
    pub file_inline: bool,
    /// Where the map is written. `None` when inline.
    pub filename: Option<PathBuf>,
}

/// Options handed to the compilation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Import search paths.
    pub paths: Vec<PathBuf>,
    /// Absolute path of the file being compiled.
    pub filename: PathBuf,
    pub source_map: Option<SourceMapOptions>,
    pub plugins: Vec<Plugin>,
    /// Directives not interpreted by this crate, passed through verbatim.
    pub extra: Directives,
}

impl RenderOptions {
    pub fn minify(&self) -> bool {
        self.plugins
            .iter()
            .any(|p| matches!(p, Plugin::CleanCss { .. }))
    }

    /// The version comment is only added to uncompressed, unminified output.
    pub fn wants_version_header(&self) -> bool {
        !self.extra.is_truthy("compress") && !self.minify()
    }
}

/// Where a compile writes and how it invokes the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub css_path: PathBuf,
    pub options: RenderOptions,
}

impl OutputPlan {
    /// The separate map file to write, if any.
    pub fn source_map_path(&self) -> Option<&Path> {
        self.options
            .source_map
            .as_ref()
            .and_then(|sm| sm.filename.as_deref())
    }
}

/// Resolves directives for the absolute `source` path.
///
/// Returns `None` when the directives suppress output (`out: null` or
/// `out: false`). A `main` redirect must be handled by the caller beforehand.
pub fn resolve(source: &Path, mut directives: Directives) -> Option<OutputPlan> {
    if directives.get("out").is_some_and(DirectiveValue::is_null_or_false) {
        return None;
    }

    let source_dir = source.parent().unwrap_or(Path::new("/")).to_path_buf();
    let css_path = fsutil::resolve(&source_dir, output_filename(source, &directives));

    let minify = directives.truthy("cleancss").cloned();
    let source_map = if minify.is_none() && directives.is_truthy("sourceMap") {
        Some(source_map_options(&source_dir, &css_path, &directives))
    } else {
        None
    };

    let mut plugins = Vec::new();
    if let Some(value) = directives.truthy("autoprefixer") {
        let browsers = value.as_str().map(|s| vec![s.to_string()]).unwrap_or_default();
        plugins.push(Plugin::Autoprefix { browsers });
    }
    if let Some(value) = minify {
        plugins.push(Plugin::CleanCss {
            compatibility: value.as_str().map(str::to_string),
        });
    }

    for key in CONSUMED_KEYS {
        directives.remove(key);
    }

    Some(OutputPlan {
        css_path,
        options: RenderOptions {
            paths: vec![source_dir],
            filename: source.to_path_buf(),
            source_map,
            plugins,
            extra: directives,
        },
    })
}

/// `out` when truthy (with `.css` appended if extensionless), otherwise the
/// source file name with its extension replaced by `.css`.
fn output_filename(source: &Path, directives: &Directives) -> PathBuf {
    match directives.truthy("out") {
        Some(value) if !matches!(value, DirectiveValue::Bool(true)) => {
            let mut name = PathBuf::from(value.to_string());
            if name.extension().is_none() {
                name.as_mut_os_string().push(".css");
            }
            name
        }
        _ => {
            let stem = source.file_stem().unwrap_or_default();
            let mut name = stem.to_os_string();
            name.push(".css");
            PathBuf::from(name)
        }
    }
}

fn source_map_options(source_dir: &Path, css_path: &Path, directives: &Directives) -> SourceMapOptions {
    let text = |key: &str| directives.truthy(key).map(ToString::to_string);

    let mut options = SourceMapOptions {
        url: text("sourceMapURL"),
        basepath: text("sourceMapBasepath")
            .unwrap_or_else(|| source_dir.to_string_lossy().to_string()),
        rootpath: text("sourceMapRootpath"),
        output_source_files: directives.is_truthy("outputSourceFiles"),
        file_inline: directives.is_truthy("sourceMapFileInline"),
        filename: None,
    };

    if options.file_inline {
        return options;
    }

    let map_path = match text("sourceMapFilename") {
        Some(name) => fsutil::resolve(source_dir, name),
        None => {
            let mut path = css_path.as_os_str().to_os_string();
            path.push(".map");
            PathBuf::from(path)
        }
    };

    if options.url.is_none() {
        let css_dir = css_path.parent().unwrap_or(Path::new("/"));
        options.url = pathdiff::diff_paths(&map_path, css_dir)
            .map(|rel| rel.to_string_lossy().replace('\\', "/"));
    }
    options.filename = Some(map_path);

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::parse_directives;

    fn plan(source: &str, first_line: &str) -> Option<OutputPlan> {
        resolve(Path::new(source), parse_directives(first_line))
    }

    #[test]
    fn test_derives_css_name_from_source() {
        let plan = plan("/proj/styles/style.less", ".a{}").unwrap();
        assert_eq!(plan.css_path, PathBuf::from("/proj/styles/style.css"));
        assert_eq!(plan.options.paths, vec![PathBuf::from("/proj/styles")]);
        assert_eq!(plan.options.filename, PathBuf::from("/proj/styles/style.less"));
        assert!(plan.options.source_map.is_none());
        assert!(plan.options.plugins.is_empty());
    }

    #[test]
    fn test_out_without_extension_gets_css() {
        let plan = plan("/proj/styles/app.less", "// out: ../build/app\n").unwrap();
        assert_eq!(plan.css_path, PathBuf::from("/proj/build/app.css"));
        assert!(!plan.options.extra.contains_key("out"));
    }

    #[test]
    fn test_out_with_extension_is_kept() {
        let plan = plan("/proj/app.less", "// out: app.min.css\n").unwrap();
        assert_eq!(plan.css_path, PathBuf::from("/proj/app.min.css"));
    }

    #[test]
    fn test_out_null_and_false_suppress() {
        assert!(plan("/proj/app.less", "// out: null\n").is_none());
        assert!(plan("/proj/app.less", "// out: false\n").is_none());
    }

    #[test]
    fn test_falsy_out_that_is_not_null_derives_name() {
        let plan_zero = plan("/proj/app.less", "// out: 0\n").unwrap();
        assert_eq!(plan_zero.css_path, PathBuf::from("/proj/app.css"));
        let plan_undefined = plan("/proj/app.less", "// out: undefined\n").unwrap();
        assert_eq!(plan_undefined.css_path, PathBuf::from("/proj/app.css"));
        let plan_true = plan("/proj/app.less", "// out: true\n").unwrap();
        assert_eq!(plan_true.css_path, PathBuf::from("/proj/app.css"));
    }

    #[test]
    fn test_numeric_out_is_used_as_name() {
        let plan = plan("/proj/app.less", "// out: 2024\n").unwrap();
        assert_eq!(plan.css_path, PathBuf::from("/proj/2024.css"));
    }

    #[test]
    fn test_default_source_map_next_to_css() {
        let plan = plan("/proj/less/app.less", "// sourceMap: true, out: ../css/app\n").unwrap();
        let sm = plan.options.source_map.as_ref().unwrap();
        assert_eq!(sm.filename.as_deref(), Some(Path::new("/proj/css/app.css.map")));
        assert_eq!(sm.url.as_deref(), Some("app.css.map"));
        assert_eq!(sm.basepath, "/proj/less");
        assert!(!sm.file_inline);
        assert_eq!(plan.source_map_path(), Some(Path::new("/proj/css/app.css.map")));
    }

    #[test]
    fn test_explicit_source_map_filename_gets_relative_url() {
        let plan = plan(
            "/proj/less/app.less",
            "// sourceMap: true, out: ../css/app, sourceMapFilename: ../maps/app.map\n",
        )
        .unwrap();
        let sm = plan.options.source_map.unwrap();
        assert_eq!(sm.filename.as_deref(), Some(Path::new("/proj/maps/app.map")));
        assert_eq!(sm.url.as_deref(), Some("../maps/app.map"));
    }

    #[test]
    fn test_explicit_url_is_kept() {
        let plan = plan(
            "/proj/app.less",
            "// sourceMap: true, sourceMapURL: /static/app.map, sourceMapRootpath: /src\n",
        )
        .unwrap();
        let sm = plan.options.source_map.unwrap();
        assert_eq!(sm.url.as_deref(), Some("/static/app.map"));
        assert_eq!(sm.rootpath.as_deref(), Some("/src"));
        assert_eq!(sm.filename.as_deref(), Some(Path::new("/proj/app.css.map")));
    }

    #[test]
    fn test_inline_source_map_has_no_file() {
        let plan = plan("/proj/app.less", "// sourceMap: true, sourceMapFileInline: true\n").unwrap();
        let sm = plan.options.source_map.as_ref().unwrap();
        assert!(sm.file_inline);
        assert!(sm.filename.is_none());
        assert!(sm.url.is_none());
        assert!(plan.source_map_path().is_none());
    }

    #[test]
    fn test_cleancss_suppresses_source_map() {
        let plan = plan("/proj/app.less", "// cleancss: true, sourceMap: true\n").unwrap();
        assert!(plan.options.source_map.is_none());
        assert_eq!(plan.options.plugins, vec![Plugin::CleanCss { compatibility: None }]);
        assert!(!plan.options.wants_version_header());
    }

    #[test]
    fn test_plugins_with_string_options() {
        let plan = plan("/proj/app.less", "// autoprefixer: last 2 versions, cleancss: ie8\n").unwrap();
        assert_eq!(
            plan.options.plugins,
            vec![
                Plugin::Autoprefix { browsers: vec!["last 2 versions".to_string()] },
                Plugin::CleanCss { compatibility: Some("ie8".to_string()) },
            ]
        );
    }

    #[test]
    fn test_autoprefixer_alone_keeps_header() {
        let plan = plan("/proj/app.less", "// autoprefixer: true\n").unwrap();
        assert_eq!(plan.options.plugins, vec![Plugin::Autoprefix { browsers: vec![] }]);
        assert!(plan.options.wants_version_header());
    }

    #[test]
    fn test_compress_passes_through_and_drops_header() {
        let plan = plan("/proj/app.less", "// compress: true, strictMath: on, out: x\n").unwrap();
        assert!(!plan.options.wants_version_header());
        assert_eq!(plan.options.extra.len(), 2);
        assert_eq!(
            plan.options.extra.get("strictMath"),
            Some(&DirectiveValue::Str("on".into()))
        );
    }

    #[test]
    fn test_recognized_keys_are_not_passed_through() {
        let plan = plan(
            "/proj/app.less",
            "// sourceMap: true, outputSourceFiles: true, autoprefixer: true, paths: /etc\n",
        )
        .unwrap();
        assert!(plan.options.extra.is_empty());
        assert_eq!(plan.options.paths, vec![PathBuf::from("/proj")]);
        assert!(plan.options.source_map.unwrap().output_source_files);
    }
}
