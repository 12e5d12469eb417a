//! Lessify CLI UI primitives.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Terminal color palette
pub mod colors {
    use console::Color;

    pub const CYAN: Color = Color::Color256(51);
    pub const MAGENTA: Color = Color::Color256(201);
    pub const NEON_GREEN: Color = Color::Color256(82);
    pub const DIM: Color = Color::Color256(240);
}

/// Status symbols
pub mod symbols {
    pub const DIAMOND: &str = "\u{25C6}";          // ◆
    pub const DIAMOND_OUTLINE: &str = "\u{25C7}";  // ◇
    pub const TARGET_FILLED: &str = "\u{25C9}";    // ◉
    pub const TARGET_EMPTY: &str = "\u{25CE}";     // ◎
    pub const ARROW: &str = "\u{2500}\u{25B8}";    // ─▸
}

/// Create a clickable file link (OSC 8 hyperlink)
/// Works in iTerm2, Windows Terminal, kitty, WezTerm, VS Code terminal
pub fn file_link(path: &Path) -> String {
    let display = path.display().to_string();
    let abs_path = std::fs::canonicalize(path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| display.clone());
    let uri = format!("file://{}", abs_path);
    format!("\x1b]8;;{}\x07{}\x1b]8;;\x07", uri, display)
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!(
        "  {} {}",
        style(symbols::DIAMOND).fg(colors::MAGENTA),
        style(msg).fg(colors::MAGENTA)
    );
}

/// Print an info message
pub fn info(msg: &str) {
    println!(
        "  {} {}",
        style(symbols::DIAMOND_OUTLINE).fg(colors::CYAN),
        msg
    );
}

/// Print a dim/secondary message
pub fn dim(msg: &str) {
    println!("  {}", style(msg).fg(colors::DIM));
}

/// Print a "compiled" line: source ─▸ output
pub fn compiled(source: &Path, output: &Path, duration_ms: u128) {
    println!(
        "  {} {} {} {} {}",
        style(symbols::TARGET_FILLED).fg(colors::NEON_GREEN),
        source.display(),
        style(symbols::ARROW).fg(colors::DIM),
        file_link(output),
        style(format!("{}ms", duration_ms)).fg(colors::DIM)
    );
}

/// Print a "skipped" line for output suppressed by `out: null|false`
pub fn skipped(source: &Path) {
    println!(
        "  {} {} {}",
        style(symbols::TARGET_EMPTY).fg(colors::DIM),
        source.display(),
        style("(output disabled by directive)").fg(colors::DIM)
    );
}

/// Create a spinner
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("\u{25CE}\u{25C9}\u{25CE}\u{25C9}") // ◎◉◎◉
            .template("  {spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(150));
    pb
}
