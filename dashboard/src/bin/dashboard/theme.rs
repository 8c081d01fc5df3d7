use clap::builder::{Styles, styling::AnsiColor};
use colored::{Color, control::ShouldColorize};
use once_cell::sync::Lazy;

/// Whether the terminal and environment (`NO_COLOR`, `CLICOLOR_FORCE`) allow colors.
pub static COLOR_SUPPORTED: Lazy<bool> = Lazy::new(|| ShouldColorize::from_env().should_colorize());

/// Help output colors, matching [`Tone`] and the table headers.
pub const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Cyan.on_default().bold())
    .usage(AnsiColor::Cyan.on_default().bold())
    .literal(AnsiColor::BrightBlue.on_default())
    .placeholder(AnsiColor::BrightBlack.on_default())
    .error(AnsiColor::Red.on_default().bold());

/// Kind of status line the CLI prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Done,
    Failed,
    Caution,
    Note,
    Detail,
    Pending,
}

impl Tone {
    pub fn color(self) -> Color {
        match self {
            Tone::Done => Color::Green,
            Tone::Failed => Color::Red,
            Tone::Caution => Color::Yellow,
            Tone::Note => Color::Blue,
            Tone::Detail => Color::BrightBlack,
            Tone::Pending => Color::Cyan,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Tone::Done => "✓",
            Tone::Failed => "✗",
            Tone::Caution => "⚠",
            Tone::Note => "ℹ",
            Tone::Detail => "→",
            Tone::Pending => "⟳",
        }
    }
}

/// Resource headings.
pub const TITLE: Color = Color::BrightBlue;
/// Keys of `key: value` lines.
pub const LABEL: Color = Color::BrightCyan;
/// List bullets.
pub const BULLET: &str = "•";
