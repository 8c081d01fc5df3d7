use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as CellColor, Table, presets};
use serde::Serialize;

use crate::theme::{BULLET, COLOR_SUPPORTED, LABEL, TITLE, Tone};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable tables
    #[default]
    Table,
    /// Machine readable JSON
    Json,
}

/// Command results that render as a table in table mode and as JSON otherwise.
pub trait Tabular: Serialize {
    fn table(&self, console: &Console) -> Table;
}

/// Terminal output for the dashboard commands.
///
/// Status lines go to stdout and are dropped in JSON mode so the JSON document stays the only
/// thing on stdout. Errors and warnings go to stderr.
#[derive(Debug, Clone)]
pub struct Console {
    format: OutputFormat,
    quiet: bool,
    verbose: bool,
    color: bool,
}

impl Console {
    pub fn new(format: OutputFormat, quiet: bool, verbose: bool, no_color: bool) -> Self {
        Self {
            format,
            quiet,
            verbose,
            color: !no_color && *COLOR_SUPPORTED,
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn chatty(&self) -> bool {
        !self.quiet && !self.is_json()
    }

    fn status(&self, tone: Tone, message: &str) -> String {
        if self.color {
            format!("{} {}", tone.icon().color(tone.color()), message.color(tone.color()))
        } else {
            format!("{} {message}", tone.icon())
        }
    }

    pub fn done(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.status(Tone::Done, message));
        }
    }

    pub fn note(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.status(Tone::Note, message));
        }
    }

    /// Printed even in quiet mode.
    pub fn failed(&self, message: &str) {
        eprintln!("{}", self.status(Tone::Failed, message));
    }

    pub fn caution(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", self.status(Tone::Caution, message));
        }
    }

    /// Only with `--verbose`.
    pub fn detail(&self, message: &str) {
        if self.verbose && !self.quiet {
            eprintln!("{}", self.status(Tone::Detail, message));
        }
    }

    /// Overwritable line for a step in progress; finish it with [`Console::settle`].
    pub fn pending(&self, message: &str) {
        if self.chatty() {
            print!("\r{}...", self.status(Tone::Pending, message));
            std::io::stdout().flush().ok();
        }
    }

    pub fn settle(&self) {
        if self.chatty() {
            print!("\r{:width$}\r", "", width = 80);
            std::io::stdout().flush().ok();
        }
    }

    pub fn title(&self, text: &str) {
        if !self.chatty() {
            return;
        }
        if self.color {
            println!("\n{}", text.color(TITLE).bold());
        } else {
            println!("\n{text}\n{}", "=".repeat(text.chars().count()));
        }
    }

    pub fn pair(&self, key: &str, value: &str) {
        if !self.chatty() {
            return;
        }
        if self.color {
            println!("{}: {value}", key.color(LABEL).bold());
        } else {
            println!("{key}: {value}");
        }
    }

    pub fn item(&self, text: &str) {
        if !self.chatty() {
            return;
        }
        let bullet = if self.color {
            BULLET.color(Tone::Detail.color()).to_string()
        } else {
            BULLET.to_string()
        };
        println!("  {bullet} {text}");
    }

    /// An empty table with bold headers.
    pub fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.load_preset(if self.color {
            presets::UTF8_FULL_CONDENSED
        } else {
            presets::ASCII_FULL
        });
        table.set_header(headers.iter().map(|header| {
            let cell = Cell::new(header).add_attribute(Attribute::Bold);
            if self.color { cell.fg(CellColor::Cyan) } else { cell }
        }));
        table
    }

    pub fn emit<T: Tabular>(&self, data: &T) -> Result<()> {
        if self.quiet {
            return Ok(());
        }
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
            OutputFormat::Table => println!("{}", data.table(self)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Collections(Vec<&'static str>);

    impl Tabular for Collections {
        fn table(&self, console: &Console) -> Table {
            let mut table = console.table(&["Collection"]);
            for name in &self.0 {
                table.add_row(vec![Cell::new(name)]);
            }
            table
        }
    }

    #[test]
    fn plain_tables_use_ascii_borders() {
        let console = Console::new(OutputFormat::Table, false, false, true);
        let rendered = Collections(vec!["users", "posts"]).table(&console).to_string();
        assert!(rendered.contains("Collection"));
        assert!(rendered.contains("posts"));
        assert!(rendered.contains('+'));
    }

    #[test]
    fn json_mode_silences_status_lines() {
        let console = Console::new(OutputFormat::Json, false, false, true);
        assert!(console.is_json());
        assert!(!console.chatty());
        assert!(console.emit(&Collections(vec!["users"])).is_ok());
    }

    #[test]
    fn plain_status_lines_keep_their_icon() {
        let console = Console::new(OutputFormat::Table, true, false, true);
        assert_eq!(console.status(Tone::Caution, "no filters"), "⚠ no filters");
        assert!(!console.chatty());
    }
}
