use nu_ansi_term::{Color, Style};
use std::fmt::Display;
use std::io::IsTerminal;

use relalg::query::TraceStep;
use relalg::Relation;

pub struct Ui {
    palette: Palette,
    paint: bool,
}

impl Ui {
    pub fn new(plain: bool) -> Self {
        let paint = !plain && std::io::stdout().is_terminal();

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let palette = if paint {
            Palette::dark()
        } else {
            Palette::plain()
        };
        Self { palette, paint }
    }

    /// Prints a relation as a table with a bold header line.
    pub fn relation(&self, relation: &Relation) {
        let table = relation.to_string();
        let mut lines = table.lines();
        if let Some(header) = lines.next() {
            println!("{}", self.palette.header.paint(header));
        }
        for line in lines {
            println!("{line}");
        }
    }

    pub fn trace(&self, steps: &[TraceStep]) {
        for step in steps {
            let rule = format!("{} ({})", step.rule, step.changes);
            println!("{}: {}", self.palette.key.paint(rule), step.tree);
        }
    }

    pub fn success(&self, message: impl Display) {
        let prefix = if self.paint {
            self.palette.success.paint(SUCCESS_ICON).to_string()
        } else {
            SUCCESS_ICON.to_string()
        };
        println!("{prefix} {message}");
    }
}

struct Palette {
    header: Style,
    key: Style,
    success: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            header: Style::new().bold(),
            key: Style::new().fg(Color::LightBlue).bold(),
            success: Style::new().fg(Color::LightGreen).bold(),
        }
    }

    fn plain() -> Self {
        Self {
            header: Style::new(),
            key: Style::new(),
            success: Style::new(),
        }
    }
}

const SUCCESS_ICON: &str = "✔";
