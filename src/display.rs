use std::io::{self, Write};

use log::warn;

/// Destination for the calculator display text.
pub trait Render {
    fn show_banner(&mut self, text: &str);
    fn show_display(&mut self, text: &str);
}

/// Writes the display to a text stream, one line per update.
pub struct ConsoleDisplay<W: Write> {
    out: W,
}

impl ConsoleDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(err) = self.out.write_fmt(line).and_then(|_| self.out.flush()) {
            warn!("Display write failed: {}", err);
        }
    }
}

impl<W: Write> Render for ConsoleDisplay<W> {
    fn show_banner(&mut self, text: &str) {
        self.write_line(format_args!("{}\n", text));
    }

    fn show_display(&mut self, text: &str) {
        self.write_line(format_args!("Display: {}\n", text));
    }
}
