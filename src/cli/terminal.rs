//! Terminal capability detection and utilities

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::{OwoColorize, colors::css};
use rtmx::{Recognised, Status};

static COLOR_DISABLED: AtomicBool = AtomicBool::new(false);

/// Turns colored output off for the rest of the process.
pub fn disable_color() {
    COLOR_DISABLED.store(true, Ordering::Relaxed);
}

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    !COLOR_DISABLED.load(Ordering::Relaxed)
        && supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Shortens `text` to at most `width` characters, marking the cut with `…`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Shortens `text` to fit in what remains of the terminal after `used`
/// columns. Text is left alone when the width is unknown.
pub fn fit(text: &str, used: usize) -> String {
    match terminal_width() {
        Some(width) => truncate(text, usize::from(width).saturating_sub(used).max(10)),
        None => text.to_string(),
    }
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (amber)
    fn warning(&self) -> String;
    /// Color as error (red)
    fn error(&self) -> String;
    /// Color as info (blue)
    fn info(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
    /// Embolden the text
    fn bold(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        if supports_color() {
            self.fg::<css::Green>().to_string()
        } else {
            self.to_string()
        }
    }

    fn warning(&self) -> String {
        if supports_color() {
            self.fg::<css::Orange>().to_string()
        } else {
            self.to_string()
        }
    }

    fn error(&self) -> String {
        if supports_color() {
            self.fg::<css::Red>().to_string()
        } else {
            self.to_string()
        }
    }

    fn info(&self) -> String {
        if supports_color() {
            self.fg::<css::LightBlue>().to_string()
        } else {
            self.to_string()
        }
    }

    fn dim(&self) -> String {
        if supports_color() {
            self.dimmed().to_string()
        } else {
            self.to_string()
        }
    }

    fn bold(&self) -> String {
        if supports_color() {
            OwoColorize::bold(&self).to_string()
        } else {
            self.to_string()
        }
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn error(&self) -> String {
        self.as_str().error()
    }

    fn info(&self) -> String {
        self.as_str().info()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }

    fn bold(&self) -> String {
        Colorize::bold(self.as_str())
    }
}

/// Renders a status in the color used for it throughout the CLI.
pub fn colored_status(status: &Recognised<Status>) -> String {
    paint_status(status, &status.to_string())
}

/// Colors `text` the way `status` is colored.
///
/// Pad before painting: width specifiers count escape codes as characters.
pub fn paint_status(status: &Recognised<Status>, text: &str) -> String {
    match status {
        Recognised::Known(Status::Complete) => text.success(),
        Recognised::Known(Status::Partial | Status::InProgress) => text.warning(),
        Recognised::Known(Status::Missing | Status::NotStarted) => text.error(),
        Recognised::Unknown(_) => text.dim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly", 7), "exactly");
    }

    #[test]
    fn padded_status_keeps_its_width_uncolored() {
        disable_color();
        let status = Recognised::Known(Status::InProgress);
        let cell = paint_status(&status, &format!("{status:<14}"));
        assert_eq!(cell, "IN_PROGRESS   ");
        assert_eq!(colored_status(&status), "IN_PROGRESS");
    }

    #[test]
    fn truncate_marks_the_cut() {
        assert_eq!(truncate("a long requirement", 7), "a long…");
    }
}
