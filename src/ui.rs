//! Status lines for humans. Everything here goes to stderr: stdout carries the
//! scripts that the shell wrapper evaluates.

use anstyle::{AnsiColor, Style};
use is_terminal::IsTerminal;
use std::fmt::Display;
use std::io::{self, Write};
use std::time::{Duration, Instant};

const LABEL_WIDTH: usize = 12;

#[derive(Debug, Clone, Copy)]
enum Tone {
    Neutral,
    Good,
    Warn,
    Bad,
}

impl Tone {
    fn style(self) -> Style {
        let color = match self {
            Tone::Neutral => AnsiColor::Cyan,
            Tone::Good => AnsiColor::Green,
            Tone::Warn => AnsiColor::Yellow,
            Tone::Bad => AnsiColor::Red,
        };
        Style::new().bold().fg_color(Some(color.into()))
    }
}

fn use_color() -> bool {
    io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Right-align `label` in the gutter. Continuation lines of `message` are
/// indented past it.
fn render(tone: Tone, label: &str, message: &str, color: bool) -> String {
    let (on, off) = if color {
        let style = tone.style();
        (style.render().to_string(), style.render_reset().to_string())
    } else {
        (String::new(), String::new())
    };

    let mut out = String::new();
    for (idx, line) in message.split('\n').enumerate() {
        if idx == 0 {
            out.push_str(&format!("{on}{label:>LABEL_WIDTH$}{off} {line}\n"));
        } else {
            out.push_str(&format!("{:>LABEL_WIDTH$} {line}\n", ""));
        }
    }
    out
}

fn emit(tone: Tone, label: &str, message: &str) {
    let mut stderr = io::stderr().lock();
    let _ = stderr.write_all(render(tone, label, message, use_color()).as_bytes());
}

/// Elapsed time as `1m 5s`, `2.35s` or `140ms`.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        match secs % 60 {
            0 => format!("{}m", secs / 60),
            rest => format!("{}m {rest}s", secs / 60),
        }
    } else if secs >= 1 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

pub fn status(label: &str, message: impl Display) {
    emit(Tone::Neutral, label, &message.to_string());
}

pub fn info(message: impl Display) {
    emit(Tone::Neutral, "Info", &message.to_string());
}

pub fn error(message: impl Display) {
    emit(Tone::Bad, "Error", &message.to_string());
}

pub fn success(label: &str, message: impl Display) {
    emit(Tone::Good, label, &message.to_string());
}

/// A timed install line: announced on creation, closed by exactly one of
/// [`Progress::success`], [`Progress::fail`] or [`Progress::cancel`].
pub struct Progress {
    subject: String,
    started: Instant,
}

impl Progress {
    pub fn new(label: &str, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        emit(Tone::Neutral, label, &subject);
        Self {
            subject,
            started: Instant::now(),
        }
    }

    pub fn success(self, label: &str, detail: impl Display) {
        let elapsed = format_elapsed(self.started.elapsed());
        emit(Tone::Good, label, &format!("{} {detail} in {elapsed}", self.subject));
    }

    pub fn fail(self, label: &str, error: impl Display) {
        let elapsed = format_elapsed(self.started.elapsed());
        emit(Tone::Bad, label, &format!("{} after {elapsed}: {error}", self.subject));
    }

    pub fn cancel(self, reason: impl Display) {
        emit(Tone::Warn, "Cancelled", &format!("{} ({reason})", self.subject));
    }
}
