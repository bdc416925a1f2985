//! Terminal styling for the boxed result summary

use colored::*;
use std::fmt::Write;

// box inner width
pub(crate) const W: usize = 58;

pub(crate) fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
pub(crate) fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
pub(crate) fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
pub(crate) fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

/// Accumulates box-drawn lines into a string
#[derive(Debug, Default)]
pub(crate) struct BoxWriter {
    out: String,
}

impl BoxWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn raw(&mut self, line: impl std::fmt::Display) {
        let _ = writeln!(self.out, "  {}", line);
    }

    pub(crate) fn top(&mut self)    { self.raw(dim(&format!("┌{}┐", "─".repeat(W - 1)))); }
    pub(crate) fn bottom(&mut self) { self.raw(dim(&format!("└{}┘", "─".repeat(W - 1)))); }
    pub(crate) fn sep(&mut self)    { self.raw(dim(&format!("├{}┤", "─".repeat(W - 1)))); }

    pub(crate) fn line(&mut self, content: &str) {
        let visible_len = strip_ansi(content).chars().count();
        let pad = W.saturating_sub(visible_len + 2);
        let _ = writeln!(self.out, "  {} {}{}{}", dim("│"), content, " ".repeat(pad), dim("│"));
    }

    pub(crate) fn center(&mut self, content: &str) {
        let visible_len = strip_ansi(content).chars().count();
        let total_pad = W.saturating_sub(visible_len + 1);
        let left = total_pad / 2;
        let right = total_pad - left;
        let _ = writeln!(self.out, "  {}{}{}{}{}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
    }

    pub(crate) fn empty(&mut self) { self.line(""); }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

pub(crate) fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

pub(crate) fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(&format!("{:<18}", key)), val.white())
}

/// Horizontal bar of `width` cells filled in proportion to `fraction`
pub(crate) fn bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0)) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
