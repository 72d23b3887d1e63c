//! CLI output formatting utilities.
//!
//! Buildpack step lines go to stdout in the platform's `----->` style;
//! errors and warnings go to stderr. Colour is used only when the stream
//! supports it.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use netpack_lib::report::Reporter;

pub mod symbols {
  pub const STEP: &str = "----->";
  pub const DETAIL: &str = "      ";
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
}

/// Milliseconds-precision human duration, e.g. `1s 250ms`.
pub fn format_duration(duration: Duration) -> String {
  let rounded = Duration::from_millis(duration.as_millis() as u64);
  humantime::format_duration(rounded).to_string()
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Prints build progress to the terminal.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
  fn step(&self, message: &str) {
    println!(
      "{} {}",
      symbols::STEP.if_supports_color(Stream::Stdout, |s| s.cyan()),
      message
    );
  }

  fn detail(&self, message: &str) {
    println!("{} {}", symbols::DETAIL, message);
  }

  fn warn(&self, message: &str) {
    print_warning(message);
  }
}
