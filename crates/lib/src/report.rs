//! User-facing build progress.
//!
//! The library never prints. Steps a buildpack user should see (`Installing
//! dotnet-sdk 8.0.100`, command output on failure) go through a [`Reporter`]
//! supplied by the caller; diagnostics go through `tracing`.

use std::cell::RefCell;

/// Receives user-visible build progress.
pub trait Reporter {
  /// A top-level build step, e.g. `Installing node 20.11.0`.
  fn step(&self, message: &str);

  /// Detail belonging to the most recent step.
  fn detail(&self, message: &str);

  /// A non-fatal problem.
  fn warn(&self, message: &str);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
  fn step(&self, _message: &str) {}
  fn detail(&self, _message: &str) {}
  fn warn(&self, _message: &str) {}
}

/// One recorded reporter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
  Step(String),
  Detail(String),
  Warn(String),
}

/// Records every call, for tests and for callers that render output later.
#[derive(Debug, Default)]
pub struct MemoryReporter {
  lines: RefCell<Vec<ReportLine>>,
}

impl MemoryReporter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn lines(&self) -> Vec<ReportLine> {
    self.lines.borrow().clone()
  }

  /// Messages passed to [`Reporter::step`], in order.
  pub fn steps(&self) -> Vec<String> {
    self
      .lines
      .borrow()
      .iter()
      .filter_map(|l| match l {
        ReportLine::Step(s) => Some(s.clone()),
        _ => None,
      })
      .collect()
  }
}

impl Reporter for MemoryReporter {
  fn step(&self, message: &str) {
    self.lines.borrow_mut().push(ReportLine::Step(message.to_string()));
  }

  fn detail(&self, message: &str) {
    self.lines.borrow_mut().push(ReportLine::Detail(message.to_string()));
  }

  fn warn(&self, message: &str) {
    self.lines.borrow_mut().push(ReportLine::Warn(message.to_string()));
  }
}
