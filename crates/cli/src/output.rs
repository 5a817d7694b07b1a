//! Terminal output for load results.
//!
//! Status lines carry a marker whose color follows the outcome; JSON output
//! goes to stdout untouched so it can be piped.

use std::fmt;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Outcome a status line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Loaded,
  Failed,
  Partial,
}

impl Status {
  pub fn marker(self) -> &'static str {
    match self {
      Status::Loaded => "✓",
      Status::Failed => "✗",
      Status::Partial => "⚠",
    }
  }

  /// Successful outcomes go to stdout, the rest to stderr.
  fn stream(self) -> Stream {
    match self {
      Status::Loaded => Stream::Stdout,
      Status::Failed | Status::Partial => Stream::Stderr,
    }
  }
}

/// Marker printed in front of each environment in verbose listings.
pub const ITEM: &str = "•";

/// Print `message` behind the marker for `status`.
pub fn status(status: Status, message: impl fmt::Display) {
  let stream = status.stream();
  let marker = status.marker();
  let line = match status {
    Status::Loaded => format!("{} {}", marker.if_supports_color(stream, |s| s.green()), message),
    Status::Failed => format!(
      "{} {}",
      marker.if_supports_color(stream, |s| s.red()),
      message.if_supports_color(stream, |s| s.red())
    ),
    Status::Partial => format!(
      "{} {}",
      marker.if_supports_color(stream, |s| s.yellow()),
      message.if_supports_color(stream, |s| s.yellow())
    ),
  };

  if status == Status::Loaded {
    println!("{}", line);
  } else {
    eprintln!("{}", line);
  }
}

/// Print an indented `label: value` detail line under a status line.
pub fn detail(label: &str, value: impl fmt::Display) {
  let label = format!("{:<12}", format!("{}:", label));
  println!("  {} {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// Short human form of a load duration: `850µs`, `42ms`, `1.2s`.
pub fn elapsed(duration: Duration) -> String {
  let micros = duration.as_micros();
  if micros < 1_000 {
    format!("{}µs", micros)
  } else if micros < 1_000_000 {
    format!("{}ms", micros / 1_000)
  } else {
    format!("{:.1}s", duration.as_secs_f64())
  }
}

/// Write `value` to stdout as pretty JSON.
pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let out = serde_json::to_string_pretty(value).context("Failed to serialize output as JSON")?;
  println!("{}", out);
  Ok(())
}
