use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use thiserror::Error;

use crate::dialect::Database;
use crate::catalog::Rule;

/// A value that a rule refused.
///
/// Rejections are the ordinary outcome of validating bad input; a host records the field as
/// invalid and carries on. They never indicate a problem with the rule configuration (see
/// [`ConfigError`] for that).
#[derive(Clone, Debug)]
pub struct Rejection {
  /// An owned copy of the rejected input (or of the field name, when a referenced field was
  /// missing).
  pub src: String,
  /// The index in the input string where parsing stopped, if known.
  pub index: Option<usize>,
  /// A machine-readable explanation of the rejection.
  pub kind: ErrorKind,
}

impl Rejection {
  pub(crate) fn new(src: &str, kind: ErrorKind) -> Self {
    Self { src: src.into(), index: None, kind }
  }

  pub(crate) fn at_index(mut self, ix: usize) -> Self {
    self.index = Some(ix);
    self
  }
}

impl Display for Rejection {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self.index {
      Some(ix) => write!(f, "{}\n{}^-----\n{}", self.src, " ".repeat(ix), self.kind),
      None => write!(f, "{}\n{}", self.src, self.kind),
    }
  }
}

impl std::error::Error for Rejection {}

/// The reasons a value can be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
  Missing,
  InputTooShort,
  InputTooLong,
  Unexpected,
  InvalidFormat,
  IncompleteDate,
  InvalidDate,
  TooEarly,
  TooLate,
}

impl Display for ErrorKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "{}", match self {
      Self::Missing => "A required value is missing or empty",
      Self::InputTooShort => "Input terminated unexpectedly before parsing finished",
      Self::InputTooLong => "Parsing finished, but input remains",
      Self::Unexpected => "Input does not conform to format string",
      Self::InvalidFormat => "Could not parse format string",
      Self::IncompleteDate => "Could not determine year, month, day and time from input",
      Self::InvalidDate => "Input does not describe a real calendar date and time",
      Self::TooEarly => "Date is earlier than allowed",
      Self::TooLate => "Date is later than allowed",
    })
  }
}

/// Errors in how a rule was configured.
///
/// These are raised when a constraint is registered, before any value is validated.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("unknown rule `{0}`")]
  UnknownRule(String),

  #[error("rule `{0}` requires a pattern")]
  MissingPattern(Rule),

  #[error("rule `{0}` does not take a pattern")]
  UnexpectedPattern(Rule),

  #[error("rule `{rule}` takes {expected} parameter(s), got {found}")]
  Arity { rule: Rule, expected: &'static str, found: usize },

  #[error("rule `{rule}` has no pattern and no {database} dialect is available")]
  DialectUnavailable { rule: Rule, database: Database },
}
