use std::cmp::Ordering;
use std::fmt::Display;
use std::fmt::Formatter;

use chrono::Datelike;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::Timelike;

/// The layout used to display an instant that was not read with a pattern.
pub(crate) const DEFAULT_PATTERN: &str = "%Y-%m-%dT%H:%M:%S";

/// A validated calendar date and time.
///
/// The instant remembers the pattern it was parsed with, so that displaying it reproduces the
/// layout the value was submitted in. Comparison and equality only consider the date and time
/// itself.
#[derive(Clone, Debug)]
pub struct CalendarInstant {
  pub(crate) value: NaiveDateTime,
  pub(crate) pattern: Option<String>,
}

impl CalendarInstant {
  pub(crate) fn new(value: NaiveDateTime, pattern: Option<&str>) -> Self {
    Self { value, pattern: pattern.map(Into::into) }
  }

  /// The calendar year.
  #[inline]
  pub fn year(&self) -> i32 {
    self.value.year()
  }

  /// The calendar month, between 1 and 12, inclusive.
  #[inline]
  pub fn month(&self) -> u32 {
    self.value.month()
  }

  /// The day of the month; between 1 and 31, inclusive.
  #[inline]
  pub fn day(&self) -> u32 {
    self.value.day()
  }

  /// The hour; between 0 and 23, inclusive.
  #[inline]
  pub fn hour(&self) -> u32 {
    self.value.hour()
  }

  /// The minute; between 0 and 59, inclusive.
  #[inline]
  pub fn minute(&self) -> u32 {
    self.value.minute()
  }

  /// The second; between 0 and 59, inclusive.
  #[inline]
  pub fn second(&self) -> u32 {
    self.value.second()
  }

  /// The pattern this instant was parsed with, if any.
  #[inline]
  pub fn pattern(&self) -> Option<&str> {
    self.pattern.as_deref()
  }

  /// The calendar date, discarding the time.
  #[inline]
  pub fn date(&self) -> NaiveDate {
    self.value.date()
  }

  /// The underlying `chrono` value.
  #[inline]
  pub const fn naive(&self) -> NaiveDateTime {
    self.value
  }
}

impl Display for CalendarInstant {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.value.format(self.pattern().unwrap_or(DEFAULT_PATTERN)))
  }
}

impl PartialEq for CalendarInstant {
  fn eq(&self, other: &Self) -> bool {
    self.value == other.value
  }
}

impl Eq for CalendarInstant {}

impl PartialOrd for CalendarInstant {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for CalendarInstant {
  fn cmp(&self, other: &Self) -> Ordering {
    self.value.cmp(&other.value)
  }
}

impl From<NaiveDateTime> for CalendarInstant {
  fn from(value: NaiveDateTime) -> Self {
    Self { value, pattern: None }
  }
}

/// The value a rule hands back to the host for a field that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Coerced {
  /// A structured date and time.
  Instant(CalendarInstant),
  /// A database-specific string.
  Text(String),
}

impl Coerced {
  /// The instant, if this rule produced one.
  pub fn as_instant(&self) -> Option<&CalendarInstant> {
    match self {
      Self::Instant(instant) => Some(instant),
      Self::Text(_) => None,
    }
  }

  /// The database string, if this rule produced one.
  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Instant(_) => None,
      Self::Text(text) => Some(text),
    }
  }
}

impl Display for Coerced {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Instant(instant) => Display::fmt(instant, f),
      Self::Text(text) => f.write_str(text),
    }
  }
}

impl From<CalendarInstant> for Coerced {
  fn from(instant: CalendarInstant) -> Self {
    Self::Instant(instant)
  }
}

impl From<String> for Coerced {
  fn from(text: String) -> Self {
    Self::Text(text)
  }
}
