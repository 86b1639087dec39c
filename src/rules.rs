//! The validation and coercion rules, called with already-resolved values.
//!
//! Every rule takes the raw field value (and any comparison targets) as plain strings. Resolving
//! a sibling field reference into its value is the caller's job; see
//! [`Constraint`](crate::Constraint) for rules bound to a live submission.

use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;

use crate::dialect::Grammar;
use crate::dialect::MYSQL_DATE;
use crate::dialect::MYSQL_DATETIME;
use crate::dialect::MYSQL_TIMESTAMP;
use crate::dialect::PG_DATETIME;
use crate::error::ErrorKind;
use crate::parser;
use crate::strict_parse;
use crate::CalendarInstant;
use crate::Rejection;
use crate::RuleResult;

/// Parse the value with the given pattern.
pub fn to_datetime(value: &str, pattern: &str) -> RuleResult<CalendarInstant> {
  strict_parse(value, pattern)
}

/// Build an instant from separate calendar parts.
///
/// `parts` holds the year, month and day, then optionally the hour, minute and second. The first
/// three must be present and non-empty; missing or empty time parts count as zero. Anything after
/// the sixth part is ignored.
pub fn ymd_to_datetime(parts: &[&str]) -> RuleResult<CalendarInstant> {
  let src = parts.join("-");
  let required = |ix: usize| match parts.get(ix) {
    Some(part) if !part.is_empty() => Ok(*part),
    _ => Err(Rejection::new(&src, ErrorKind::Missing)),
  };
  let optional = |ix: usize| parts.get(ix).copied().filter(|part| !part.is_empty()).unwrap_or("0");

  let year = number::<i32>(required(0)?)?;
  let month = number(required(1)?)?;
  let day = number(required(2)?)?;
  let hour = number(optional(3))?;
  let minute = number(optional(4))?;
  let second = number(optional(5))?;

  parser::from_calendar(&src, (year, month, day), (hour, minute, second)).map(CalendarInstant::from)
}

fn number<I: std::str::FromStr>(part: &str) -> RuleResult<I> {
  part.parse().map_err(|_| Rejection::new(part, ErrorKind::Unexpected))
}

/// The midnight instant that begins the given day.
fn start_of(today: NaiveDate) -> NaiveDateTime {
  today.and_time(NaiveTime::MIN)
}

/// Accept an instant no later than the start of `today`.
fn not_after_today(instant: CalendarInstant, today: NaiveDate) -> RuleResult<CalendarInstant> {
  match instant.value <= start_of(today) {
    true => Ok(instant),
    false => Err(Rejection::new(&instant.to_string(), ErrorKind::TooLate)),
  }
}

/// Accept an instant no earlier than the start of `today`.
fn not_before_today(instant: CalendarInstant, today: NaiveDate) -> RuleResult<CalendarInstant> {
  match instant.value >= start_of(today) {
    true => Ok(instant),
    false => Err(Rejection::new(&instant.to_string(), ErrorKind::TooEarly)),
  }
}

/// Parse the value, accepting it if it falls on or before the start of `today`.
pub fn before_today(value: &str, pattern: &str, today: NaiveDate) -> RuleResult<CalendarInstant> {
  not_after_today(strict_parse(value, pattern)?, today)
}

/// Parse the value, accepting it if it falls on or after the start of `today`.
pub fn after_today(value: &str, pattern: &str, today: NaiveDate) -> RuleResult<CalendarInstant> {
  not_before_today(strict_parse(value, pattern)?, today)
}

/// Like [`ymd_to_datetime`], accepting instants on or before the start of `today`.
pub fn ymd_before_today(parts: &[&str], today: NaiveDate) -> RuleResult<CalendarInstant> {
  not_after_today(ymd_to_datetime(parts)?, today)
}

/// Like [`ymd_to_datetime`], accepting instants on or after the start of `today`.
pub fn ymd_after_today(parts: &[&str], today: NaiveDate) -> RuleResult<CalendarInstant> {
  not_before_today(ymd_to_datetime(parts)?, today)
}

/// Accept the value if it is strictly earlier than `target`. Both are read with `pattern`.
pub fn before_datetime(value: &str, pattern: &str, target: &str) -> RuleResult<CalendarInstant> {
  let instant = strict_parse(value, pattern)?;
  let target = strict_parse(target, pattern)?;
  match instant < target {
    true => Ok(instant),
    false => Err(Rejection::new(value, ErrorKind::TooLate)),
  }
}

/// Accept the value if it is strictly later than `target`. Both are read with `pattern`.
pub fn after_datetime(value: &str, pattern: &str, target: &str) -> RuleResult<CalendarInstant> {
  let instant = strict_parse(value, pattern)?;
  let target = strict_parse(target, pattern)?;
  match instant > target {
    true => Ok(instant),
    false => Err(Rejection::new(value, ErrorKind::TooEarly)),
  }
}

/// Accept the value if it lies strictly between `earliest` and `latest`. All three are read with
/// `pattern`.
pub fn between_datetimes(
  value: &str, pattern: &str, earliest: &str, latest: &str,
) -> RuleResult<CalendarInstant> {
  let instant = strict_parse(value, pattern)?;
  let earliest = strict_parse(earliest, pattern)?;
  let latest = strict_parse(latest, pattern)?;
  if instant <= earliest {
    Err(Rejection::new(value, ErrorKind::TooEarly))?;
  }
  if instant >= latest {
    Err(Rejection::new(value, ErrorKind::TooLate))?;
  }
  Ok(instant)
}

/// Read the value as a MySQL `DATETIME` string (`YYYY-MM-DD HH:MM:SS`).
pub fn to_mysql_datetime(value: &str, grammar: Grammar<'_>) -> RuleResult<String> {
  let dt = match grammar {
    Grammar::Pattern(pattern) => parser::parse_naive(value, pattern)?,
    Grammar::Native(dialect) => dialect.parse_datetime(value)?,
  };
  Ok(dt.format(MYSQL_DATETIME).to_string())
}

/// Read the value as a MySQL `DATE` string (`YYYY-MM-DD`).
pub fn to_mysql_date(value: &str, grammar: Grammar<'_>) -> RuleResult<String> {
  let date = match grammar {
    Grammar::Pattern(pattern) => parser::parse_naive(value, pattern)?.date(),
    Grammar::Native(dialect) => dialect.parse_date(value)?,
  };
  Ok(date.format(MYSQL_DATE).to_string())
}

/// Read the value as a MySQL `TIMESTAMP` string (`YYYYMMDDHHMMSS`).
pub fn to_mysql_timestamp(value: &str, grammar: Grammar<'_>) -> RuleResult<String> {
  let dt = match grammar {
    Grammar::Pattern(pattern) => parser::parse_naive(value, pattern)?,
    Grammar::Native(dialect) => dialect.parse_timestamp(value)?,
  };
  Ok(dt.format(MYSQL_TIMESTAMP).to_string())
}

/// Read the value as a PostgreSQL `timestamp` string (`YYYY-MM-DD HH:MM:SS[.fraction]`).
pub fn to_pg_datetime(value: &str, grammar: Grammar<'_>) -> RuleResult<String> {
  let dt = match grammar {
    Grammar::Pattern(pattern) => parser::parse_naive(value, pattern)?,
    Grammar::Native(dialect) => dialect.parse_datetime(value)?,
  };
  Ok(dt.format(PG_DATETIME).to_string())
}
