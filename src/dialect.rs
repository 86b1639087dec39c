//! Database dialects and the layouts used to hand values to them.
//!
//! Database rules read their input either with a caller-supplied pattern or, when no pattern is
//! configured, with the native grammar of the target database. Native grammars are provided by a
//! [`Dialect`]; the built-in MySQL and PostgreSQL dialects are compiled in with the `mysql` and
//! `pg` features respectively.

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;

use chrono::NaiveDate;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ErrorKind;
use crate::parser;
use crate::Rejection;
use crate::RuleResult;

/// MySQL `DATETIME` layout.
pub const MYSQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";
/// MySQL `DATE` layout.
pub const MYSQL_DATE: &str = "%Y-%m-%d";
/// MySQL `TIMESTAMP` layout (fourteen digits, no separators).
pub const MYSQL_TIMESTAMP: &str = "%Y%m%d%H%M%S";
/// PostgreSQL `timestamp` layout. The fraction is only written when non-zero.
pub const PG_DATETIME: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The databases that have a native grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
  Mysql,
  Postgres,
}

impl Display for Database {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Mysql => "MySQL",
      Self::Postgres => "PostgreSQL",
    })
  }
}

/// The native date and time grammar of a database.
pub trait Dialect: Debug + Send + Sync {
  /// The database this dialect reads for.
  fn database(&self) -> Database;

  /// Parse a date and time in the database's native syntax.
  fn parse_datetime(&self, value: &str) -> RuleResult<NaiveDateTime>;

  /// Parse a date in the database's native syntax.
  fn parse_date(&self, value: &str) -> RuleResult<NaiveDate> {
    self.parse_datetime(value).map(|dt| dt.date())
  }

  /// Parse a timestamp in the database's native syntax.
  fn parse_timestamp(&self, value: &str) -> RuleResult<NaiveDateTime> {
    self.parse_datetime(value)
  }
}

/// How a database rule reads its input.
#[derive(Clone, Copy, Debug)]
pub enum Grammar<'a> {
  /// Strictly, against a `strptime` pattern.
  Pattern(&'a str),
  /// With a database's native grammar.
  Native(&'a dyn Dialect),
}

/// Try each pattern in turn, returning the first successful parse.
///
/// A value that fully matches a pattern but names an impossible date is rejected outright.
#[cfg(any(feature = "mysql", feature = "pg"))]
fn first_match(value: &str, patterns: &[&str]) -> RuleResult<NaiveDateTime> {
  let mut rejection = None;
  for pattern in patterns {
    match parser::read_naive(value, pattern) {
      Ok(dt) => return Ok(dt),
      Err(e) if e.kind == ErrorKind::InvalidDate => return Err(e),
      Err(e) => {
        rejection.get_or_insert(e);
      },
    }
  }
  Err(rejection.unwrap_or_else(|| Rejection::new(value, ErrorKind::Unexpected)))
}

/// The MySQL grammar.
///
/// Dates are `YYYY-MM-DD`, date-times are `YYYY-MM-DD HH:MM:SS` with an optional fraction, and
/// timestamps follow the loose grammar of [`parse_loose_timestamp`](crate::parse_loose_timestamp).
/// A date-time is also accepted where a date is expected, and truncated.
#[cfg(feature = "mysql")]
#[derive(Clone, Copy, Debug, Default)]
pub struct MySql;

#[cfg(feature = "mysql")]
impl Dialect for MySql {
  fn database(&self) -> Database {
    Database::Mysql
  }

  fn parse_datetime(&self, value: &str) -> RuleResult<NaiveDateTime> {
    first_match(value, &["%Y-%m-%d %H:%M:%S%.f"])
  }

  fn parse_date(&self, value: &str) -> RuleResult<NaiveDate> {
    first_match(value, &["%Y-%m-%d", "%Y-%m-%d %H:%M:%S%.f"]).map(|dt| dt.date())
  }

  fn parse_timestamp(&self, value: &str) -> RuleResult<NaiveDateTime> {
    parser::parse_loose_timestamp(value)
  }
}

/// The PostgreSQL grammar, restricted to ISO layouts without a time zone.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (optionally with a fraction, and with either a space or `T`
/// between date and time), `YYYY-MM-DD HH:MM`, and a bare `YYYY-MM-DD` at midnight.
#[cfg(feature = "pg")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Postgres;

#[cfg(feature = "pg")]
impl Dialect for Postgres {
  fn database(&self) -> Database {
    Database::Postgres
  }

  fn parse_datetime(&self, value: &str) -> RuleResult<NaiveDateTime> {
    first_match(value, &[
      "%Y-%m-%d %H:%M:%S%.f",
      "%Y-%m-%dT%H:%M:%S%.f",
      "%Y-%m-%d %H:%M",
      "%Y-%m-%d",
    ])
  }
}
