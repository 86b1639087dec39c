use std::fmt::Write;
use std::iter::Peekable;
use std::ops::Deref;
use std::ops::DerefMut;
use std::str::Chars;

use chrono::format::Fixed;
use chrono::format::Item;
use chrono::format::Numeric;
use chrono::format::ParseErrorKind;
use chrono::format::StrftimeItems;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;

use crate::error::ErrorKind;
use crate::CalendarInstant;
use crate::Rejection;
use crate::RuleResult;

/// Parse a value against a `strptime` pattern, requiring the whole input to match and the result
/// to be a real calendar date.
///
/// If the pattern contains no time-of-day directives, the instant is placed at midnight. If it
/// contains any, the time must be fully determined (an hour with no minute is rejected).
///
/// Time zone directives (`%z`, `%Z`, `%+`, ...) are rejected as an invalid format.
///
/// ## Example
///
/// ```
/// use datetime_rules::strict_parse;
/// let instant = strict_parse("02-17-2005", "%m-%d-%Y").unwrap();
/// assert_eq!((instant.year(), instant.month(), instant.day()), (2005, 2, 17));
/// assert_eq!(instant.to_string(), "02-17-2005");
/// assert!(strict_parse("02-31-2005", "%m-%d-%Y").is_err());
/// ```
pub fn strict_parse(value: &str, pattern: &str) -> RuleResult<CalendarInstant> {
  parse_naive(value, pattern).map(|naive| CalendarInstant::new(naive, Some(pattern)))
}

/// Parse a value against a `strptime` pattern into a bare `chrono` value.
///
/// The value must be exactly what the pattern produces for the parsed date, so padding, leading
/// whitespace and signs the pattern does not ask for are rejected. Patterns whose output cannot be
/// written for a date without a time zone are an invalid format.
pub(crate) fn parse_naive(value: &str, pattern: &str) -> RuleResult<NaiveDateTime> {
  let naive = read_naive(value, pattern)?;
  let mut echo = String::with_capacity(value.len());
  if write!(echo, "{}", naive.format(pattern)).is_err() {
    return Err(Rejection::new(value, ErrorKind::InvalidFormat));
  }
  match echo == value {
    true => Ok(naive),
    false => Err(Rejection::new(value, ErrorKind::Unexpected)),
  }
}

/// Parse a value against a `strptime` pattern, accepting whatever `chrono` accepts.
pub(crate) fn read_naive(value: &str, pattern: &str) -> RuleResult<NaiveDateTime> {
  let parsed = match pattern_has_time(value, pattern)? {
    true => NaiveDateTime::parse_from_str(value, pattern),
    false => NaiveDate::parse_from_str(value, pattern).map(|date| date.and_time(NaiveTime::MIN)),
  };
  parsed.map_err(|e| Rejection::new(value, kind_of(e.kind())))
}

/// Inspect a pattern, reporting whether it describes a time of day.
fn pattern_has_time(value: &str, pattern: &str) -> RuleResult<bool> {
  let mut has_time = false;
  for item in StrftimeItems::new(pattern) {
    match item {
      Item::Error => return Err(Rejection::new(value, ErrorKind::InvalidFormat)),
      Item::Numeric(
        Numeric::Hour | Numeric::Hour12 | Numeric::Minute | Numeric::Second | Numeric::Timestamp,
        _,
      )
      | Item::Fixed(Fixed::LowerAmPm | Fixed::UpperAmPm) => has_time = true,
      Item::Fixed(
        Fixed::TimezoneName
        | Fixed::TimezoneOffset
        | Fixed::TimezoneOffsetZ
        | Fixed::TimezoneOffsetColon
        | Fixed::TimezoneOffsetColonZ
        | Fixed::TimezoneOffsetDoubleColon
        | Fixed::TimezoneOffsetTripleColon
        | Fixed::RFC2822
        | Fixed::RFC3339,
      ) => return Err(Rejection::new(value, ErrorKind::InvalidFormat)),
      _ => {},
    }
  }
  Ok(has_time)
}

fn kind_of(kind: ParseErrorKind) -> ErrorKind {
  match kind {
    ParseErrorKind::OutOfRange | ParseErrorKind::Impossible => ErrorKind::InvalidDate,
    ParseErrorKind::NotEnough => ErrorKind::IncompleteDate,
    ParseErrorKind::TooShort => ErrorKind::InputTooShort,
    ParseErrorKind::TooLong => ErrorKind::InputTooLong,
    ParseErrorKind::BadFormat => ErrorKind::InvalidFormat,
    _ => ErrorKind::Unexpected,
  }
}

/// Build a date and time from numeric calendar fields, rejecting impossible combinations.
pub(crate) fn from_calendar(
  src: &str, (year, month, day): (i32, u32, u32), (hour, minute, second): (u32, u32, u32),
) -> RuleResult<NaiveDateTime> {
  NaiveDate::from_ymd_opt(year, month, day)
    .and_then(|date| date.and_hms_opt(hour, minute, second))
    .ok_or_else(|| Rejection::new(src, ErrorKind::InvalidDate))
}

/// Parse a loosely separated timestamp.
///
/// The input must consist of a four-digit year followed by five two-digit fields (month, day,
/// hour, minute, second), each of which may be preceded by any run of non-digit characters. This
/// is the grammar `\d{4}\D*\d{2}\D*\d{2}\D*\d{2}\D*\d{2}\D*\d{2}`, matched at the leftmost
/// position where it fits; text around the match is ignored. The captured fields must form a real
/// date and time.
///
/// ## Example
///
/// ```
/// use datetime_rules::parse_loose_timestamp;
/// let a = parse_loose_timestamp("20050217143000").unwrap();
/// let b = parse_loose_timestamp("2005-02-17 14:30:00").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(parse_loose_timestamp("2005-02-17 14:30:00.000000").unwrap(), a);
/// assert!(parse_loose_timestamp("2005-02-31 14:30:00").is_err());
/// ```
pub fn parse_loose_timestamp(value: &str) -> RuleResult<NaiveDateTime> {
  let mut first: Option<Rejection> = None;
  for (start, _) in value.char_indices() {
    match Input::at(value, start).parse_timestamp_fields() {
      Ok([year, month, day, hour, minute, second]) => {
        return from_calendar(value, (year as i32, month, day), (hour, minute, second));
      },
      Err(e) if first.is_none() => first = Some(e),
      Err(_) => {},
    }
  }
  Err(first.unwrap_or_else(|| Input::new(value).err(ErrorKind::InputTooShort)))
}

/// A wrapper around the original input, capable of easily handling errors.
struct Input<'a> {
  src: &'a str,
  chars: Peekable<Chars<'a>>,
}

impl<'a> Input<'a> {
  fn new(src: &'a str) -> Self {
    Self::at(src, 0)
  }

  /// Begin reading at the given byte offset, which must be a character boundary.
  fn at(src: &'a str, start: usize) -> Self {
    Self { src, chars: src[start..].chars().peekable() }
  }
}

impl<'a> Deref for Input<'a> {
  type Target = Peekable<Chars<'a>>;

  fn deref(&self) -> &Self::Target {
    &self.chars
  }
}

impl<'a> DerefMut for Input<'a> {
  fn deref_mut(&mut self) -> &mut Self::Target {
    &mut self.chars
  }
}

impl<'a> Input<'a> {
  /// Parse exactly the given number of ASCII digits.
  fn parse_digits(&mut self, digits: usize) -> RuleResult<u32> {
    let mut n = 0;
    for _ in 0..digits {
      let Some(ch) = self.peek().copied() else { return self.fail(ErrorKind::InputTooShort) };
      let Some(digit) = ch.to_digit(10) else { return self.fail(ErrorKind::Unexpected) };
      self.next();
      n = n * 10 + digit;
    }
    Ok(n)
  }

  /// Read a four-digit year and five two-digit fields, each optionally preceded by non-digits.
  fn parse_timestamp_fields(&mut self) -> RuleResult<[u32; 6]> {
    let mut fields = [0; 6];
    fields[0] = self.parse_digits(4)?;
    for field in fields[1..].iter_mut() {
      self.skip_non_digits();
      *field = self.parse_digits(2)?;
    }
    Ok(fields)
  }

  /// Discard any run of characters that are not ASCII digits.
  fn skip_non_digits(&mut self) {
    while self.next_if(|c| !c.is_ascii_digit()).is_some() {}
  }

  /// Generate a rejection pointing at the current position.
  fn err(&self, kind: ErrorKind) -> Rejection {
    Rejection::new(self.src, kind)
      .at_index(self.src.len() - self.chars.clone().map(char::len_utf8).sum::<usize>())
  }

  fn fail<T>(&self, kind: ErrorKind) -> RuleResult<T> {
    Err(self.err(kind))
  }
}
