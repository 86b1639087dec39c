#![cfg(test)]

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use assert2::check;
use assert2::let_assert;
use chrono::NaiveDate;
use chrono::NaiveDateTime;

use crate::dialect::Grammar;
use crate::rules;
use crate::CalendarInstant;
use crate::Coerced;
use crate::ConfigError;
use crate::ConstraintSpec;
use crate::Database;
use crate::Dialect;
use crate::ErrorKind;
use crate::Param;
use crate::Profile;
use crate::Rule;
use crate::RuleResult;
use crate::RuleSet;

impl CalendarInstant {
  pub(crate) fn ymd(&self) -> (i32, u32, u32) {
    (self.year(), self.month(), self.day())
  }

  pub(crate) fn hms(&self) -> (u32, u32, u32) {
    (self.hour(), self.minute(), self.second())
  }
}

fn mid_june() -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn submission(pairs: &[(&str, &str)]) -> HashMap<String, String> {
  pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_to_datetime_round_trip() -> RuleResult<()> {
  let instant = rules::to_datetime("02-17-2005", "%m-%d-%Y")?;
  check!(instant.ymd() == (2005, 2, 17));
  check!(instant.hms() == (0, 0, 0));
  check!(instant.to_string() == "02-17-2005");
  check!(instant.pattern() == Some("%m-%d-%Y"));

  let instant = rules::to_datetime("2005-02-17 14:06:14", "%Y-%m-%d %H:%M:%S")?;
  check!(instant.hms() == (14, 6, 14));
  check!(instant.to_string() == "2005-02-17 14:06:14");

  let instant = rules::to_datetime("Thursday, February 17, 2005", "%A, %B %d, %Y")?;
  check!(instant.to_string() == "Thursday, February 17, 2005");
  Ok(())
}

#[test]
fn test_to_datetime_rejects_impossible_dates() {
  let_assert!(Err(e) = rules::to_datetime("02-31-2005", "%m-%d-%Y"));
  check!(e.kind == ErrorKind::InvalidDate);
  check!(rules::to_datetime("02-29-2005", "%m-%d-%Y").is_err());
  check!(rules::to_datetime("02-29-2004", "%m-%d-%Y").is_ok());
  check!(rules::to_datetime("13-01-2005", "%m-%d-%Y").is_err());
}

#[test]
fn test_to_datetime_rejects_malformed_input() {
  check!(rules::to_datetime("2", "%m-%d-%Y").is_err());
  check!(rules::to_datetime("0-312-005", "%m-%d-%Y").is_err());
  check!(rules::to_datetime("", "%m-%d-%Y").is_err());
  let_assert!(Err(e) = rules::to_datetime("02-17-2005 trailing", "%m-%d-%Y"));
  check!(e.kind == ErrorKind::InputTooLong);
}

#[test]
fn test_strict_parse_pattern_edge_cases() {
  // An hour without a minute does not determine a time.
  let_assert!(Err(e) = rules::to_datetime("2005-02-17 14", "%Y-%m-%d %H"));
  check!(e.kind == ErrorKind::IncompleteDate);
  // A time without a date is not an instant.
  check!(rules::to_datetime("14:06", "%H:%M").is_err());
  // Time zones are out of scope.
  let_assert!(Err(e) = rules::to_datetime("2005-02-17 +0100", "%Y-%m-%d %z"));
  check!(e.kind == ErrorKind::InvalidFormat);
  let_assert!(Err(e) = rules::to_datetime("2005-02-17", "%Y-%m-%Q"));
  check!(e.kind == ErrorKind::InvalidFormat);
}

#[test]
fn test_unwritable_pattern_is_invalid_format() {
  let_assert!(Err(e) = rules::to_datetime("2005-02-17 +0000", "%Y-%m-%d %#z"));
  check!(e.kind == ErrorKind::InvalidFormat);
  let_assert!(Err(e) = rules::before_today("2099-02-17 +0000", "%Y-%m-%d %#z", mid_june()));
  check!(e.kind == ErrorKind::InvalidFormat);
  let_assert!(Err(e) = rules::after_today("1999-02-17 +0000", "%Y-%m-%d %#z", mid_june()));
  check!(e.kind == ErrorKind::InvalidFormat);
}

#[test]
fn test_to_datetime_requires_exact_layout() {
  for value in [" 02-17-2005", "02- 17-2005", "02-17-+2005", "2-17-2005"] {
    let_assert!(Err(e) = rules::to_datetime(value, "%m-%d-%Y"));
    check!(e.kind == ErrorKind::Unexpected, "value: {value:?}");
  }
  let_assert!(Err(e) = rules::to_datetime("2005-02-17  14:06:14", "%Y-%m-%d %H:%M:%S"));
  check!(e.kind == ErrorKind::Unexpected);
  let us = Grammar::Pattern("%m/%d/%Y");
  check!(rules::to_mysql_datetime("2/17/2005", us).is_err());
}

#[test]
fn test_ymd_to_datetime() -> RuleResult<()> {
  let instant = rules::ymd_to_datetime(&["2005", "2", "17"])?;
  check!(instant.ymd() == (2005, 2, 17));
  check!(instant.hms() == (0, 0, 0));
  check!(instant.to_string() == "2005-02-17T00:00:00");

  let instant = rules::ymd_to_datetime(&["2005", "2", "17", "14", "6", "14"])?;
  check!(instant.hms() == (14, 6, 14));

  let instant = rules::ymd_to_datetime(&["2005", "02", "17", "", "30"])?;
  check!(instant.hms() == (0, 30, 0));
  Ok(())
}

#[test]
fn test_ymd_to_datetime_failures() {
  let_assert!(Err(e) = rules::ymd_to_datetime(&["2005", "2", "31"]));
  check!(e.kind == ErrorKind::InvalidDate);
  let_assert!(Err(e) = rules::ymd_to_datetime(&["2005", "", "17"]));
  check!(e.kind == ErrorKind::Missing);
  check!(e.src == "2005--17");
  check!(rules::ymd_to_datetime(&["2005", "2"]).is_err());
  check!(rules::ymd_to_datetime(&["2005", "feb", "17"]).is_err());
  check!(rules::ymd_to_datetime(&["2005", "2", "17", "24"]).is_err());
}

#[test]
fn test_before_today_is_inclusive() {
  let today = mid_june();
  check!(rules::before_today("2024-06-14", "%Y-%m-%d", today).is_ok());
  check!(rules::before_today("2024-06-15", "%Y-%m-%d", today).is_ok());
  let_assert!(Err(e) = rules::before_today("2024-06-16", "%Y-%m-%d", today));
  check!(e.kind == ErrorKind::TooLate);
  check!(rules::before_today("2024-06-15 00:00:01", "%Y-%m-%d %H:%M:%S", today).is_err());
  check!(rules::before_today("2024-06-31", "%Y-%m-%d", today).is_err());
}

#[test]
fn test_after_today_is_inclusive() {
  let today = mid_june();
  check!(rules::after_today("2024-06-16", "%Y-%m-%d", today).is_ok());
  check!(rules::after_today("2024-06-15", "%Y-%m-%d", today).is_ok());
  let_assert!(Err(e) = rules::after_today("2024-06-14", "%Y-%m-%d", today));
  check!(e.kind == ErrorKind::TooEarly);
}

#[test]
fn test_ymd_today_rules() {
  let today = mid_june();
  check!(rules::ymd_before_today(&["2024", "6", "15"], today).is_ok());
  check!(rules::ymd_before_today(&["2024", "6", "16"], today).is_err());
  check!(rules::ymd_after_today(&["2024", "6", "15"], today).is_ok());
  check!(rules::ymd_after_today(&["2024", "6", "14"], today).is_err());
  check!(rules::ymd_after_today(&["2024", "", "14"], today).is_err());
}

#[test]
fn test_before_and_after_datetime_are_strict() {
  let p = "%Y-%m-%d";
  check!(rules::before_datetime("2005-02-16", p, "2005-02-17").is_ok());
  check!(rules::before_datetime("2005-02-17", p, "2005-02-17").is_err());
  check!(rules::before_datetime("2005-02-18", p, "2005-02-17").is_err());
  check!(rules::after_datetime("2005-02-18", p, "2005-02-17").is_ok());
  check!(rules::after_datetime("2005-02-17", p, "2005-02-17").is_err());
  check!(rules::after_datetime("2005-02-16", p, "2005-02-17").is_err());

  // The target must parse with the same pattern.
  let_assert!(Err(e) = rules::before_datetime("2005-02-16", p, "02/17/2005"));
  check!(e.src == "02/17/2005");
}

#[test]
fn test_between_datetimes() -> RuleResult<()> {
  let p = "%Y-%m-%d %H:%M";
  let (lo, hi) = ("2005-02-17 09:00", "2005-02-17 17:00");
  check!(rules::between_datetimes("2005-02-17 12:30", p, lo, hi)?.hms() == (12, 30, 0));
  check!(rules::between_datetimes("2005-02-17 09:00", p, lo, hi).is_err());
  check!(rules::between_datetimes("2005-02-17 17:00", p, lo, hi).is_err());
  check!(rules::between_datetimes("2005-02-17 08:59", p, lo, hi).is_err());
  check!(rules::between_datetimes("2005-02-17 12:30", p, lo, "tomorrow").is_err());
  Ok(())
}

#[test]
#[cfg(feature = "mysql")]
fn test_to_mysql_datetime() -> RuleResult<()> {
  let native = crate::dialect::MySql;
  let g = Grammar::Native(&native);
  check!(rules::to_mysql_datetime("2005-02-17 00:00:00", g)? == "2005-02-17 00:00:00");
  let us = Grammar::Pattern("%m/%d/%Y");
  check!(rules::to_mysql_datetime("02/17/2005", us)? == "2005-02-17 00:00:00");
  check!(rules::to_mysql_datetime("02/17/2005", g).is_err());
  check!(rules::to_mysql_datetime("2005-02-30 00:00:00", g).is_err());
  Ok(())
}

#[test]
#[cfg(feature = "mysql")]
fn test_to_mysql_date() -> RuleResult<()> {
  let native = crate::dialect::MySql;
  let g = Grammar::Native(&native);
  check!(rules::to_mysql_date("2005-02-17", g)? == "2005-02-17");
  check!(rules::to_mysql_date("2005-02-17 14:06:14", g)? == "2005-02-17");
  check!(rules::to_mysql_date("Feb 17 2005", Grammar::Pattern("%b %d %Y"))? == "2005-02-17");
  check!(rules::to_mysql_date("2005-02-31", g).is_err());
  Ok(())
}

#[test]
#[cfg(feature = "mysql")]
fn test_to_mysql_timestamp() -> RuleResult<()> {
  let native = crate::dialect::MySql;
  let g = Grammar::Native(&native);
  check!(rules::to_mysql_timestamp("20050217000000", g)? == "20050217000000");
  check!(rules::to_mysql_timestamp("2005-02-17 00:00:00", g)? == "20050217000000");
  check!(rules::to_mysql_timestamp("2005/02/17T14h06m14", g)? == "20050217140614");
  let us = Grammar::Pattern("%m/%d/%Y");
  check!(rules::to_mysql_timestamp("02/17/2005", us)? == "20050217000000");
  check!(rules::to_mysql_timestamp("20050231000000", g).is_err());
  check!(rules::to_mysql_timestamp("2005021700000", g).is_err());
  check!(rules::to_mysql_timestamp("2005-02-17 14:06:14.250000", g)? == "20050217140614");
  Ok(())
}

#[test]
fn test_loose_timestamp_grammar() {
  let_assert!(Ok(dt) = crate::parse_loose_timestamp("2005-02-17 14:06:14"));
  check!(dt == NaiveDate::from_ymd_opt(2005, 2, 17).unwrap().and_hms_opt(14, 6, 14).unwrap());

  let_assert!(Err(e) = crate::parse_loose_timestamp("2005-02-17"));
  check!(e.kind == ErrorKind::InputTooShort);
  check!(e.index == Some(10));
  // Each group is exactly two digits.
  let_assert!(Err(e) = crate::parse_loose_timestamp("2005-2-17 00:00:00"));
  check!(e.kind == ErrorKind::Unexpected);
  check!(crate::parse_loose_timestamp("2005021700000").is_err());
  check!(crate::parse_loose_timestamp("2005-13-01 00:00:00").is_err());
}

#[test]
fn test_loose_timestamp_ignores_surrounding_text() {
  let midnight = NaiveDate::from_ymd_opt(2005, 2, 17).unwrap().and_hms_opt(0, 0, 0).unwrap();
  check!(crate::parse_loose_timestamp("20050217000000.5").ok() == Some(midnight));
  check!(crate::parse_loose_timestamp("2005-02-17 00:00:00.000000").ok() == Some(midnight));
  check!(crate::parse_loose_timestamp(" 20050217000000").ok() == Some(midnight));
  check!(crate::parse_loose_timestamp("at 2005-02-17 00:00:00 UTC").ok() == Some(midnight));
  // The leftmost match wins, even when a later one would be a real date.
  let_assert!(Err(e) = crate::parse_loose_timestamp("x99999999999999 20050217000000"));
  check!(e.kind == ErrorKind::InvalidDate);
}

#[test]
#[cfg(feature = "pg")]
fn test_to_pg_datetime() -> RuleResult<()> {
  let native = crate::dialect::Postgres;
  let g = Grammar::Native(&native);
  check!(rules::to_pg_datetime("2005-02-17 14:06:14", g)? == "2005-02-17 14:06:14");
  check!(rules::to_pg_datetime("2005-02-17T14:06:14.250", g)? == "2005-02-17 14:06:14.250");
  check!(rules::to_pg_datetime("2005-02-17 14:06", g)? == "2005-02-17 14:06:00");
  check!(rules::to_pg_datetime("2005-02-17", g)? == "2005-02-17 00:00:00");
  let eu = Grammar::Pattern("%d/%m/%Y");
  check!(rules::to_pg_datetime("17/02/2005", eu)? == "2005-02-17 00:00:00");
  check!(rules::to_pg_datetime("2005-02-17 14:06:14+01", g).is_err());
  check!(rules::to_pg_datetime("2005-02-30", g).is_err());
  Ok(())
}

#[test]
fn test_rule_names() -> Result<(), ConfigError> {
  for rule in Rule::ALL {
    check!(rule.name().parse::<Rule>()? == rule);
  }
  let_assert!(Err(ConfigError::UnknownRule(name)) = "to_oracle_date".parse::<Rule>());
  check!(name == "to_oracle_date");
  Ok(())
}

#[test]
fn test_registration_errors() {
  let rule_set = RuleSet::new();
  let_assert!(
    Err(ConfigError::MissingPattern(Rule::ToDatetime)) =
      rule_set.constraint(&ConstraintSpec::new(Rule::ToDatetime))
  );
  let_assert!(
    Err(ConfigError::UnexpectedPattern(Rule::YmdToDatetime)) =
      rule_set.constraint(&ConstraintSpec::new(Rule::YmdToDatetime).pattern("%Y"))
  );
  let_assert!(
    Err(ConfigError::Arity { found: 0, .. }) =
      rule_set.constraint(&ConstraintSpec::new(Rule::BeforeDatetime).pattern("%Y-%m-%d"))
  );
  let spec = ConstraintSpec::new(Rule::YmdToDatetime)
    .param(Param::field("y"))
    .param(Param::field("m"));
  let_assert!(Err(ConfigError::Arity { found: 2, .. }) = rule_set.constraint(&spec));
}

#[test]
fn test_missing_dialect_is_a_configuration_error() {
  let rule_set = RuleSet::bare();
  let_assert!(
    Err(ConfigError::DialectUnavailable { database: Database::Mysql, .. }) =
      rule_set.constraint(&ConstraintSpec::new(Rule::ToMysqlDatetime))
  );
  let_assert!(
    Err(ConfigError::DialectUnavailable { database: Database::Postgres, .. }) =
      rule_set.constraint(&ConstraintSpec::new(Rule::ToPgDatetime))
  );
  // With a pattern, no dialect is needed.
  let spec = ConstraintSpec::new(Rule::ToMysqlTimestamp).pattern("%m/%d/%Y");
  let_assert!(Ok(constraint) = rule_set.constraint(&spec));
  let_assert!(Ok(Coerced::Text(text)) = constraint.check_literal("02/17/2005"));
  check!(text == "20050217000000");
}

/// A dialect that reads day-first dates, standing in for one supplied by the host.
#[derive(Debug)]
struct DayFirst;

impl Dialect for DayFirst {
  fn database(&self) -> Database {
    Database::Postgres
  }

  fn parse_datetime(&self, value: &str) -> RuleResult<NaiveDateTime> {
    rules::to_datetime(value, "%d.%m.%Y").map(|instant| instant.naive())
  }
}

#[test]
fn test_injected_dialect() {
  let rule_set = RuleSet::bare().with_dialect(Arc::new(DayFirst));
  let_assert!(Ok(constraint) = rule_set.constraint(&ConstraintSpec::new(Rule::ToPgDatetime)));
  let_assert!(Ok(coerced) = constraint.check_literal("17.02.2005"));
  check!(coerced.as_text() == Some("2005-02-17 00:00:00"));
  check!(constraint.check_literal("2005-02-17").is_err());
}

#[test]
fn test_constraint_resolves_sibling_fields() -> Result<(), ConfigError> {
  let rule_set = RuleSet::new();
  let spec = ConstraintSpec::new(Rule::BetweenDatetimes)
    .pattern("%Y-%m-%d")
    .param(Param::field("start"))
    .param(Param::literal("2005-12-31"));
  let constraint = rule_set.constraint(&spec)?;

  let fields = submission(&[("start", "2005-01-01")]);
  let_assert!(Ok(Coerced::Instant(instant)) = constraint.check("2005-02-17", &fields));
  check!(instant.ymd() == (2005, 2, 17));
  check!(constraint.check("2004-12-31", &fields).is_err());

  // Without a submission the field reference cannot be resolved.
  let_assert!(Err(e) = constraint.check_literal("2005-02-17"));
  check!(e.kind == ErrorKind::Missing);
  check!(e.src == "start");
  Ok(())
}

#[test]
fn test_literal_and_context_calls_agree() -> Result<(), ConfigError> {
  let rule_set = RuleSet::new().today(mid_june);
  let spec = ConstraintSpec::new(Rule::AfterToday).pattern("%m/%d/%Y");
  let constraint = rule_set.constraint(&spec)?;
  let fields = submission(&[("other", "ignored")]);
  for value in ["06/15/2024", "06/16/2024", "06/14/2024", "06/31/2024", "junk"] {
    check!(constraint.check_literal(value).ok() == constraint.check(value, &fields).ok());
  }
  check!(constraint.check_literal("06/15/2024").is_ok());
  check!(constraint.check_literal("06/14/2024").is_err());
  Ok(())
}

#[test]
fn test_ymd_constraint_reads_parameters() -> Result<(), ConfigError> {
  let rule_set = RuleSet::new().today(mid_june);
  let spec = ConstraintSpec::new(Rule::YmdBeforeToday)
    .param(Param::field("year"))
    .param(Param::field("month"))
    .param(Param::field("day"));
  let constraint = rule_set.constraint(&spec)?;

  let fields = submission(&[("year", "2005"), ("month", "2"), ("day", "17")]);
  let_assert!(Ok(coerced) = constraint.check("", &fields));
  check!(coerced.to_string() == "2005-02-17T00:00:00");

  let fields = submission(&[("year", "2025"), ("month", "2"), ("day", "17")]);
  check!(constraint.check("", &fields).is_err());
  Ok(())
}

#[test]
#[cfg(feature = "mysql")]
fn test_profile_from_json() -> Result<(), Box<dyn std::error::Error>> {
  let profile: Profile = serde_json::from_str(
    r#"{
      "start": [{ "rule": "to_datetime", "pattern": "%Y-%m-%d" }],
      "end": [
        { "rule": "to_datetime", "pattern": "%Y-%m-%d" },
        { "rule": "after_datetime", "pattern": "%Y-%m-%d", "params": [{ "field": "start" }] }
      ],
      "stamp": [{ "rule": "to_mysql_timestamp" }],
      "note": [{ "rule": "to_datetime", "pattern": "%Y" }]
    }"#,
  )?;
  check!(profile.0["end"][1].params == vec![Param::field("start")]);

  let compiled = RuleSet::new().compile(&profile)?;
  let fields: BTreeMap<String, String> = [
    ("start", "2005-02-17"),
    ("end", "2005-02-16"),
    ("stamp", "2005-02-17 14:06:14"),
    ("note", ""),
  ]
  .into_iter()
  .map(|(k, v)| (k.to_string(), v.to_string()))
  .collect();

  let report = compiled.validate(&fields);
  check!(!report.is_success());
  check!(report.valid["start"].to_string() == "2005-02-17");
  check!(report.valid["stamp"].as_text() == Some("20050217140614"));
  check!(report.invalid["end"].kind == ErrorKind::TooEarly);
  check!(report.missing == vec!["note".to_string()]);
  Ok(())
}

#[test]
#[cfg(feature = "mysql")]
fn test_profile_compilation_fails_early() {
  let profile = Profile::default()
    .constrain("when", ConstraintSpec::new(Rule::ToDatetime).pattern("%Y-%m-%d"))
    .constrain("stamp", ConstraintSpec::new(Rule::ToMysqlTimestamp));
  check!(RuleSet::new().compile(&profile).is_ok());
  let_assert!(
    Err(ConfigError::DialectUnavailable { rule: Rule::ToMysqlTimestamp, .. }) =
      RuleSet::bare().compile(&profile)
  );
}

#[test]
fn test_rejection_display() {
  let_assert!(Err(e) = crate::parse_loose_timestamp("2005-02-17"));
  let caret = format!("{}^-----", " ".repeat(10));
  check!(e.to_string() == format!("2005-02-17\n{caret}\n{}", ErrorKind::InputTooShort));
  let_assert!(Err(e) = rules::after_datetime("2005-02-16", "%Y-%m-%d", "2005-02-17"));
  check!(e.to_string() == format!("2005-02-16\n{}", ErrorKind::TooEarly));
}
