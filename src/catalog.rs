//! The named rule catalog, and the glue that binds rules to a form submission.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::BuildHasher;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Local;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::dialect::Database;
use crate::dialect::Dialect;
use crate::dialect::Grammar;
use crate::error::ErrorKind;
use crate::rules;
use crate::Coerced;
use crate::ConfigError;
use crate::Rejection;
use crate::RuleResult;

/// The rules in the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
  ToDatetime,
  YmdToDatetime,
  YmdBeforeToday,
  YmdAfterToday,
  BeforeToday,
  AfterToday,
  BeforeDatetime,
  AfterDatetime,
  BetweenDatetimes,
  ToMysqlDatetime,
  ToMysqlDate,
  ToMysqlTimestamp,
  ToPgDatetime,
}

/// Whether a rule reads its value with a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PatternUse {
  Required,
  Optional,
  Forbidden,
}

impl Rule {
  /// Every rule in the catalog.
  pub const ALL: [Rule; 13] = [
    Self::ToDatetime,
    Self::YmdToDatetime,
    Self::YmdBeforeToday,
    Self::YmdAfterToday,
    Self::BeforeToday,
    Self::AfterToday,
    Self::BeforeDatetime,
    Self::AfterDatetime,
    Self::BetweenDatetimes,
    Self::ToMysqlDatetime,
    Self::ToMysqlDate,
    Self::ToMysqlTimestamp,
    Self::ToPgDatetime,
  ];

  /// The rule's name, as used in validation profiles.
  pub const fn name(self) -> &'static str {
    match self {
      Self::ToDatetime => "to_datetime",
      Self::YmdToDatetime => "ymd_to_datetime",
      Self::YmdBeforeToday => "ymd_before_today",
      Self::YmdAfterToday => "ymd_after_today",
      Self::BeforeToday => "before_today",
      Self::AfterToday => "after_today",
      Self::BeforeDatetime => "before_datetime",
      Self::AfterDatetime => "after_datetime",
      Self::BetweenDatetimes => "between_datetimes",
      Self::ToMysqlDatetime => "to_mysql_datetime",
      Self::ToMysqlDate => "to_mysql_date",
      Self::ToMysqlTimestamp => "to_mysql_timestamp",
      Self::ToPgDatetime => "to_pg_datetime",
    }
  }

  /// The database whose native grammar this rule falls back to without a pattern.
  pub const fn database(self) -> Option<Database> {
    match self {
      Self::ToMysqlDatetime | Self::ToMysqlDate | Self::ToMysqlTimestamp => Some(Database::Mysql),
      Self::ToPgDatetime => Some(Database::Postgres),
      _ => None,
    }
  }

  const fn pattern_use(self) -> PatternUse {
    match self {
      Self::YmdToDatetime | Self::YmdBeforeToday | Self::YmdAfterToday => PatternUse::Forbidden,
      Self::ToMysqlDatetime | Self::ToMysqlDate | Self::ToMysqlTimestamp | Self::ToPgDatetime => {
        PatternUse::Optional
      },
      _ => PatternUse::Required,
    }
  }

  /// The accepted parameter counts, as `(min, max, description)`.
  const fn arity(self) -> (usize, usize, &'static str) {
    match self {
      Self::BeforeDatetime | Self::AfterDatetime => (1, 1, "exactly 1"),
      Self::BetweenDatetimes => (2, 2, "exactly 2"),
      Self::YmdToDatetime => (3, 6, "3 to 6"),
      Self::YmdBeforeToday | Self::YmdAfterToday => (3, 3, "exactly 3"),
      _ => (0, 0, "no"),
    }
  }
}

impl Display for Rule {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Rule {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|rule| rule.name() == s)
      .ok_or_else(|| ConfigError::UnknownRule(s.into()))
  }
}

/// A rule parameter: either a fixed string or the value of another field in the submission.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Param {
  Field { field: String },
  Literal(String),
}

impl Param {
  /// A fixed string.
  pub fn literal(value: impl Into<String>) -> Self {
    Self::Literal(value.into())
  }

  /// A reference to another field.
  pub fn field(name: impl Into<String>) -> Self {
    Self::Field { field: name.into() }
  }

  /// Resolve this parameter against the submission.
  ///
  /// A reference to a field that is absent from the submission is rejected as missing.
  pub fn resolve<'a, F: Fields + ?Sized>(&'a self, fields: &'a F) -> RuleResult<&'a str> {
    match self {
      Self::Literal(value) => Ok(value.as_str()),
      Self::Field { field } => {
        fields.value(field).ok_or_else(|| Rejection::new(field, ErrorKind::Missing))
      },
    }
  }
}

/// The host's view of the submission being validated.
pub trait Fields {
  /// The raw value of the named field, if it was submitted.
  fn value(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> Fields for HashMap<String, String, S> {
  fn value(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

impl Fields for BTreeMap<String, String> {
  fn value(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

/// A submission with no fields, for validating a lone value.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFields;

impl Fields for NoFields {
  fn value(&self, _: &str) -> Option<&str> {
    None
  }
}

/// A declarative description of one constraint on a field.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConstraintSpec {
  pub rule: Rule,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pattern: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub params: Vec<Param>,
}

impl ConstraintSpec {
  /// Create a spec for the given rule, with no pattern or parameters.
  pub fn new(rule: Rule) -> Self {
    Self { rule, pattern: None, params: Vec::new() }
  }

  /// Set the pattern.
  pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
    self.pattern = Some(pattern.into());
    self
  }

  /// Append a parameter.
  pub fn param(mut self, param: Param) -> Self {
    self.params.push(param);
    self
  }
}

/// A registry of rules, together with the capabilities they need: a clock and database dialects.
#[derive(Clone, Debug)]
pub struct RuleSet {
  today: fn() -> NaiveDate,
  mysql: Option<Arc<dyn Dialect>>,
  pg: Option<Arc<dyn Dialect>>,
}

impl Default for RuleSet {
  fn default() -> Self {
    Self::new()
  }
}

impl RuleSet {
  /// Create a rule set with the local clock and every built-in dialect that was compiled in.
  pub fn new() -> Self {
    let rule_set = Self::bare();
    #[cfg(feature = "mysql")]
    let rule_set = rule_set.with_dialect(Arc::new(crate::dialect::MySql));
    #[cfg(feature = "pg")]
    let rule_set = rule_set.with_dialect(Arc::new(crate::dialect::Postgres));
    rule_set
  }

  /// Create a rule set with the local clock and no dialects.
  pub fn bare() -> Self {
    Self { today: || Local::now().date_naive(), mysql: None, pg: None }
  }

  /// Provide a custom function to determine the current date, used by the `*_today` rules.
  ///
  /// ## Example
  ///
  /// ```
  /// use chrono::NaiveDate;
  /// use datetime_rules::{ConstraintSpec, Rule, RuleSet};
  /// let rule_set = RuleSet::new().today(|| NaiveDate::from_ymd_opt(2005, 2, 17).unwrap());
  /// let spec = ConstraintSpec::new(Rule::BeforeToday).pattern("%Y-%m-%d");
  /// let constraint = rule_set.constraint(&spec).unwrap();
  /// assert!(constraint.check_literal("2005-02-17").is_ok());
  /// assert!(constraint.check_literal("2005-02-18").is_err());
  /// ```
  pub fn today(mut self, today: fn() -> NaiveDate) -> Self {
    self.today = today;
    self
  }

  /// Register a dialect, replacing any dialect for the same database.
  pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
    match dialect.database() {
      Database::Mysql => self.mysql = Some(dialect),
      Database::Postgres => self.pg = Some(dialect),
    }
    self
  }

  /// The dialect registered for the given database, if any.
  pub fn dialect(&self, database: Database) -> Option<&Arc<dyn Dialect>> {
    match database {
      Database::Mysql => self.mysql.as_ref(),
      Database::Postgres => self.pg.as_ref(),
    }
  }

  /// Turn a declarative spec into a constraint, checking that it is well-formed and that every
  /// capability it needs is available.
  pub fn constraint(&self, spec: &ConstraintSpec) -> Result<Constraint, ConfigError> {
    let rule = spec.rule;
    match (rule.pattern_use(), &spec.pattern) {
      (PatternUse::Required, None) => Err(ConfigError::MissingPattern(rule))?,
      (PatternUse::Forbidden, Some(_)) => Err(ConfigError::UnexpectedPattern(rule))?,
      _ => {},
    }

    let (min, max, expected) = rule.arity();
    if spec.params.len() < min || spec.params.len() > max {
      Err(ConfigError::Arity { rule, expected, found: spec.params.len() })?;
    }

    let dialect = match (rule.database(), &spec.pattern) {
      (Some(database), None) => Some(
        self.dialect(database).cloned().ok_or(ConfigError::DialectUnavailable { rule, database })?,
      ),
      _ => None,
    };

    tracing::trace!(%rule, pattern = ?spec.pattern, "registered constraint");
    Ok(Constraint {
      rule,
      pattern: spec.pattern.clone(),
      params: spec.params.clone(),
      dialect,
      today: self.today,
    })
  }

  /// Compile every constraint in a profile.
  pub fn compile(&self, profile: &Profile) -> Result<CompiledProfile, ConfigError> {
    let fields = profile
      .0
      .iter()
      .map(|(field, specs)| {
        let constraints =
          specs.iter().map(|spec| self.constraint(spec)).collect::<Result<Vec<_>, _>>()?;
        Ok((field.clone(), constraints))
      })
      .collect::<Result<BTreeMap<_, _>, ConfigError>>()?;
    Ok(CompiledProfile { fields })
  }
}

/// A rule bound to its pattern, parameters and capabilities, ready to validate values.
#[derive(Clone, Debug)]
pub struct Constraint {
  rule: Rule,
  pattern: Option<String>,
  params: Vec<Param>,
  dialect: Option<Arc<dyn Dialect>>,
  today: fn() -> NaiveDate,
}

impl Constraint {
  /// The rule this constraint applies.
  #[inline]
  pub fn rule(&self) -> Rule {
    self.rule
  }

  /// Validate a value, resolving field references against the submission.
  pub fn check<F: Fields + ?Sized>(&self, value: &str, fields: &F) -> RuleResult<Coerced> {
    let outcome = self.apply(value, fields);
    match &outcome {
      Ok(coerced) => tracing::trace!(rule = %self.rule, %coerced, "accepted value"),
      Err(e) => {
        tracing::debug!(rule = %self.rule, src = %e.src, reason = %e.kind, "rejected value")
      },
    }
    outcome
  }

  /// Validate a lone value. Field references cannot be resolved and are rejected as missing.
  pub fn check_literal(&self, value: &str) -> RuleResult<Coerced> {
    self.check(value, &NoFields)
  }

  fn apply<F: Fields + ?Sized>(&self, value: &str, fields: &F) -> RuleResult<Coerced> {
    let params =
      self.params.iter().map(|param| param.resolve(fields)).collect::<RuleResult<Vec<_>>>()?;
    let today = || (self.today)();

    Ok(match self.rule {
      Rule::ToDatetime => rules::to_datetime(value, self.pattern()?)?.into(),
      Rule::YmdToDatetime => rules::ymd_to_datetime(&params)?.into(),
      Rule::YmdBeforeToday => rules::ymd_before_today(&params, today())?.into(),
      Rule::YmdAfterToday => rules::ymd_after_today(&params, today())?.into(),
      Rule::BeforeToday => rules::before_today(value, self.pattern()?, today())?.into(),
      Rule::AfterToday => rules::after_today(value, self.pattern()?, today())?.into(),
      Rule::BeforeDatetime => {
        rules::before_datetime(value, self.pattern()?, param(&params, 0)?)?.into()
      },
      Rule::AfterDatetime => {
        rules::after_datetime(value, self.pattern()?, param(&params, 0)?)?.into()
      },
      Rule::BetweenDatetimes => {
        let (earliest, latest) = (param(&params, 0)?, param(&params, 1)?);
        rules::between_datetimes(value, self.pattern()?, earliest, latest)?.into()
      },
      Rule::ToMysqlDatetime => rules::to_mysql_datetime(value, self.grammar()?)?.into(),
      Rule::ToMysqlDate => rules::to_mysql_date(value, self.grammar()?)?.into(),
      Rule::ToMysqlTimestamp => rules::to_mysql_timestamp(value, self.grammar()?)?.into(),
      Rule::ToPgDatetime => rules::to_pg_datetime(value, self.grammar()?)?.into(),
    })
  }

  fn pattern(&self) -> RuleResult<&str> {
    let e = || Rejection::new(self.rule.name(), ErrorKind::InvalidFormat);
    self.pattern.as_deref().ok_or_else(e)
  }

  fn grammar(&self) -> RuleResult<Grammar<'_>> {
    match (&self.pattern, &self.dialect) {
      (Some(pattern), _) => Ok(Grammar::Pattern(pattern)),
      (None, Some(dialect)) => Ok(Grammar::Native(dialect.as_ref())),
      (None, None) => Err(Rejection::new(self.rule.name(), ErrorKind::InvalidFormat)),
    }
  }
}

fn param<'a>(params: &[&'a str], ix: usize) -> RuleResult<&'a str> {
  params.get(ix).copied().ok_or_else(|| Rejection::new("", ErrorKind::Missing))
}

/// A validation profile: the ordered constraints for each field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Profile(pub BTreeMap<String, Vec<ConstraintSpec>>);

impl Profile {
  /// Add a constraint to a field.
  pub fn constrain(mut self, field: impl Into<String>, spec: ConstraintSpec) -> Self {
    self.0.entry(field.into()).or_default().push(spec);
    self
  }
}

/// A profile whose constraints have all been registered.
#[derive(Clone, Debug)]
pub struct CompiledProfile {
  fields: BTreeMap<String, Vec<Constraint>>,
}

impl CompiledProfile {
  /// Validate a submission.
  ///
  /// Fields that are absent or empty are reported as missing and not validated. Every constraint
  /// on a field sees the raw submitted value; the first rejection marks the field invalid, and
  /// otherwise the output of the last constraint becomes the field's valid value.
  pub fn validate<F: Fields + ?Sized>(&self, fields: &F) -> Report {
    let mut report = Report::default();
    'fields: for (name, constraints) in &self.fields {
      let Some(value) = fields.value(name).filter(|v| !v.is_empty()) else {
        report.missing.push(name.clone());
        continue;
      };
      let mut last = None;
      for constraint in constraints {
        match constraint.check(value, fields) {
          Ok(coerced) => last = Some(coerced),
          Err(e) => {
            tracing::debug!(field = %name, rule = %constraint.rule(), "field is invalid");
            report.invalid.insert(name.clone(), e);
            continue 'fields;
          },
        }
      }
      let coerced = last.unwrap_or_else(|| Coerced::Text(value.into()));
      report.valid.insert(name.clone(), coerced);
    }
    report
  }
}

/// The outcome of validating a submission against a profile.
#[derive(Clone, Debug, Default)]
pub struct Report {
  /// Fields that passed, with their coerced values.
  pub valid: BTreeMap<String, Coerced>,
  /// Fields that failed, with the reason.
  pub invalid: BTreeMap<String, Rejection>,
  /// Fields that were absent or empty.
  pub missing: Vec<String>,
}

impl Report {
  /// Whether every submitted field passed.
  pub fn is_success(&self) -> bool {
    self.invalid.is_empty()
  }
}
