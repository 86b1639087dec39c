//! Date and time validation and coercion rules for form validation.
//!
//! Each rule takes a raw field value and the layout it is expected in, and either rejects the
//! value or converts it: into a [`CalendarInstant`], or into the string a database expects. Date
//! parsing, calendar checks and formatting are delegated to [`chrono`].
//!
//! Rules can be called directly with resolved strings (see [`rules`]), or registered from a
//! declarative [`ConstraintSpec`] through a [`RuleSet`], which binds them to a clock, to database
//! dialects, and to the other fields of a submission.
//!
//! ## Example
//!
//! ```
//! use std::collections::HashMap;
//! use datetime_rules::{ConstraintSpec, Param, Rule, RuleSet};
//!
//! let rule_set = RuleSet::new();
//! let spec = ConstraintSpec::new(Rule::AfterDatetime)
//!   .pattern("%Y-%m-%d")
//!   .param(Param::field("start"));
//! let constraint = rule_set.constraint(&spec)?;
//!
//! let submission = HashMap::from([
//!   ("start".to_string(), "2005-02-17".to_string()),
//!   ("end".to_string(), "2005-03-01".to_string()),
//! ]);
//! let end = constraint.check("2005-03-01", &submission).unwrap();
//! assert_eq!(end.to_string(), "2005-03-01");
//! assert!(constraint.check("2005-02-17", &submission).is_err());
//! # Ok::<(), datetime_rules::ConfigError>(())
//! ```

mod catalog;
pub mod dialect;
mod error;
mod models;
mod parser;
pub mod rules;
mod tests;

pub use catalog::CompiledProfile;
pub use catalog::Constraint;
pub use catalog::ConstraintSpec;
pub use catalog::Fields;
pub use catalog::NoFields;
pub use catalog::Param;
pub use catalog::Profile;
pub use catalog::Report;
pub use catalog::Rule;
pub use catalog::RuleSet;
pub use dialect::Database;
pub use dialect::Dialect;
pub use dialect::Grammar;
pub use error::ConfigError;
pub use error::ErrorKind;
pub use error::Rejection;
pub use models::CalendarInstant;
pub use models::Coerced;
pub use parser::parse_loose_timestamp;
pub use parser::strict_parse;

/// The result of applying a rule: the coerced value, or the reason it was rejected.
pub type RuleResult<T> = Result<T, Rejection>;
