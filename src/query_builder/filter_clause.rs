//! # Filter Clause Parser
//!
//! Parses the `$filter` query parameter into a [`FilterClause`].
//!
//! The grammar is a fixed set of patterns, not a boolean expression language.
//! Extraction is destructive and ordered: each stage removes its match from
//! the working string before the next stage runs.
//!
//! 1. `createdTime|timestamp ge '<ISO8601>'` and `... le '<ISO8601>'`
//! 2. `runtimeStatus in ('A','B')`
//! 3. exactly one field predicate, first match wins:
//!    `startswith(field,'v') [eq true|false]`,
//!    `contains(field,'v') [eq true|false]`,
//!    `field eq|ne 'v'`,
//!    `field in (v1, v2) [eq false]`
//!
//! Parsing never fails. Fragments that do not parse leave the corresponding
//! part of the clause unset.
//!
//! ```rust
//! use durable_monitor::query_builder::FilterClause;
//!
//! let clause = FilterClause::parse("startsWith(input,'abcd') eq false");
//! assert_eq!(clause.field_name.as_deref(), Some("input"));
//! assert!(!clause.matches_value("abcdef"));
//! assert!(clause.matches_value("xyz"));
//! ```

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::fields::FieldAccess;
use crate::constants::DURABLE_ENTITIES_STATUS;

static TIME_FROM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(and\s+)?(createdTime|timestamp)\s+ge\s+'([^']*)'(\s+and)?\s*")
        .expect("time-from pattern is valid")
});

static TIME_TILL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(and\s+)?(createdTime|timestamp)\s+le\s+'([^']*)'(\s+and)?\s*")
        .expect("time-till pattern is valid")
});

static RUNTIME_STATUS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(and\s+)?runtimeStatus\s+in\s*\(([^)]*)\)(\s+and)?\s*")
        .expect("runtime-status pattern is valid")
});

static STARTS_WITH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)startswith\(\s*(\w+)\s*,\s*'([^']*)'\s*\)(\s+eq\s+(true|false))?")
        .expect("startswith pattern is valid")
});

static CONTAINS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)contains\(\s*(\w+)\s*,\s*'([^']*)'\s*\)(\s+eq\s+(true|false))?")
        .expect("contains pattern is valid")
});

static EQUALS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\w+)\s+(eq|ne)\s+'([^']*)'").expect("eq/ne pattern is valid")
});

static IN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\w+)\s+in\s*\((.*)\)(\s+eq\s+(true|false))?").expect("in pattern is valid")
});

/// Quoted list item; lazy so delimiters inside quotes are kept
static QUOTED_VALUE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(.*?)'").expect("quoted value pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateKind {
    StartsWith(String),
    Contains(String),
    Equals(String),
    NotEquals(String),
    In(Vec<String>),
}

/// Compiled single-field string predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub kind: PredicateKind,
    pub negated: bool,
}

impl FieldPredicate {
    pub fn matches(&self, value: &str) -> bool {
        let result = match &self.kind {
            PredicateKind::StartsWith(arg) => value.starts_with(arg.as_str()),
            PredicateKind::Contains(arg) => value.contains(arg.as_str()),
            PredicateKind::Equals(arg) => value == arg,
            PredicateKind::NotEquals(arg) => value != arg,
            PredicateKind::In(values) => values.iter().any(|v| v == value),
        };
        result != self.negated
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterClause {
    pub time_from: Option<DateTime<Utc>>,
    pub time_till: Option<DateTime<Utc>>,
    /// `None` means no status filter
    pub runtime_statuses: Option<Vec<String>>,
    pub field_name: Option<String>,
    pub predicate: Option<FieldPredicate>,
}

impl FilterClause {
    pub fn parse(filter: &str) -> Self {
        let mut clause = FilterClause::default();

        let remainder = extract(filter, &TIME_FROM_REGEX, |caps| {
            clause.time_from = parse_timestamp(&caps[3]);
        });
        let remainder = extract(&remainder, &TIME_TILL_REGEX, |caps| {
            clause.time_till = parse_timestamp(&caps[3]);
        });
        let remainder = extract(&remainder, &RUNTIME_STATUS_REGEX, |caps| {
            clause.runtime_statuses = Some(
                caps[2]
                    .split(',')
                    .map(|s| s.trim().trim_matches('\'').trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        });

        if let Some((field_name, predicate)) = parse_predicate(remainder.trim()) {
            clause.field_name = Some(field_name);
            clause.predicate = Some(predicate);
        }

        clause
    }

    /// True when no predicate is set or the value satisfies it
    pub fn matches_value(&self, value: &str) -> bool {
        self.predicate
            .as_ref()
            .map_or(true, |predicate| predicate.matches(value))
    }

    /// Apply the field predicate to a record.
    ///
    /// A predicate on a field the record does not have matches nothing.
    pub fn matches<T: FieldAccess>(&self, item: &T) -> bool {
        let (Some(field_name), Some(predicate)) = (&self.field_name, &self.predicate) else {
            return true;
        };
        item.field(field_name)
            .is_some_and(|value| predicate.matches(&value.as_filter_string()))
    }

    pub fn references_field(&self, field_name: &str) -> bool {
        self.field_name
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case(field_name))
    }

    /// Whether the synthetic `DurableEntities` status was requested
    pub fn includes_durable_entities(&self) -> bool {
        self.includes_status(DURABLE_ENTITIES_STATUS)
    }

    pub fn includes_status(&self, status: &str) -> bool {
        self.runtime_statuses
            .as_ref()
            .is_some_and(|statuses| statuses.iter().any(|s| s.eq_ignore_ascii_case(status)))
    }
}

impl From<&str> for FilterClause {
    fn from(filter: &str) -> Self {
        FilterClause::parse(filter)
    }
}

/// Run `on_match` for the first match and cut it out of `input`
fn extract<F>(input: &str, regex: &Regex, on_match: F) -> String
where
    F: FnOnce(&Captures<'_>),
{
    match regex.captures(input) {
        Some(caps) => {
            on_match(&caps);
            let whole = caps.get(0).map_or(0..0, |m| m.range());
            format!("{} {}", &input[..whole.start], &input[whole.end..])
        }
        None => input.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_predicate(remainder: &str) -> Option<(String, FieldPredicate)> {
    if let Some(caps) = STARTS_WITH_REGEX.captures(remainder) {
        return Some((
            caps[1].to_string(),
            FieldPredicate {
                kind: PredicateKind::StartsWith(caps[2].to_string()),
                negated: is_false(caps.get(4).map(|m| m.as_str())),
            },
        ));
    }

    if let Some(caps) = CONTAINS_REGEX.captures(remainder) {
        return Some((
            caps[1].to_string(),
            FieldPredicate {
                kind: PredicateKind::Contains(caps[2].to_string()),
                negated: is_false(caps.get(4).map(|m| m.as_str())),
            },
        ));
    }

    if let Some(caps) = EQUALS_REGEX.captures(remainder) {
        let value = caps[3].to_string();
        let kind = if caps[2].eq_ignore_ascii_case("ne") {
            PredicateKind::NotEquals(value)
        } else {
            PredicateKind::Equals(value)
        };
        return Some((
            caps[1].to_string(),
            FieldPredicate {
                kind,
                negated: false,
            },
        ));
    }

    if let Some(caps) = IN_REGEX.captures(remainder) {
        return Some((
            caps[1].to_string(),
            FieldPredicate {
                kind: PredicateKind::In(parse_list(&caps[2])),
                negated: is_false(caps.get(4).map(|m| m.as_str())),
            },
        ));
    }

    None
}

fn parse_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('\'') {
        QUOTED_VALUE_REGEX
            .captures_iter(raw)
            .map(|caps| caps[1].to_string())
            .collect()
    } else {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}

fn is_false(flag: Option<&str>) -> bool {
    flag.is_some_and(|f| f.eq_ignore_ascii_case("false"))
}
