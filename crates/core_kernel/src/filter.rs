//! Filter expressions over entity documents
//!
//! A [`Filter`] is a data structure rather than a closure, so every store
//! back-end can translate it into its native query form. The in-process
//! evaluator [`Filter::matches`] defines the reference semantics:
//!
//! - a missing field never satisfies `Eq`, `In` or a range comparison
//! - `Ne` matches documents where the field is missing
//! - `Exists` treats an explicit `null` as present
//! - numbers compare numerically, so `1` equals `1.0`
//! - range comparisons only match values of the same JSON type
//!
//! # Example
//!
//! ```rust
//! use core_kernel::Filter;
//! use serde_json::json;
//!
//! let filter = Filter::gte("rank", 3).and(Filter::eq("author.name", "ada"));
//! assert!(filter.matches(&json!({"rank": 4, "author": {"name": "ada"}})));
//! assert!(!filter.matches(&json!({"rank": 2, "author": {"name": "ada"}})));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// Dot-separated path to a document field; numeric segments index arrays
///
/// A negative segment counts from the end of an array, so `tags.-1` is the
/// last tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parses a dotted path such as `author.name` or `tags.0`
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Returns the path segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Resolves the path inside a document, `None` when any segment is missing
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(document, |current, segment| match current {
            Value::Object(fields) => fields.get(segment),
            Value::Array(items) => array_index(segment, items.len()).and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

fn array_index(segment: &str, len: usize) -> Option<usize> {
    let index = segment.parse::<i64>().ok()?;
    if index < 0 {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    } else {
        usize::try_from(index).ok()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

/// A boolean expression over a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// Matches every document
    All,
    Eq { field: FieldPath, value: Value },
    Ne { field: FieldPath, value: Value },
    Gt { field: FieldPath, value: Value },
    Gte { field: FieldPath, value: Value },
    Lt { field: FieldPath, value: Value },
    Lte { field: FieldPath, value: Value },
    /// Field equals one of the values; an empty list matches nothing
    In { field: FieldPath, values: Vec<Value> },
    Exists { field: FieldPath, exists: bool },
    /// Conjunction; an empty list matches everything
    And { filters: Vec<Filter> },
    /// Disjunction; an empty list matches nothing
    Or { filters: Vec<Filter> },
    Not { filter: Box<Filter> },
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

impl Filter {
    pub fn all() -> Self {
        Filter::All
    }

    pub fn eq(field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Filter::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Filter::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gte(field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Filter::Gte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Filter::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lte(field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        Filter::Lte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(
        field: impl Into<FieldPath>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(field: impl Into<FieldPath>) -> Self {
        Filter::Exists {
            field: field.into(),
            exists: true,
        }
    }

    pub fn missing(field: impl Into<FieldPath>) -> Self {
        Filter::Exists {
            field: field.into(),
            exists: false,
        }
    }

    pub fn all_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And {
            filters: filters.into_iter().collect(),
        }
    }

    pub fn any_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or {
            filters: filters.into_iter().collect(),
        }
    }

    /// Combines two filters with AND, flattening nested conjunctions
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (this, Filter::All) => this,
            (Filter::And { mut filters }, Filter::And { filters: rest }) => {
                filters.extend(rest);
                Filter::And { filters }
            }
            (Filter::And { mut filters }, other) => {
                filters.push(other);
                Filter::And { filters }
            }
            (this, other) => Filter::And {
                filters: vec![this, other],
            },
        }
    }

    /// Combines two filters with OR, flattening nested disjunctions
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or { mut filters }, Filter::Or { filters: rest }) => {
                filters.extend(rest);
                Filter::Or { filters }
            }
            (Filter::Or { mut filters }, other) => {
                filters.push(other);
                Filter::Or { filters }
            }
            (this, other) => Filter::Or {
                filters: vec![this, other],
            },
        }
    }

    /// Evaluates the filter against a document
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => field
                .resolve(document)
                .is_some_and(|actual| json_eq(actual, value)),
            Filter::Ne { field, value } => !field
                .resolve(document)
                .is_some_and(|actual| json_eq(actual, value)),
            Filter::Gt { field, value } => {
                range_matches(field.resolve(document), value, Ordering::is_gt)
            }
            Filter::Gte { field, value } => {
                range_matches(field.resolve(document), value, Ordering::is_ge)
            }
            Filter::Lt { field, value } => {
                range_matches(field.resolve(document), value, Ordering::is_lt)
            }
            Filter::Lte { field, value } => {
                range_matches(field.resolve(document), value, Ordering::is_le)
            }
            Filter::In { field, values } => field
                .resolve(document)
                .is_some_and(|actual| values.iter().any(|candidate| json_eq(actual, candidate))),
            Filter::Exists { field, exists } => field.resolve(document).is_some() == *exists,
            Filter::And { filters } => filters.iter().all(|f| f.matches(document)),
            Filter::Or { filters } => filters.iter().any(|f| f.matches(document)),
            Filter::Not { filter } => !filter.matches(document),
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        match self {
            Filter::Not { filter } => *filter,
            other => Filter::Not {
                filter: Box::new(other),
            },
        }
    }
}

fn range_matches(actual: Option<&Value>, expected: &Value, accept: fn(Ordering) -> bool) -> bool {
    actual
        .filter(|actual| type_rank(actual) == type_rank(expected))
        .is_some_and(|actual| accept(compare_json(actual, expected)))
}

/// Equality with numeric comparison of numbers
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_json(a, b) == Ordering::Equal,
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| json_eq(l, r))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, l)| right.get(key).is_some_and(|r| json_eq(l, r)))
        }
        _ => a == b,
    }
}

/// Type rank in the store's ordering: null < string < number < boolean < array < object
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values
///
/// Values of different types order by type rank. Arrays and objects order by
/// length first, then element-wise (objects by sorted key).
fn key_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Number(l), Value::Number(r)) => {
            if let (Some(l), Some(r)) = (l.as_i64(), r.as_i64()) {
                l.cmp(&r)
            } else if let (Some(l), Some(r)) = (l.as_u64(), r.as_u64()) {
                l.cmp(&r)
            } else {
                let l = l.as_f64().unwrap_or(f64::NAN);
                let r = r.as_f64().unwrap_or(f64::NAN);
                l.partial_cmp(&r).unwrap_or(Ordering::Equal)
            }
        }
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (Value::Array(l), Value::Array(r)) => l.len().cmp(&r.len()).then_with(|| {
            l.iter()
                .zip(r)
                .map(|(x, y)| compare_json(x, y))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        }),
        (Value::Object(l), Value::Object(r)) => l.len().cmp(&r.len()).then_with(|| {
            // jsonb stores keys shorter first, then bytewise
            let mut left: Vec<_> = l.iter().collect();
            let mut right: Vec<_> = r.iter().collect();
            left.sort_by(|x, y| key_order(x.0, y.0));
            right.sort_by(|x, y| key_order(x.0, y.0));
            left.iter()
                .zip(&right)
                .map(|((lk, lv), (rk, rv))| key_order(lk, rk).then_with(|| compare_json(lv, rv)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        }),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
