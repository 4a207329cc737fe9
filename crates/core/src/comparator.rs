//! Pluggable result ordering
//!
//! A [`ResultComparator`] is a key extractor plus a direction. Sortable
//! fields are registered once in a [`ComparatorRegistry`] and selected by
//! name at query time, so no caller needs to switch over field kinds.
//!
//! Equal keys are always broken by ascending invocation id, independent of
//! the direction, which keeps repeated identical queries reproducible.

use crate::record::InvocationSequence;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Names of the built-in sortable fields
pub mod fields {
    /// Invocation start time
    pub const TIMESTAMP: &str = "timestamp";
    /// Invocation id (insertion order)
    pub const ID: &str = "id";
    /// Effective duration (payload duration, else self duration)
    pub const DURATION: &str = "duration";
    /// Number of nested invocations
    pub const CHILD_COUNT: &str = "child_count";
    /// HTTP response status
    pub const RESPONSE_STATUS: &str = "response_status";
    /// HTTP request URL
    pub const URL: &str = "url";
    /// Use case from the tagging header
    pub const USE_CASE: &str = "use_case";
    /// Instrumented method id
    pub const METHOD: &str = "method";
    /// Application id
    pub const APPLICATION: &str = "application";
    /// Business transaction id
    pub const BUSINESS_TRANSACTION: &str = "business_transaction";
    /// Nested SQL / exception presence
    pub const NESTED_DATA: &str = "nested_data";
}

/// Extracted sort key
///
/// Keys of different kinds order by kind; `Missing` sorts first. Signed and
/// unsigned integers compare numerically with each other.
#[derive(Debug, Clone)]
pub enum SortKey {
    /// Field not present on the record
    Missing,
    /// Boolean flag
    Flag(bool),
    /// Integer value
    Int(i64),
    /// Unsigned integer value (ids, counts)
    UInt(u64),
    /// Floating point value (total order, NaN last)
    Float(f64),
    /// Text value
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Flag(_) => 1,
            SortKey::Int(_) | SortKey::UInt(_) => 2,
            SortKey::Float(_) => 3,
            SortKey::Text(_) => 4,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
            (SortKey::Flag(a), SortKey::Flag(b)) => a.cmp(b),
            (SortKey::Int(a), SortKey::Int(b)) => a.cmp(b),
            (SortKey::UInt(a), SortKey::UInt(b)) => a.cmp(b),
            (SortKey::Int(a), SortKey::UInt(b)) => match u64::try_from(*a) {
                Ok(a) => a.cmp(b),
                Err(_) => Ordering::Less,
            },
            (SortKey::UInt(a), SortKey::Int(b)) => match u64::try_from(*b) {
                Ok(b) => a.cmp(&b),
                Err(_) => Ordering::Greater,
            },
            (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortKey {}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Smallest key first
    #[default]
    Ascending,
    /// Largest key first
    Descending,
}

type Extractor = dyn Fn(&InvocationSequence) -> SortKey + Send + Sync;

/// Key extractor plus direction
#[derive(Clone)]
pub struct ResultComparator {
    name: Arc<str>,
    extractor: Arc<Extractor>,
    direction: SortDirection,
}

impl ResultComparator {
    /// Create an ascending comparator from a key extractor
    pub fn new<F>(name: &str, extractor: F) -> Self
    where
        F: Fn(&InvocationSequence) -> SortKey + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            extractor: Arc::new(extractor),
            direction: SortDirection::Ascending,
        }
    }

    /// Same key, ascending
    pub fn ascending(mut self) -> Self {
        self.direction = SortDirection::Ascending;
        self
    }

    /// Same key, descending
    pub fn descending(mut self) -> Self {
        self.direction = SortDirection::Descending;
        self
    }

    /// Same key, explicit direction
    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Field name this comparator sorts by
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sort direction
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Extract the sort key of a record
    pub fn extract_key(&self, record: &InvocationSequence) -> SortKey {
        (self.extractor)(record)
    }

    /// Compare two extracted keys, honoring the direction
    pub fn compare_keys(&self, a: &SortKey, b: &SortKey) -> Ordering {
        match self.direction {
            SortDirection::Ascending => a.cmp(b),
            SortDirection::Descending => b.cmp(a),
        }
    }

    /// Total order over records: key in direction, then ascending id
    pub fn compare(&self, a: &InvocationSequence, b: &InvocationSequence) -> Ordering {
        self.compare_keys(&self.extract_key(a), &self.extract_key(b))
            .then(a.id.cmp(&b.id))
    }

    /// The default ordering: newest timestamp first
    pub fn timestamp_descending() -> Self {
        builtin(fields::TIMESTAMP)
            .map(ResultComparator::descending)
            .unwrap_or_else(|| {
                ResultComparator::new(fields::TIMESTAMP, |r| {
                    SortKey::Int(r.timestamp.as_millis())
                })
                .descending()
            })
    }
}

impl Default for ResultComparator {
    fn default() -> Self {
        Self::timestamp_descending()
    }
}

impl fmt::Debug for ResultComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultComparator")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .finish()
    }
}

fn optional_text(value: Option<&str>) -> SortKey {
    value.map_or(SortKey::Missing, |s| SortKey::Text(s.to_string()))
}

/// Ascending comparator for a built-in field name
fn builtin(name: &str) -> Option<ResultComparator> {
    let comparator = match name {
        fields::TIMESTAMP => {
            ResultComparator::new(name, |r| SortKey::Int(r.timestamp.as_millis()))
        }
        fields::ID => ResultComparator::new(name, |r| SortKey::UInt(r.id)),
        fields::DURATION => ResultComparator::new(name, |r| SortKey::Float(r.effective_duration())),
        fields::CHILD_COUNT => ResultComparator::new(name, |r| SortKey::UInt(r.child_count)),
        fields::RESPONSE_STATUS => ResultComparator::new(name, |r| {
            r.response_status()
                .map_or(SortKey::Missing, |s| SortKey::Int(i64::from(s)))
        }),
        fields::URL => ResultComparator::new(name, |r| optional_text(r.url())),
        fields::USE_CASE => ResultComparator::new(name, |r| optional_text(r.use_case())),
        fields::METHOD => ResultComparator::new(name, |r| SortKey::UInt(r.method_id)),
        fields::APPLICATION => {
            ResultComparator::new(name, |r| SortKey::UInt(r.application_id))
        }
        fields::BUSINESS_TRANSACTION => ResultComparator::new(name, |r| {
            SortKey::UInt(r.business_transaction_id)
        }),
        fields::NESTED_DATA => ResultComparator::new(name, |r| {
            let sql = i64::from(r.has_nested_sql_statements());
            let exceptions = i64::from(r.has_nested_exceptions());
            SortKey::Int(sql * 2 + exceptions)
        }),
        _ => return None,
    };
    Some(comparator)
}

/// Named comparators available to query callers
#[derive(Debug, Clone)]
pub struct ComparatorRegistry {
    comparators: HashMap<String, ResultComparator>,
}

impl ComparatorRegistry {
    /// Registry with no comparators
    pub fn empty() -> Self {
        Self {
            comparators: HashMap::new(),
        }
    }

    /// Registry with every built-in field registered (ascending)
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for name in [
            fields::TIMESTAMP,
            fields::ID,
            fields::DURATION,
            fields::CHILD_COUNT,
            fields::RESPONSE_STATUS,
            fields::URL,
            fields::USE_CASE,
            fields::METHOD,
            fields::APPLICATION,
            fields::BUSINESS_TRANSACTION,
            fields::NESTED_DATA,
        ] {
            if let Some(comparator) = builtin(name) {
                registry.register(comparator);
            }
        }
        registry
    }

    /// Register (or replace) a comparator under its name
    pub fn register(&mut self, comparator: ResultComparator) {
        self.comparators
            .insert(comparator.name().to_string(), comparator.ascending());
    }

    /// Look up a comparator by field name with the requested direction
    pub fn get(&self, name: &str, direction: SortDirection) -> Option<ResultComparator> {
        self.comparators
            .get(name)
            .cloned()
            .map(|c| c.with_direction(direction))
    }

    /// Registered field names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.comparators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ComparatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
