//! Query parameters, filter expressions and pagination utilities
//!
//! Every collection listing endpoint accepts the same query string grammar:
//!
//! ```text
//! GET /bootcamps?select=name,description&sort=-averageCost,name&page=2&limit=10
//! GET /courses?tuition[gte]=1000&minimumSkill=beginner
//! GET /bootcamps?careers[in]=Business,UI/UX
//! GET /courses?tuition=lt:5000
//! ```
//!
//! `select`, `sort`, `page` and `limit` are control keys. Every other key is a
//! filter on the field of the same name, optionally carrying an operator
//! either in bracket form (`field[op]=value`) or textual form
//! (`field=op:value`). Nothing in this module fails on user input: malformed
//! values fall back to defaults or to literal equality.

use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::core::store::Document;

/// Page used when `page` is absent or not a positive integer
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when `limit` is absent or not a positive integer
pub const DEFAULT_LIMIT: u64 = 25;

/// Primary identifier field, always part of a projection
pub const ID_FIELD: &str = "id";

/// Creation timestamp field, the default sort key
pub const CREATED_AT_FIELD: &str = "createdAt";

const CONTROL_KEYS: [&str; 4] = ["select", "sort", "limit", "page"];

// =============================================================================
// Raw query
// =============================================================================

/// Query string parameters exactly as received
///
/// Deserializes directly from an axum `Query` extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawQuery(BTreeMap<String, String>);

impl RawQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parameters that are filters, i.e. everything but the control keys
    pub fn filter_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(key, _)| !CONTROL_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawQuery {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// Filter expression
// =============================================================================

/// Comparison operators accepted in filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Operator {
    /// Recognize an operator token; anything else is not an operator
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    /// Build the predicate this operator denotes for a raw value
    pub fn predicate(self, raw: &str) -> Predicate {
        match self {
            Operator::Gt => Predicate::Gt(QueryValue::parse(raw)),
            Operator::Gte => Predicate::Gte(QueryValue::parse(raw)),
            Operator::Lt => Predicate::Lt(QueryValue::parse(raw)),
            Operator::Lte => Predicate::Lte(QueryValue::parse(raw)),
            Operator::In => Predicate::In(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(QueryValue::parse)
                    .collect(),
            ),
        }
    }
}

/// A literal from the query string, with its numeric reading when it has one
#[derive(Debug, Clone, PartialEq)]
pub struct QueryValue {
    raw: String,
    number: Option<f64>,
}

impl QueryValue {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let number = raw.parse::<f64>().ok().filter(|n| n.is_finite());
        Self { raw, number }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn as_number(&self) -> Option<f64> {
        self.number
    }

    /// Typed JSON reading of the literal: number, then boolean, then string
    pub fn to_json(&self) -> Value {
        if let Some(n) = self.number.and_then(serde_json::Number::from_f64) {
            if let Ok(i) = self.raw.parse::<i64>() {
                return Value::from(i);
            }
            return Value::Number(n);
        }
        match self.raw.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(self.raw.clone()),
        }
    }

    fn equals(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => *s == self.raw,
            Value::Number(n) => match (n.as_f64(), self.number) {
                (Some(actual), Some(expected)) => actual == expected,
                _ => false,
            },
            Value::Bool(b) => self.raw == b.to_string(),
            Value::Array(items) => items.iter().any(|item| self.equals(item)),
            Value::Null | Value::Object(_) => false,
        }
    }

    /// Order of a stored value relative to this literal, when comparable
    fn ordering_of(&self, value: &Value) -> Option<Ordering> {
        match value {
            Value::Number(n) => n.as_f64()?.partial_cmp(&self.number?),
            Value::String(s) => Some(s.as_str().cmp(self.raw.as_str())),
            _ => None,
        }
    }
}

/// Condition applied to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(QueryValue),
    Gt(QueryValue),
    Gte(QueryValue),
    Lt(QueryValue),
    Lte(QueryValue),
    In(Vec<QueryValue>),
}

impl Predicate {
    pub fn eq(raw: impl AsRef<str>) -> Self {
        Predicate::Eq(QueryValue::parse(raw.as_ref()))
    }

    /// Evaluate against a field value; a missing field never matches
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };

        match self {
            Predicate::Eq(expected) => expected.equals(value),
            Predicate::In(candidates) => candidates.iter().any(|c| c.equals(value)),
            Predicate::Gt(bound) => range_matches(bound, value, |o| o == Ordering::Greater),
            Predicate::Gte(bound) => range_matches(bound, value, |o| o != Ordering::Less),
            Predicate::Lt(bound) => range_matches(bound, value, |o| o == Ordering::Less),
            Predicate::Lte(bound) => range_matches(bound, value, |o| o != Ordering::Greater),
        }
    }
}

fn range_matches(bound: &QueryValue, value: &Value, accept: impl Fn(Ordering) -> bool + Copy) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| range_matches(bound, item, accept)),
        _ => bound.ordering_of(value).is_some_and(accept),
    }
}

/// One `field <predicate>` condition
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub predicate: Predicate,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            field: field.into(),
            predicate,
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.predicate.matches(lookup_path(document, &self.field))
    }
}

/// Conjunction of filter clauses over a collection's records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    clauses: Vec<FilterClause>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from every non-control parameter
    pub fn parse(raw: &RawQuery) -> Self {
        Self {
            clauses: raw
                .filter_params()
                .map(|(key, value)| parse_filter_param(key, value))
                .collect(),
        }
    }

    /// Add a clause (AND)
    pub fn and(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.clauses.push(FilterClause::new(field, predicate));
        self
    }

    /// Shorthand for an equality clause
    pub fn with_eq(self, field: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.and(field, Predicate::eq(value))
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.clauses.iter().all(|clause| clause.matches(document))
    }
}

fn bracket_key_regex() -> &'static Regex {
    static BRACKET_KEY: OnceLock<Regex> = OnceLock::new();
    BRACKET_KEY.get_or_init(|| {
        Regex::new(r"^([^\[\]]+)\[([A-Za-z]+)\]$").expect("bracket key pattern is valid")
    })
}

fn parse_filter_param(key: &str, value: &str) -> FilterClause {
    // tuition[gte]=1000
    if let Some(captures) = bracket_key_regex().captures(key) {
        if let Some(op) = Operator::from_token(&captures[2]) {
            return FilterClause::new(&captures[1], op.predicate(value));
        }
        return FilterClause::new(key, Predicate::eq(value));
    }

    // tuition=gte:1000
    if let Some((token, rest)) = value.split_once(':') {
        if let Some(op) = Operator::from_token(token.trim()) {
            return FilterClause::new(key, op.predicate(rest));
        }
    }

    FilterClause::new(key, Predicate::eq(value))
}

// =============================================================================
// Projection
// =============================================================================

/// Set of fields returned for each record
///
/// `Projection::all()` returns every field. A field list always keeps the
/// `id` field. Hidden fields are removed in both cases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    fields: Option<IndexSet<String>>,
    hidden: Vec<String>,
}

impl Projection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = IndexSet::new();
        set.insert(ID_FIELD.to_string());
        set.extend(
            fields
                .into_iter()
                .map(Into::into)
                .filter(|f: &String| !f.is_empty()),
        );
        Self {
            fields: Some(set),
            hidden: Vec::new(),
        }
    }

    /// Parse a comma separated `select` value
    pub fn parse(select: &str) -> Self {
        let fields: Vec<&str> = select
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        if fields.is_empty() {
            Self::all()
        } else {
            Self::fields(fields)
        }
    }

    /// Never return these fields, whatever the selection says
    pub fn hiding<I, S>(mut self, hidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden.extend(hidden.into_iter().map(Into::into));
        self
    }

    /// Selected fields, or `None` for all fields
    pub fn selected(&self) -> Option<impl Iterator<Item = &str>> {
        self.fields.as_ref().map(|f| f.iter().map(String::as_str))
    }

    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }

    /// Whether a top-level field survives this projection
    pub fn includes(&self, field: &str) -> bool {
        if self.hidden.iter().any(|h| h == field) {
            return false;
        }
        match &self.fields {
            None => true,
            Some(fields) => fields
                .iter()
                .any(|f| f == field || f.split('.').next() == Some(field)),
        }
    }

    pub fn apply(&self, document: Document) -> Document {
        let mut projected = match &self.fields {
            None => document,
            Some(fields) => {
                let mut out = Map::new();
                for path in fields {
                    copy_path(&document, &mut out, path);
                }
                out
            }
        };
        for field in &self.hidden {
            projected.remove(field);
        }
        projected
    }
}

fn copy_path(source: &Document, target: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            if let Some(value) = source.get(path) {
                target.insert(path.to_string(), value.clone());
            }
        }
        Some((head, rest)) => {
            let Some(Value::Object(inner)) = source.get(head) else {
                return;
            };
            let entry = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(inner_target) = entry {
                copy_path(inner, inner_target, rest);
            }
        }
    }
}

// =============================================================================
// Sort
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Ordered sort keys, with an implicit final tie-break on `id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<SortKey>,
}

impl SortSpec {
    /// Newest first
    pub fn default_order() -> Self {
        Self {
            keys: vec![SortKey::desc(CREATED_AT_FIELD)],
        }
    }

    /// Parse a `sort` value such as `-averageCost,name`
    pub fn parse(sort: &str) -> Self {
        let keys: Vec<SortKey> = sort
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .filter_map(|k| match k.strip_prefix('-') {
                Some(field) if !field.is_empty() => Some(SortKey::desc(field)),
                Some(_) => None,
                None => Some(SortKey::asc(k.trim_start_matches('+'))),
            })
            .filter(|k| !k.field.is_empty())
            .collect();

        if keys.is_empty() {
            Self::default_order()
        } else {
            Self { keys }
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for key in &self.keys {
            let ordering = compare_values(lookup_path(a, &key.field), lookup_path(b, &key.field));
            let ordering = match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        compare_values(a.get(ID_FIELD), b.get(ID_FIELD))
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::default_order()
    }
}

/// Total order over JSON values, missing values first
///
/// Types rank null < number < string < object < array < boolean. Strings
/// compare byte-wise, which is chronological for stored timestamps since
/// they share one fixed-width UTC format. Objects only rank by type.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Number(x), Value::Number(y)) => number_of(x).total_cmp(&number_of(y)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (left, right) in x.iter().zip(y.iter()) {
                let ordering = compare_values(Some(left), Some(right));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn number_of(value: &serde_json::Number) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

/// Resolve a dotted path (`location.state`) inside a document
pub fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// =============================================================================
// Pagination
// =============================================================================

/// Paging limits applied while parsing `page` and `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub default_limit: u64,
    /// Upper bound on `limit`; unbounded when unset
    pub max_limit: Option<u64>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: None,
        }
    }
}

/// The requested page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Parse `page` and `limit`, falling back to defaults on anything that is
    /// not a positive integer
    pub fn parse(page: Option<&str>, limit: Option<&str>, options: &QueryOptions) -> Self {
        let page = parse_positive(page).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(limit).unwrap_or(options.default_limit);
        let limit = match options.max_limit {
            Some(max) => limit.min(max.max(1)),
            None => limit,
        };
        Self::new(page, limit)
    }

    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

fn parse_positive(value: Option<&str>) -> Option<u64> {
    value?.trim().parse::<u64>().ok().filter(|n| *n >= 1)
}

/// A fully parsed listing request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: FilterExpression,
    pub projection: Projection,
    pub sort: SortSpec,
    pub window: PageWindow,
}

impl ListQuery {
    pub fn parse(raw: &RawQuery, options: &QueryOptions) -> Self {
        Self {
            filter: FilterExpression::parse(raw),
            projection: raw.get("select").map(Projection::parse).unwrap_or_default(),
            sort: raw.get("sort").map(SortSpec::parse).unwrap_or_default(),
            window: PageWindow::parse(raw.get("page"), raw.get("limit"), options),
        }
    }

    /// Restrict the listing to records whose `field` equals `value`
    pub fn scoped(mut self, field: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.filter = self.filter.with_eq(field, value);
        self
    }

    /// Never return these fields
    pub fn hiding<I, S>(mut self, hidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = self.projection.hiding(hidden);
        self
    }
}

/// Link to a neighbouring page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page: u64,
    pub limit: u64,
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub current: u64,

    /// Number of items per page
    pub limit: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,

    /// Records matching the filter, independent of the window
    pub total: u64,
}

impl PaginationMeta {
    pub fn new(window: PageWindow, total: u64) -> Self {
        let start = window.start_index();
        let next = (start.saturating_add(window.limit) < total).then(|| PageLink {
            page: window.page + 1,
            limit: window.limit,
        });
        let prev = (start > 0).then(|| PageLink {
            page: window.page - 1,
            limit: window.limit,
        });

        Self {
            current: window.page,
            limit: window.limit,
            next,
            prev,
            total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_prev(&self) -> bool {
        self.prev.is_some()
    }
}

/// Paginated response body for listing endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,

    /// Number of records in `data`
    pub count: usize,

    pub pagination: PaginationMeta,

    pub data: Vec<Document>,
}

impl ResultEnvelope {
    pub fn new(data: Vec<Document>, pagination: PaginationMeta) -> Self {
        Self {
            success: true,
            count: data.len(),
            pagination,
            data,
        }
    }
}
