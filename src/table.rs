use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Page size used by every list view until the user picks another one
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

/// Choices offered by the page-size selector
pub const PAGE_SIZE_CHOICES: [usize; 5] = [10, 30, 50, 100, 200];

/// A resolved field value used for ordering
///
/// Records hand these out from [`Record::field`]. Numbers of both kinds compare
/// numerically with each other; any other pair of different kinds is ordered by
/// kind (boolean, number, date, timestamp, text).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Text(String),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Integer(_) | Value::Decimal(_) => 1,
            Value::Date(_) => 2,
            Value::Timestamp(_) => 3,
            Value::Text(_) => 4,
        }
    }

    /// Total order over values
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.total_cmp(b),
            (Value::Integer(a), Value::Decimal(b)) => (*a as f64).total_cmp(b),
            (Value::Decimal(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", number_text(*d)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(t) => write!(f, "{}", timestamp_text(t)),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

/// Renders a number the way the dashboard shows raw values: integral numbers
/// without a fractional part, everything else in shortest form
pub fn number_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// ISO-8601 text with millisecond precision and a `Z` suffix
pub fn timestamp_text(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Splits `"departamento.nome"` into `("departamento", Some("nome"))`
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// Lower-cased search needle
///
/// Implementations of [`Record::matches`] feed their text projection through
/// this and chain the checks with `||`, so the first hit ends the search.
#[derive(Clone, Debug)]
pub struct SearchTerm {
    needle: String,
}

impl SearchTerm {
    pub fn new(term: &str) -> Self {
        SearchTerm {
            needle: term.to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    /// Case-insensitive substring test against a text fragment
    pub fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.needle)
    }

    /// Absent values never match
    pub fn matches_opt(&self, text: Option<&str>) -> bool {
        text.is_some_and(|t| self.matches(t))
    }

    pub fn matches_value(&self, value: impl Into<Value>) -> bool {
        self.matches(&value.into().to_string())
    }

    pub fn matches_opt_value<V: Into<Value>>(&self, value: Option<V>) -> bool {
        value.is_some_and(|v| self.matches_value(v))
    }
}

/// A row the table engine can search and sort
pub trait Record {
    /// Resolves a dotted field path; unknown paths resolve to `None`
    fn field(&self, path: &str) -> Option<Value>;

    /// True when any searchable field, nested entities included, contains the term
    fn matches(&self, term: &SearchTerm) -> bool;
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, path: &str) -> Option<Value> {
        (**self).field(path)
    }

    fn matches(&self, term: &SearchTerm) -> bool {
        (**self).matches(term)
    }
}

impl Record for serde_json::Value {
    fn field(&self, path: &str) -> Option<Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = match current {
                serde_json::Value::Object(map) => map.get(segment)?,
                serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match current {
            serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Integer(i)),
                None => n.as_f64().map(Value::Decimal),
            },
            serde_json::Value::String(s) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }

    fn matches(&self, term: &SearchTerm) -> bool {
        match self {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => term.matches_value(*b),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(d) if n.as_i64().is_none() => term.matches(&number_text(d)),
                _ => term.matches(&n.to_string()),
            },
            serde_json::Value::String(s) => term.matches(s),
            serde_json::Value::Array(items) => items.iter().any(|item| item.matches(term)),
            serde_json::Value::Object(map) => map.values().any(|value| value.matches(term)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: String,
    pub direction: SortDirection,
}

/// Search, sort and pagination state of one list view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub search_term: String,
    pub sort_config: Option<SortConfig>,
    pub current_page: usize,
    pub items_per_page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            search_term: String::new(),
            sort_config: None,
            current_page: 1,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

/// Everything a list screen renders for one pass over the data
#[derive(Debug, Serialize)]
pub struct TableView<'a, R> {
    pub paginated_data: Vec<&'a R>,
    /// The full filtered and sorted sequence, used by exports and footer totals
    #[serde(skip)]
    pub current_data: Vec<&'a R>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
    pub search_term: String,
    pub sort_config: Option<SortConfig>,
}

/// Data-table engine
///
/// Owns a [`ViewState`] and derives a [`TableView`] from any dataset on demand.
/// The dataset itself is never touched or cached; call [`DataTable::view`]
/// again whenever the data or the state changes.
///
/// # Examples
/// ```
/// use financecontrol::table::DataTable;
///
/// let rows = vec![
///     serde_json::json!({"fornecedor": "Sonangol", "valor": 300}),
///     serde_json::json!({"fornecedor": "Unitel", "valor": 100}),
/// ];
///
/// let mut table = DataTable::new(10);
/// table.request_sort("valor");
/// let view = table.view(&rows);
/// assert_eq!(view.paginated_data[0]["fornecedor"], "Unitel");
/// ```
#[derive(Clone, Debug, Default)]
pub struct DataTable {
    state: ViewState,
}

impl DataTable {
    pub fn new(items_per_page: usize) -> Self {
        DataTable {
            state: ViewState {
                items_per_page: items_per_page.max(1),
                ..ViewState::default()
            },
        }
    }

    pub fn from_state(state: ViewState) -> Self {
        let mut table = DataTable { state };
        table.state.items_per_page = table.state.items_per_page.max(1);
        table.state.current_page = table.state.current_page.max(1);
        table
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn search_term(&self) -> &str {
        &self.state.search_term
    }

    pub fn sort_config(&self) -> Option<&SortConfig> {
        self.state.sort_config.as_ref()
    }

    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.state.items_per_page
    }

    /// Replaces the search term; the page is left alone
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.state.search_term = term.into();
    }

    /// Ascending on a new key, descending on a second request for the same key,
    /// and back to ascending on the third
    pub fn request_sort(&mut self, key: impl Into<String>) {
        let key = key.into();
        let direction = match &self.state.sort_config {
            Some(current)
                if current.key == key && current.direction == SortDirection::Ascending =>
            {
                SortDirection::Descending
            }
            _ => SortDirection::Ascending,
        };
        self.state.sort_config = Some(SortConfig { key, direction });
    }

    /// Page 0 is stored as 1; pages past the end are fixed by the next `view`
    pub fn set_current_page(&mut self, page: usize) {
        self.state.current_page = page.max(1);
    }

    pub fn next_page(&mut self) {
        self.state.current_page += 1;
    }

    pub fn previous_page(&mut self) {
        self.state.current_page = self.state.current_page.saturating_sub(1).max(1);
    }

    pub fn set_items_per_page(&mut self, items_per_page: usize) {
        self.state.items_per_page = items_per_page.max(1);
        self.state.current_page = 1;
    }

    /// Records matching the current search term, in dataset order
    pub fn filtered<'a, R: Record>(&self, data: &'a [R]) -> Vec<&'a R> {
        filter_records(data, &self.state.search_term)
    }

    /// Recomputes every derived view from `data` and the current state
    pub fn view<'a, R: Record>(&mut self, data: &'a [R]) -> TableView<'a, R> {
        let mut current_data = self.filtered(data);
        if let Some(sort) = &self.state.sort_config {
            sort_records(&mut current_data, sort);
        }

        let total_items = current_data.len();
        let total_pages = total_pages(total_items, self.state.items_per_page);
        if self.state.current_page > total_pages && total_pages > 0 {
            self.state.current_page = 1;
        }

        let paginated_data =
            page_slice(&current_data, self.state.current_page, self.state.items_per_page).to_vec();

        TableView {
            paginated_data,
            current_data,
            current_page: self.state.current_page,
            total_pages,
            total_items,
            items_per_page: self.state.items_per_page,
            search_term: self.state.search_term.clone(),
            sort_config: self.state.sort_config.clone(),
        }
    }
}

/// Keeps the records that match `term`; an empty term keeps everything
pub fn filter_records<'a, R: Record>(data: &'a [R], term: &str) -> Vec<&'a R> {
    if term.is_empty() {
        return data.iter().collect();
    }
    let term = SearchTerm::new(term);
    data.iter().filter(|record| record.matches(&term)).collect()
}

/// Stable sort on the resolved value at `sort.key`
///
/// Records whose path does not resolve keep their relative order and go after
/// every resolved record, whatever the direction.
pub fn sort_records<R: Record>(records: &mut Vec<&R>, sort: &SortConfig) {
    let mut keyed: Vec<(Option<Value>, &R)> = records
        .iter()
        .map(|record| (record.field(&sort.key), *record))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| compare_resolved(a.as_ref(), b.as_ref(), sort.direction));

    records.clear();
    records.extend(keyed.into_iter().map(|(_, record)| record));
}

fn compare_resolved(a: Option<&Value>, b: Option<&Value>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Ascending => a.compare(b),
            SortDirection::Descending => b.compare(a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// `ceil(total_items / items_per_page)`, 0 for an empty set
pub fn total_pages(total_items: usize, items_per_page: usize) -> usize {
    total_items.div_ceil(items_per_page.max(1))
}

/// The 1-based `page` of `items`; empty when the page lies past the end
pub fn page_slice<T>(items: &[T], page: usize, items_per_page: usize) -> &[T] {
    let items_per_page = items_per_page.max(1);
    let start = page.saturating_sub(1).saturating_mul(items_per_page);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(items_per_page).min(items.len());
    &items[start..end]
}
