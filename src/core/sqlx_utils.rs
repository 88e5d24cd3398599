use chrono::NaiveDate;
use sqlx::{
    postgres::{PgArguments, PgRow},
    query::{Query, QueryAs},
    Postgres,
};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum SqlxBinds {
    String(String),
    OptionString(Option<String>),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Date(NaiveDate),
}

pub fn binds_query(stmt: &str, binds: Vec<SqlxBinds>) -> Query<'_, Postgres, PgArguments> {
    let mut q: Query<'_, Postgres, PgArguments> = sqlx::query(stmt);
    for bind in binds.iter() {
        q = match bind {
            SqlxBinds::String(val) => q.bind(val.clone()),
            SqlxBinds::OptionString(val) => q.bind(val.clone()),
            SqlxBinds::Int(val) => q.bind(*val),
            SqlxBinds::BigInt(val) => q.bind(*val),
            SqlxBinds::Float(val) => q.bind(*val),
            SqlxBinds::Bool(val) => q.bind(*val),
            SqlxBinds::Uuid(val) => q.bind(*val),
            SqlxBinds::Date(val) => q.bind(*val),
        };
    }
    q
}

pub fn binds_query_as<'a, T: for<'r> sqlx::FromRow<'r, PgRow>>(
    stmt: &'a str,
    binds: Vec<SqlxBinds>,
) -> QueryAs<'a, Postgres, T, PgArguments> {
    let mut q: QueryAs<'_, Postgres, T, PgArguments> = sqlx::query_as(stmt);
    for bind in binds.iter() {
        q = match bind {
            SqlxBinds::String(val) => q.bind(val.clone()),
            SqlxBinds::OptionString(val) => q.bind(val.clone()),
            SqlxBinds::Int(val) => q.bind(*val),
            SqlxBinds::BigInt(val) => q.bind(*val),
            SqlxBinds::Float(val) => q.bind(*val),
            SqlxBinds::Bool(val) => q.bind(*val),
            SqlxBinds::Uuid(val) => q.bind(*val),
            SqlxBinds::Date(val) => q.bind(*val),
        };
    }
    q
}

/// Ordered list of predicates and their bind values. Placeholders are
/// numbered when the predicate is pushed, so predicates and binds can never
/// drift apart.
#[derive(Clone, Debug, Default)]
pub struct QueryFilter {
    predicates: Vec<String>,
    binds: Vec<SqlxBinds>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a predicate using `{}` for every placeholder. Each `{}` is
    /// replaced by the next `$n` and consumes one value from `binds`.
    pub fn push(&mut self, template: &str, binds: Vec<SqlxBinds>) {
        let mut predicate = String::new();
        let mut parts = template.split("{}").peekable();
        let mut values = binds.into_iter();
        while let Some(part) = parts.next() {
            predicate.push_str(part);
            if parts.peek().is_some() {
                if let Some(value) = values.next() {
                    self.binds.push(value);
                    predicate.push_str(&format!("${}", self.binds.len()));
                }
            }
        }
        self.predicates.push(predicate);
    }

    /// Predicate without bind values, e.g. `deleted_date IS NULL`.
    pub fn push_raw(&mut self, predicate: &str) {
        self.predicates.push(predicate.to_string());
    }

    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    pub fn binds(&self) -> Vec<SqlxBinds> {
        self.binds.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Anything other than a case-insensitive `asc` sorts descending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(val) if val.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A sortable column. Implementors are closed enums whose `column` values
/// are the only identifiers that can ever reach an ORDER BY clause.
pub trait SortField: Copy + Sized + 'static {
    const ALLOWED: &'static [Self];

    fn column(&self) -> &'static str;

    fn default_field() -> Self;

    fn from_param(value: Option<&str>) -> Self {
        value
            .and_then(|val| Self::ALLOWED.iter().find(|f| f.column() == val).copied())
            .unwrap_or_else(Self::default_field)
    }
}

pub fn order_by<F: SortField>(field: F, order: SortOrder) -> String {
    format!("{} {}", field.column(), order.as_sql())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Row offset of the page. Computed in `u64` so it cannot overflow.
    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.limit)
    }

    pub fn total_pages(&self, total: u32) -> u32 {
        total.div_ceil(self.limit)
    }
}

pub fn query_builder(
    select: Option<String>,
    table_name: &str,
    wheres: &[String],
    order_by: Vec<String>,
    limit: Option<u32>,
    offset: Option<u64>,
) -> String {
    // Select
    let mut stmt = "SELECT ".to_string();
    if let Some(val) = select {
        stmt.push_str(&val);
    } else {
        stmt.push('*');
    }

    // From
    stmt.push_str(format!(" FROM {}", table_name).as_str());

    // Where
    if !wheres.is_empty() {
        stmt.push_str(" WHERE ");
        stmt.push_str(&wheres.join(" AND "));
    }

    // order by
    if !order_by.is_empty() {
        stmt.push_str(" ORDER BY ");
        stmt.push_str(&order_by.join(", "));
    }

    // Limit
    if let Some(limit) = limit {
        stmt.push_str(format!(" LIMIT {}", limit).as_str());
    }

    // Offset
    if let Some(offset) = offset {
        stmt.push_str(format!(" OFFSET {}", offset).as_str());
    }
    stmt
}
