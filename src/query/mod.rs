//! Explicit SQL predicate construction.
//!
//! List endpoints assemble their `WHERE` clauses through [`Predicate`]: each
//! filter becomes a named clause appended only when its input is present, and
//! the clauses are combined with `AND`. Parameters are collected alongside so
//! the final SQL is fully parameterized.

use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::FromRow;

/// Accumulates named predicate clauses combined with `AND`.
#[derive(Debug, Default)]
pub struct Predicate {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub fn equals(&mut self, column: &str, value: impl Into<Value>) {
        let p = self.bind(value.into());
        self.clauses.push(format!("\"{}\" = {}", column, p));
    }

    pub fn not_equals(&mut self, column: &str, value: impl Into<Value>) {
        let p = self.bind(value.into());
        self.clauses.push(format!("\"{}\" <> {}", column, p));
    }

    pub fn gte(&mut self, column: &str, value: impl Into<Value>) {
        let p = self.bind(value.into());
        self.clauses.push(format!("\"{}\" >= {}", column, p));
    }

    pub fn lte(&mut self, column: &str, value: impl Into<Value>) {
        let p = self.bind(value.into());
        self.clauses.push(format!("\"{}\" <= {}", column, p));
    }

    /// Case-insensitive substring match.
    pub fn contains(&mut self, column: &str, term: &str) {
        let p = self.bind(Value::String(format!("%{}%", escape_like(term))));
        self.clauses.push(format!("\"{}\" ILIKE {}", column, p));
    }

    /// Exact membership in a text-array column.
    pub fn array_has(&mut self, column: &str, value: &str) {
        let p = self.bind(Value::String(value.to_string()));
        self.clauses.push(format!("{} = ANY(\"{}\")", p, column));
    }

    /// Adds a parenthesized OR-group of alternatives. A group that ends up
    /// with no alternatives contributes nothing.
    pub fn any(&mut self, build: impl FnOnce(&mut OrGroup<'_>)) {
        let mut group = OrGroup {
            params: &mut self.params,
            alternatives: Vec::new(),
        };
        build(&mut group);
        let alternatives = group.alternatives;
        if !alternatives.is_empty() {
            self.clauses.push(format!("({})", alternatives.join(" OR ")));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// `WHERE …` fragment, or an empty string when no clause was added.
    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Alternatives within one OR-group; parameters land in the parent predicate.
pub struct OrGroup<'a> {
    params: &'a mut Vec<Value>,
    alternatives: Vec<String>,
}

impl OrGroup<'_> {
    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    pub fn equals(&mut self, column: &str, value: impl Into<Value>) {
        let p = self.bind(value.into());
        self.alternatives.push(format!("\"{}\" = {}", column, p));
    }

    pub fn contains(&mut self, column: &str, term: &str) {
        let p = self.bind(Value::String(format!("%{}%", escape_like(term))));
        self.alternatives.push(format!("\"{}\" ILIKE {}", column, p));
    }
}

/// Accumulates `SET` assignments for partial updates; columns absent from the
/// patch are never touched.
#[derive(Debug, Default)]
pub struct UpdateSet {
    assignments: Vec<String>,
    params: Vec<Value>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.params.push(value.into());
        self.assignments
            .push(format!("\"{}\" = ${}", column, self.params.len()));
    }

    pub fn set_null(&mut self, column: &str) {
        self.assignments.push(format!("\"{}\" = NULL", column));
    }

    /// Raw assignment for SQL-side expressions such as `NOW()`.
    pub fn set_raw(&mut self, assignment: &str) {
        self.assignments.push(assignment.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Builds `UPDATE … RETURNING *` keyed on `id`, always touching
    /// `updated_at`. The id is bound as the final parameter.
    pub fn into_update_sql(mut self, table: &str, id: i64) -> (String, Vec<Value>) {
        self.assignments.push("\"updated_at\" = NOW()".to_string());
        self.params.push(Value::from(id));
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"id\" = ${} RETURNING *",
            table,
            self.assignments.join(", "),
            self.params.len()
        );
        (sql, self.params)
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Bind collected JSON parameters onto a `query_as` statement.
pub fn bind_values<'q, T>(
    mut q: sqlx::query::QueryAs<'q, sqlx::Postgres, T, PgArguments>,
    params: &'q [Value],
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, T, PgArguments>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    for p in params {
        q = match p {
            Value::Null => {
                let none: Option<String> = None;
                q.bind(none)
            }
            Value::Bool(b) => q.bind(*b),
            Value::Number(n) => bind_number_as(q, n),
            Value::String(s) => q.bind(s),
            Value::Array(arr) => {
                let strings: Vec<String> = arr
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
                q.bind(strings)
            }
            Value::Object(_) => q.bind(p.clone()), // JSONB
        };
    }
    q
}

/// Bind collected JSON parameters onto a plain statement (counts).
pub fn bind_values_query<'q>(
    mut q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    for p in params {
        q = match p {
            Value::Null => {
                let none: Option<String> = None;
                q.bind(none)
            }
            Value::Bool(b) => q.bind(*b),
            Value::Number(n) => bind_number(q, n),
            Value::String(s) => q.bind(s),
            Value::Array(arr) => {
                let strings: Vec<String> = arr
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
                q.bind(strings)
            }
            Value::Object(_) => q.bind(p.clone()),
        };
    }
    q
}

fn bind_number_as<'q, T>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, T, PgArguments>,
    n: &serde_json::Number,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, T, PgArguments>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    if let Some(i) = n.as_i64() {
        q.bind(i)
    } else if let Some(f) = n.as_f64() {
        q.bind(f)
    } else {
        q.bind(n.to_string())
    }
}

fn bind_number<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    n: &serde_json::Number,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    if let Some(i) = n.as_i64() {
        q.bind(i)
    } else if let Some(f) = n.as_f64() {
        q.bind(f)
    } else {
        q.bind(n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_predicate_produces_no_where_clause() {
        let p = Predicate::new();
        assert!(p.is_empty());
        assert_eq!(p.where_sql(), "");
        assert!(p.params().is_empty());
    }

    #[test]
    fn clauses_are_joined_with_and() {
        let mut p = Predicate::new();
        p.equals("color", "black");
        p.gte("price", 100);
        p.lte("price", 500);

        assert_eq!(
            p.where_sql(),
            "WHERE \"color\" = $1 AND \"price\" >= $2 AND \"price\" <= $3"
        );
        assert_eq!(p.params().len(), 3);
    }

    #[test]
    fn or_group_wraps_alternatives_in_parens() {
        let mut p = Predicate::new();
        p.equals("active", true);
        p.any(|or| {
            or.contains("name", "iphone");
            or.contains("slug", "iphone");
            or.equals("capacity", 128);
        });

        assert_eq!(
            p.where_sql(),
            "WHERE \"active\" = $1 AND (\"name\" ILIKE $2 OR \"slug\" ILIKE $3 OR \"capacity\" = $4)"
        );
        assert_eq!(p.params()[1], Value::String("%iphone%".to_string()));
        assert_eq!(p.params()[3], Value::from(128));
    }

    #[test]
    fn empty_or_group_contributes_nothing() {
        let mut p = Predicate::new();
        p.any(|_| {});
        assert!(p.is_empty());
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        let mut p = Predicate::new();
        p.contains("name", "100%_plus");
        assert_eq!(
            p.params()[0],
            Value::String("%100\\%\\_plus%".to_string())
        );
    }

    #[test]
    fn array_membership_uses_any() {
        let mut p = Predicate::new();
        p.array_has("tags", "rust");
        assert_eq!(p.where_sql(), "WHERE $1 = ANY(\"tags\")");
    }

    #[test]
    fn update_set_binds_id_last_and_touches_updated_at() {
        let mut u = UpdateSet::new();
        u.set("name", "iPhone 15");
        u.set_null("published_at");
        let (sql, params) = u.into_update_sql("blog_posts", 7);

        assert_eq!(
            sql,
            "UPDATE \"blog_posts\" SET \"name\" = $1, \"published_at\" = NULL, \
             \"updated_at\" = NOW() WHERE \"id\" = $2 RETURNING *"
        );
        assert_eq!(params.last(), Some(&Value::from(7)));
    }
}
