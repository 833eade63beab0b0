//! Caller-supplied SQL with named `:name` placeholders
//!
//! The query is wrapped as a subquery so the predicate, ordering and limit
//! can be applied on top of it without touching its text:
//!
//! ```text
//! SELECT * FROM (<query>) AS relay_source WHERE ... ORDER BY ... LIMIT ...
//! ```

use super::binding::{bind_value, decode_row};
use super::{check_fields, FetchRequest, QueryExecutor};
use crate::errors::StoreError;
use crate::query_builder::SqlGenerator;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;
use type_mapping::{FieldValue, Row};

#[derive(Debug, Clone)]
pub struct RawQueryExecutor {
    pool: PgPool,
    schema: Arc<SchemaDescriptor>,
    sql: String,
}

impl RawQueryExecutor {
    pub fn new(pool: PgPool, schema: Arc<SchemaDescriptor>, sql: &str) -> Self {
        Self {
            pool,
            schema,
            sql: sql.trim().trim_end_matches(';').trim_end().to_string(),
        }
    }

    /// Full statement and its bind values, in placeholder order
    pub fn build_sql(&self, request: &FetchRequest) -> Result<(String, Vec<FieldValue>), StoreError> {
        check_fields(&self.schema, request)?;

        let (inner, mut values) = rewrite_named_placeholders(&self.sql, &request.params)?;
        let (where_clause, predicate_values) =
            SqlGenerator::build_where_clause(request.predicate.as_ref(), values.len() + 1);
        values.extend(predicate_values);

        let sql = format!(
            "SELECT * FROM ({}) AS relay_source{}{}{}",
            inner,
            where_clause,
            SqlGenerator::build_order_clause(&request.order_field, request.descending),
            SqlGenerator::build_limit_clause(request.limit),
        );

        Ok((sql, values))
    }
}

#[async_trait]
impl QueryExecutor for RawQueryExecutor {
    fn source(&self) -> String {
        format!("raw:{}", self.sql)
    }

    async fn execute(&self, request: &FetchRequest) -> Result<Vec<Row>, StoreError> {
        let (sql, values) = self.build_sql(request)?;
        tracing::debug!(collection = self.schema.collection(), sql = %sql, "executing raw query");

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::execution(self.schema.collection(), e))?;

        rows.iter().map(|row| decode_row(row, &self.schema)).collect()
    }
}

/// Rewrite `:name` placeholders to `$n`, returning the values in `$n` order.
///
/// A name used twice binds once. `::` casts, quoted strings, quoted
/// identifiers, comments and dollar-quoted bodies are left alone.
pub fn rewrite_named_placeholders(
    sql: &str,
    params: &BTreeMap<String, FieldValue>,
) -> Result<(String, Vec<FieldValue>), StoreError> {
    let chars: Vec<char> = sql.chars().collect();
    let mut rewritten = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut values = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                // Copy through the closing quote; doubled quotes reopen immediately
                rewritten.push(c);
                i += 1;
                while i < chars.len() {
                    rewritten.push(chars[i]);
                    i += 1;
                    if chars[i - 1] == c {
                        break;
                    }
                }
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    rewritten.push(chars[i]);
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let end = find_seq(&chars, i + 2, &['*', '/']).map_or(chars.len(), |p| p + 2);
                rewritten.extend(&chars[i..end]);
                i = end;
            }
            '$' if !follows_identifier(&chars, i) => match dollar_tag_end(&chars, i) {
                Some(tag_end) => {
                    let tag = &chars[i..tag_end];
                    let end = find_seq(&chars, tag_end, tag).map_or(chars.len(), |p| p + tag.len());
                    rewritten.extend(&chars[i..end]);
                    i = end;
                }
                None => {
                    rewritten.push(c);
                    i += 1;
                }
            },
            ':' if chars.get(i + 1) == Some(&':') => {
                rewritten.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();

                let position = match names.iter().position(|n| *n == name) {
                    Some(p) => p,
                    None => {
                        let value = params
                            .get(&name)
                            .cloned()
                            .ok_or_else(|| StoreError::MissingParameter(name.clone()))?;
                        names.push(name);
                        values.push(value);
                        names.len() - 1
                    }
                };

                rewritten.push_str(&format!("${}", position + 1));
                i = end;
            }
            _ => {
                rewritten.push(c);
                i += 1;
            }
        }
    }

    Ok((rewritten, values))
}

fn find_seq(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    chars
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|p| p + from)
}

/// `$` inside an identifier such as `price$usd` opens nothing
fn follows_identifier(chars: &[char], i: usize) -> bool {
    i > 0 && (chars[i - 1].is_ascii_alphanumeric() || chars[i - 1] == '_' || chars[i - 1] == '$')
}

/// End (exclusive) of a `$tag$` or `$$` opener at `start`. `$1` is not one.
fn dollar_tag_end(chars: &[char], start: usize) -> Option<usize> {
    let mut end = start + 1;
    if chars.get(end).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    (chars.get(end) == Some(&'$')).then_some(end + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_builder::Predicate;
    use type_mapping::FieldType;

    fn params() -> BTreeMap<String, FieldValue> {
        let mut params = BTreeMap::new();
        params.insert("customer".to_string(), FieldValue::Integer(7));
        params.insert("status".to_string(), FieldValue::Text("open".into()));
        params
    }

    #[test]
    fn test_named_placeholders_become_positional() {
        let (sql, values) = rewrite_named_placeholders(
            "SELECT * FROM orders WHERE customer_id = :customer AND status = :status OR parent_id = :customer",
            &params(),
        )
        .unwrap();

        assert_eq!(
            sql,
            "SELECT * FROM orders WHERE customer_id = $1 AND status = $2 OR parent_id = $1"
        );
        assert_eq!(values, vec![FieldValue::Integer(7), FieldValue::Text("open".into())]);
    }

    #[test]
    fn test_casts_and_literals_untouched() {
        let (sql, values) = rewrite_named_placeholders(
            "SELECT created::date, 'at :noon', \"odd:col\" FROM t WHERE a = :status",
            &params(),
        )
        .unwrap();

        assert_eq!(
            sql,
            "SELECT created::date, 'at :noon', \"odd:col\" FROM t WHERE a = $1"
        );
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_comments_and_dollar_quotes_untouched() {
        let sql = "SELECT id -- filtered by :status later\n\
                   FROM orders /* :ignored */ WHERE note <> $$ends at :noon$$ \
                   AND body <> $fn$ :also_ignored $fn$ AND customer_id = :customer";
        let (rewritten, values) = rewrite_named_placeholders(sql, &params()).unwrap();

        assert!(rewritten.contains("-- filtered by :status later\n"));
        assert!(rewritten.contains("/* :ignored */"));
        assert!(rewritten.contains("$$ends at :noon$$"));
        assert!(rewritten.contains("$fn$ :also_ignored $fn$"));
        assert!(rewritten.ends_with("customer_id = $1"));
        assert_eq!(values, vec![FieldValue::Integer(7)]);
    }

    #[test]
    fn test_dollar_inside_identifier_is_not_a_quote() {
        let (rewritten, values) =
            rewrite_named_placeholders("SELECT price$usd FROM t WHERE a = :status", &params()).unwrap();
        assert_eq!(rewritten, "SELECT price$usd FROM t WHERE a = $1");
        assert_eq!(values.len(), 1);
    }

    fn executor() -> RawQueryExecutor {
        let pool = PgPool::connect_lazy("postgres://localhost/relayhaus").unwrap();
        let schema = SchemaDescriptor::builder("Order")
            .primary_key("id", FieldType::Int)
            .field("customer_id", FieldType::Int)
            .build()
            .unwrap();
        RawQueryExecutor::new(
            pool,
            Arc::new(schema),
            "SELECT id, customer_id FROM orders WHERE customer_id = :customer;",
        )
    }

    #[tokio::test]
    async fn test_wrapped_statement() {
        let request = FetchRequest::new("id", 11)
            .with_predicate(Predicate::lt("id", 40))
            .with_params(params());

        let (sql, values) = executor().build_sql(&request).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT id, customer_id FROM orders WHERE customer_id = $1) AS relay_source \
             WHERE id < $2 ORDER BY id DESC LIMIT 11"
        );
        assert_eq!(values, vec![FieldValue::Integer(7), FieldValue::Integer(40)]);
        assert!(executor().source().starts_with("raw:SELECT id"));
    }

    #[tokio::test]
    async fn test_undeclared_fields_never_reach_sql() {
        let bad_order = FetchRequest::new("id; DROP TABLE orders", 11).with_params(params());
        assert!(matches!(
            executor().build_sql(&bad_order),
            Err(StoreError::UnknownField { .. })
        ));

        let bad_predicate = FetchRequest::new("id", 11)
            .with_predicate(Predicate::eq("1=1 OR id", 1))
            .with_params(params());
        assert!(matches!(
            executor().build_sql(&bad_predicate),
            Err(StoreError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_missing_parameter() {
        let result = rewrite_named_placeholders("SELECT 1 WHERE x = :absent", &params());
        assert!(matches!(result, Err(StoreError::MissingParameter(name)) if name == "absent"));
    }
}
