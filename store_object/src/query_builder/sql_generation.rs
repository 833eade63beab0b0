//! SQL generation
//!
//! Translates a [`Predicate`] into a PostgreSQL condition with positional
//! `$n` placeholders plus the ordered values to bind to them.

use crate::query_builder::predicate::{Comparison, ComparisonOp, Operand, Predicate};
use type_mapping::FieldValue;

pub struct SqlGenerator;

impl SqlGenerator {
    /// Build a ` WHERE ...` clause. `first_param` is the index of the first
    /// placeholder, so conditions can follow parameters already in the query.
    pub fn build_where_clause(predicate: Option<&Predicate>, first_param: usize) -> (String, Vec<FieldValue>) {
        match predicate {
            None => (String::new(), Vec::new()),
            Some(predicate) => {
                let (condition, values) = Self::build_condition(predicate, first_param);
                (format!(" WHERE {}", condition), values)
            }
        }
    }

    pub fn build_condition(predicate: &Predicate, first_param: usize) -> (String, Vec<FieldValue>) {
        let mut values = Vec::new();
        let mut param_counter = first_param;
        let sql = Self::build_predicate_sql(predicate, &mut values, &mut param_counter);
        (sql, values)
    }

    pub fn build_order_clause(field: &str, descending: bool) -> String {
        format!(" ORDER BY {} {}", field, if descending { "DESC" } else { "ASC" })
    }

    pub fn build_limit_clause(limit: i64) -> String {
        format!(" LIMIT {}", limit)
    }

    fn build_predicate_sql(
        predicate: &Predicate,
        values: &mut Vec<FieldValue>,
        param_counter: &mut usize,
    ) -> String {
        match predicate {
            Predicate::Comparison(comparison) => {
                Self::build_comparison_sql(comparison, values, param_counter)
            }
            Predicate::And(children) if children.is_empty() => "1=1".to_string(),
            Predicate::Or(children) if children.is_empty() => "1=0".to_string(),
            Predicate::And(children) | Predicate::Or(children) => {
                let operator_str = if matches!(predicate, Predicate::And(_)) {
                    " AND "
                } else {
                    " OR "
                };

                let group_conditions = children
                    .iter()
                    .map(|c| Self::build_predicate_sql(c, values, param_counter))
                    .collect::<Vec<_>>()
                    .join(operator_str);

                format!("({})", group_conditions)
            }
        }
    }

    fn build_comparison_sql(
        comparison: &Comparison,
        values: &mut Vec<FieldValue>,
        param_counter: &mut usize,
    ) -> String {
        let field = &comparison.field;
        let mut bind = |value: FieldValue| {
            values.push(value);
            let param = format!("${}", param_counter);
            *param_counter += 1;
            param
        };

        match (&comparison.op, &comparison.operand) {
            (ComparisonOp::Eq, Operand::Value(FieldValue::Null)) => format!("{} IS NULL", field),
            (ComparisonOp::Ne, Operand::Value(FieldValue::Null)) => format!("{} IS NOT NULL", field),
            // Any other comparison against NULL is never true
            (_, Operand::Value(FieldValue::Null)) => "1=0".to_string(),

            (ComparisonOp::In, Operand::List(list)) => {
                if list.is_empty() {
                    return "1=0".to_string();
                }
                let placeholders: Vec<String> = list.iter().cloned().map(&mut bind).collect();
                format!("{} IN ({})", field, placeholders.join(", "))
            }
            (_, Operand::List(_)) => "1=0".to_string(),

            (ComparisonOp::Contains, Operand::Value(v)) => {
                let param = bind(FieldValue::Text(contains_pattern(v)));
                format!("CAST({} AS TEXT) LIKE {}", field, param)
            }
            (ComparisonOp::IContains, Operand::Value(v)) => {
                let param = bind(FieldValue::Text(contains_pattern(v)));
                format!("CAST({} AS TEXT) ILIKE {}", field, param)
            }
            (ComparisonOp::IExact, Operand::Value(v)) => {
                let param = bind(FieldValue::Text(v.to_string()));
                format!("UPPER(CAST({} AS TEXT)) = UPPER({})", field, param)
            }

            (op, Operand::Value(v)) => {
                let param = bind(v.clone());
                let sql_op = match op {
                    ComparisonOp::Eq => "=",
                    ComparisonOp::Ne => "!=",
                    ComparisonOp::Gt => ">",
                    ComparisonOp::Gte => ">=",
                    ComparisonOp::Lt => "<",
                    ComparisonOp::Lte => "<=",
                    // Handled above
                    ComparisonOp::In
                    | ComparisonOp::Contains
                    | ComparisonOp::IContains
                    | ComparisonOp::IExact => "=",
                };
                format!("{} {} {}", field, sql_op, param)
            }
        }
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped
fn contains_pattern(needle: &FieldValue) -> String {
    let raw = needle.to_string();
    let mut pattern = String::with_capacity(raw.len() + 2);
    pattern.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
