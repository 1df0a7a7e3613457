//! Compiles query intents into parameterized statements. Pure string
//! assembly: values are never interpolated, identifiers are trusted input.

use super::{Filter, GroupBy, Join, Op, OrderBy, SqlField, SqlParam, Statement};

/// Compile a SELECT. Empty `cols` selects `*`. `limit == 0` means no LIMIT;
/// OFFSET is only emitted alongside a LIMIT.
pub fn select(
    table: &str,
    cols: &[String],
    joins: &[Join],
    filters: &[Filter],
    group: Option<&GroupBy>,
    order: Option<&OrderBy>,
    limit: u64,
    offset: u64,
) -> Statement {
    let mut stmt = Statement::default();
    let col_list = if cols.is_empty() {
        "*".to_string()
    } else {
        cols.join(", ")
    };

    let mut sql = format!("SELECT {col_list} FROM {table}");
    for j in joins {
        sql.push_str(&format!(
            " {} JOIN {} ON {}.{}={}.{}",
            j.kind, j.table, j.table, j.foreign_key, table, j.local_key
        ));
    }
    push_where(&mut sql, &mut stmt.params, filters);
    if let Some(g) = group {
        sql.push(' ');
        sql.push_str(&g.render());
    }
    if let Some(o) = order {
        sql.push(' ');
        sql.push_str(&o.render());
    }
    if limit > 0 {
        sql.push_str(&format!(" LIMIT {limit}"));
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }
    stmt.sql = sql;
    stmt
}

/// Compile an INSERT: column list in field order, one placeholder and one
/// parameter per field.
pub fn insert(table: &str, fields: &[SqlField]) -> Statement {
    let mut stmt = Statement::default();
    let mut cols = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    for f in fields {
        cols.push(f.name.as_str());
        placeholders.push("?");
        stmt.params.push(SqlParam::from_json(&f.value));
    }
    stmt.sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        cols.join(", "),
        placeholders.join(", ")
    );
    stmt
}

/// Compile an UPDATE of one row. SET placeholders come first in both the
/// text and the parameter list; the key filter's parameter is last.
pub fn update(table: &str, fields: &[SqlField], key: &Filter) -> Statement {
    let mut stmt = Statement::default();
    let mut sets = Vec::with_capacity(fields.len());
    for f in fields {
        sets.push(format!("{} = ?", f.name));
        stmt.params.push(SqlParam::from_json(&f.value));
    }
    let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
    push_where(&mut sql, &mut stmt.params, std::slice::from_ref(key));
    stmt.sql = sql;
    stmt
}

/// Compile a DELETE of one row by its key filter.
pub fn delete(table: &str, key: &Filter) -> Statement {
    let mut stmt = Statement::default();
    let mut sql = format!("DELETE FROM {table}");
    push_where(&mut sql, &mut stmt.params, std::slice::from_ref(key));
    stmt.sql = sql;
    stmt
}

/// Walk the filter list left to right: each filter past the first is
/// prefixed by its logic operator, each predicate is parenthesized, and
/// `IN` expands its sequence value into one placeholder per element. An
/// empty sequence still compiles (`IN ()`) and binds nothing.
fn push_where(sql: &mut String, params: &mut Vec<SqlParam>, filters: &[Filter]) {
    if filters.is_empty() {
        return;
    }
    sql.push_str(" WHERE ");
    for (i, f) in filters.iter().enumerate() {
        if i > 0 {
            sql.push_str(&format!(" {} ", logic_sql(f)));
        }
        if f.op == Op::In {
            let values = match &f.value {
                serde_json::Value::Array(items) => items.clone(),
                // a single scalar is coerced into a one-element sequence
                other => vec![other.clone()],
            };
            let placeholders = vec!["?"; values.len()].join(", ");
            sql.push_str(&format!("({} IN ({placeholders}))", f.field));
            params.extend(values.iter().map(SqlParam::from_json));
        } else {
            sql.push_str(&format!("({} {} ?)", f.field, f.op.as_sql()));
            params.push(SqlParam::from_json(&f.value));
        }
    }
}

fn logic_sql(f: &Filter) -> &'static str {
    match f.logic {
        // a missing logic on a non-first filter is a caller bug; AND is the
        // only join that keeps the statement well-formed
        super::Logic::None | super::Logic::And => "AND",
        super::Logic::Or => "OR",
    }
}
