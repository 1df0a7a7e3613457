//! Query descriptors and the statement compiler: identifiers from trusted
//! callers only, values as parameters.

mod bind;
mod compiler;

pub use bind::SqlParam;
pub use compiler::{delete, insert, select, update};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A compiled statement: text plus its ordered bind parameters.
#[derive(Clone, Debug, Default)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Relational operator of one WHERE predicate. `In` consumes a sequence
/// value, one placeholder per element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>", alias = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "LIKE", alias = "like")]
    Like,
    #[serde(rename = "IN", alias = "in")]
    In,
}

impl Op {
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Like => "LIKE",
            Op::In => "IN",
        }
    }
}

/// Boolean join to the previous predicate. The first filter of a list must
/// carry `Logic::None`; later entries must not. Caller contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// One WHERE predicate with an explicit boolean join to its predecessor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    #[serde(rename = "operator")]
    pub op: Op,
    pub value: Value,
    #[serde(default)]
    pub logic: Logic,
}

impl Filter {
    /// First predicate of a list (empty logic).
    pub fn new(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
            logic: Logic::None,
        }
    }

    pub fn and(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            logic: Logic::And,
            ..Self::new(field, op, value)
        }
    }

    pub fn or(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            logic: Logic::Or,
            ..Self::new(field, op, value)
        }
    }
}

/// Column/value pair for INSERT and UPDATE bind lists, in bind order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SqlField {
    pub name: String,
    pub value: Value,
}

impl SqlField {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
        })
    }
}

/// Join descriptor: `<kind> JOIN <table> ON <table>.<foreign_key>=<base>.<local_key>`.
#[derive(Clone, Debug)]
pub struct Join {
    pub table: String,
    pub local_key: String,
    pub foreign_key: String,
    pub kind: JoinKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    Asc,
    Desc,
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        })
    }
}

/// ORDER BY as validated column/direction pairs rather than a raw string.
#[derive(Clone, Debug, Default)]
pub struct OrderBy(pub Vec<(String, SortDir)>);

impl OrderBy {
    pub fn push(&mut self, column: impl Into<String>, dir: SortDir) {
        self.0.push((column.into(), dir));
    }

    pub(crate) fn render(&self) -> String {
        let terms: Vec<String> = self.0.iter().map(|(c, d)| format!("{c} {d}")).collect();
        format!("ORDER BY {}", terms.join(", "))
    }
}

/// GROUP BY as a validated column list rather than a raw string.
#[derive(Clone, Debug, Default)]
pub struct GroupBy(pub Vec<String>);

impl GroupBy {
    pub(crate) fn render(&self) -> String {
        format!("GROUP BY {}", self.0.join(", "))
    }
}
