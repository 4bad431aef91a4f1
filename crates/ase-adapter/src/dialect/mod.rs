//! SQL rendering for the Adaptive Server dialect.
//!
//! Everything that turns portable requests into dialect text lives here:
//!
//! - identifier quoting and safe-name composition
//! - statement skeletons (select, insert, update, delete)
//! - DDL column clauses ([`create_column_clause`])
//! - literals and constants ([`literals`])
//! - operator and function templates ([`functions`])
//!
//! # Usage
//!
//! Fragments compose bottom-up: render operands first, then wrap them in
//! operators, then assemble clauses into a statement:
//!
//! ```rust,ignore
//! let clauses = SelectClauses {
//!     columns: format_column("Name"),
//!     from: format_table("", "Customers"),
//!     top: 10,
//!     ..SelectClauses::default()
//! };
//! let sql = format_select(&clauses);
//! ```

pub mod functions;
pub mod literals;

pub use functions::{
    format_binary, format_function, format_starts_with, parameter_name, BinaryOperator,
    FunctionOperator,
};
pub use literals::{fix_non_fixed_text, format_constant, format_string};

use crate::core::schema::{Column, Table};
use crate::core::value::PortableType;
use crate::error::Result;
use crate::typemap::native_type_name;

/// Longest table name the server accepts; longer names are truncated before
/// any catalog lookup or exec batch uses them.
pub const SAFE_NAME_MAX_LENGTH: usize = 28;

/// Truncate a name to the server's identifier limit.
pub fn compose_safe_name(name: &str) -> String {
    name.chars().take(SAFE_NAME_MAX_LENGTH).collect()
}

/// Quote a table name. Schema qualifiers are not emitted on this backend.
pub fn format_table(_schema: &str, table_name: &str) -> String {
    format!("[{}]", table_name)
}

/// Quote a table name with an alias.
pub fn format_table_aliased(_schema: &str, table_name: &str, alias: &str) -> String {
    format!("[{}] {}", table_name, alias)
}

/// Quote a column name.
pub fn format_column(column_name: &str) -> String {
    format!("[{}]", column_name)
}

/// Quote a column name under a table alias.
pub fn format_column_aliased(column_name: &str, table_alias: &str) -> String {
    format!("{}.[{}]", table_alias, column_name)
}

/// Quote a constraint name.
pub fn format_constraint(constraint_name: &str) -> String {
    format!("[{}]", constraint_name)
}

/// Already-rendered pieces of a select statement.
///
/// `columns` and `from` are mandatory; the optional clauses are emitted in
/// where, group by, having, order by sequence when present. A non-zero `top`
/// bounds the row count.
#[derive(Debug, Clone, Default)]
pub struct SelectClauses {
    pub columns: String,
    pub from: String,
    pub where_sql: Option<String>,
    pub group_by: Option<String>,
    pub having: Option<String>,
    pub order_by: Option<String>,
    pub top: u32,
}

/// Assemble a select statement.
///
/// The server's `select top` does not combine with this dialect's other
/// features, so a bounded select brackets the statement in `set rowcount`
/// instead and resets it afterwards.
pub fn format_select(clauses: &SelectClauses) -> String {
    fn expand(keyword: &str, body: Option<&str>) -> String {
        match body {
            Some(body) => format!("\n{} {}", keyword, body),
            None => String::new(),
        }
    }

    let body = format!(
        "select {} from {}{}{}{}{}",
        clauses.columns,
        clauses.from,
        expand("where", clauses.where_sql.as_deref()),
        expand("group by", clauses.group_by.as_deref()),
        expand("having", clauses.having.as_deref()),
        expand("order by", clauses.order_by.as_deref()),
    );
    if clauses.top != 0 {
        format!("set rowcount {} {} set rowcount 0", clauses.top, body)
    } else {
        body
    }
}

/// Assemble an insert statement from rendered fragments.
pub fn format_insert(table: &str, columns: &str, values: &str) -> String {
    format!("insert into {}({})values({})", table, columns, values)
}

/// Assemble an insert that relies on column defaults for every value.
pub fn format_insert_default_values(table: &str) -> String {
    format!("insert into {} values()", table)
}

/// Assemble an update statement from rendered fragments.
pub fn format_update(table: &str, set_clause: &str, where_clause: &str) -> String {
    format!("update {} set {} where {}", table, set_clause, where_clause)
}

/// Assemble a delete statement from rendered fragments.
pub fn format_delete(table: &str, where_clause: &str) -> String {
    format!("delete from {} where {}", table, where_clause)
}

/// Render the full column definition for a create-table statement: native
/// type, default clause, and nullability or identity.
///
/// Identity columns never get a default clause. IDENTITY itself is emitted
/// only for an Int32/Int64 column that is the table's single-column primary
/// key; other key, non-nullable, and Boolean columns get NOT NULL.
pub fn create_column_clause(table: &Table, column: &Column) -> Result<String> {
    let mut clause = native_type_name(column.column_type, column.size)?;

    if !column.is_identity {
        if let Some(raw) = column
            .db_default_value
            .as_deref()
            .filter(|raw| !raw.is_empty())
        {
            clause.push_str(" DEFAULT ");
            clause.push_str(raw);
        } else if let Some(value) = column.default_value.as_ref().filter(|v| !v.is_null()) {
            clause.push_str(" DEFAULT ");
            clause.push_str(&format_constant(value)?);
        }
    }

    if column.is_key || !column.is_nullable || column.column_type == PortableType::Boolean {
        let identity = column.is_identity
            && matches!(column.column_type, PortableType::Int32 | PortableType::Int64)
            && table.is_single_column_pk(&column.name);
        if identity {
            clause.push_str(" IDENTITY");
        } else {
            clause.push_str(" NOT NULL");
        }
    } else {
        clause.push_str(" NULL");
    }
    Ok(clause)
}
