//! System-catalog introspection.
//!
//! Reads table, key, index, foreign-key, and stored-procedure metadata out of
//! the server's system tables (sysobjects, syscolumns, sysindexes,
//! sysreferences). Every lookup goes through [`BackendConnection`], so any
//! registered driver serves them.
//!
//! The catalog reports single-column keys only through `index_col(..., 1)`;
//! discovery fails loudly on multi-column keys instead of returning a
//! truncated definition.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::core::schema::{
    ArgumentDirection, Column, ForeignKey, Index, PrimaryKey, SprocArgument, SprocResultSet,
    StoredProcedure, Table,
};
use crate::core::traits::{BackendConnection, BoundParameter, ParameterDirection, SelectResult};
use crate::core::value::{PortableType, PortableValue};
use crate::dialect::compose_safe_name;
use crate::error::{AseError, Result};
use crate::typemap::{db_type_to_portable, reformat_read_value, type_from_number};

fn table_name_parameter(table_name: &str) -> BoundParameter {
    BoundParameter::new(
        "@p1",
        PortableValue::text_owned(compose_safe_name(table_name)),
    )
}

fn first_result(mut results: Vec<SelectResult>) -> SelectResult {
    if results.is_empty() {
        SelectResult::default()
    } else {
        results.swap_remove(0)
    }
}

fn text_at(row: &[PortableValue<'static>], index: usize, what: &str) -> Result<String> {
    row.get(index)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| AseError::catalog(format!("{}: field {} is not text", what, index)))
}

fn int_at(row: &[PortableValue<'static>], index: usize, what: &str) -> Result<i32> {
    row.get(index)
        .and_then(|v| v.to_i32())
        .ok_or_else(|| AseError::catalog(format!("{}: field {} is not numeric", what, index)))
}

/// Load column definitions for `table` from syscolumns.
///
/// Column defaults come back in two forms: the raw expression text recovered
/// from the default object, and, when the expression evaluates server-side,
/// a typed value coerced to the column's portable type.
pub fn get_columns(connection: &mut dyn BackendConnection, table: &mut Table) -> Result<()> {
    let sql = "select c.name, c.type, c.prec, c.length, c.usertype, @@ncharsize, c.status, dflt.name defaultValueName \
               from syscolumns c \
               left join sysobjects t on c.id = t.id \
               left join sysobjects dflt on c.cdefault=dflt.id and dflt.type='D' \
               where t.name = @p1";
    let results = connection.execute_reader(sql, &[table_name_parameter(&table.name)])?;
    let data = first_result(results);

    for row in &data.rows {
        let name = text_at(row, 0, "syscolumns")?;
        let type_code = int_at(row, 1, "syscolumns")? as u8;
        // prec is null for non-numeric columns
        let precision = row.get(2).and_then(|v| v.to_i32()).unwrap_or(0) as u8;
        let length = int_at(row, 3, "syscolumns")?;
        let user_type = int_at(row, 4, "syscolumns")? as i16;
        let nchar_size = int_at(row, 5, "syscolumns")? as u8;
        let status = int_at(row, 6, "syscolumns")?;

        let (column_type, size) = type_from_number(type_code, precision, length, user_type, nchar_size);

        let default_name = row
            .get(7)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_default();
        let mut db_default_value = None;
        let mut default_value = None;
        if !default_name.is_empty() {
            let expr = default_value_sql_expression(connection, &default_name)?;
            if !expr.is_empty() {
                if expr == "''"
                    && matches!(column_type, PortableType::Char | PortableType::String)
                {
                    default_value = Some(PortableValue::text_owned(String::new()));
                } else {
                    // Defaults can reference server state that a bare select
                    // cannot evaluate; those keep only their expression text.
                    match connection.execute_scalar(&format!("select {}", expr), &[]) {
                        Ok(value) => default_value = value.filter(|v| !v.is_null()),
                        Err(error) => {
                            debug!("Default expression for {} did not evaluate: {}", name, error);
                        }
                    }
                }
            }
            db_default_value = Some(expr);
            if let Some(value) = default_value.take() {
                default_value = Some(reformat_read_value(value, column_type));
            }
        }

        let mut column = Column::new(name, column_type);
        column.size = size;
        column.is_nullable = status & 0x08 != 0;
        column.is_identity = status & 128 == 128;
        column.default_value = default_value;
        column.db_default_value = db_default_value;
        table.add_column(column);
    }

    debug!("Loaded {} columns for {}", table.columns.len(), table.name);
    Ok(())
}

/// Recover a default object's defining expression via sp_helptext.
///
/// The definition text sits in the second result set, split over rows; the
/// concatenated text reads `DEFAULT <expression>`.
fn default_value_sql_expression(
    connection: &mut dyn BackendConnection,
    default_name: &str,
) -> Result<String> {
    let parameters = [BoundParameter::new(
        "@p1",
        PortableValue::text_owned(default_name.to_string()),
    )];
    let results = connection.execute_reader("sp_helptext @p1", &parameters)?;
    let text_set = results
        .into_iter()
        .nth(1)
        .ok_or_else(|| AseError::catalog("sp_helptext returned no definition text"))?;

    let mut text = String::new();
    for row in &text_set.rows {
        if let Some(piece) = row.first().and_then(|v| v.as_str()) {
            text.push_str(piece);
        }
    }
    let expr = match text.strip_prefix("DEFAULT ") {
        Some(rest) => rest.trim(),
        None => text.trim(),
    };
    Ok(expr.to_string())
}

/// Load the primary key for `table` and mark its key column.
pub fn get_primary_key(connection: &mut dyn BackendConnection, table: &mut Table) -> Result<()> {
    let sql = "select index_col(o.name, i.indid, 1), i.keycnt from sysindexes i \
               join sysobjects o on o.id = i.id \
               where i.status & 2048 <> 0 and o.name = @p1";
    let results = connection.execute_reader(sql, &[table_name_parameter(&table.name)])?;
    let data = first_result(results);

    if let Some(row) = data.rows.first() {
        if int_at(row, 1, "sysindexes")? != 1 {
            return Err(AseError::MultiColumnUnsupported(table.name.clone()));
        }
        let column_name = text_at(row, 0, "sysindexes")?;
        if let Some(column) = table.get_column_mut(&column_name) {
            column.is_key = true;
        }
        table.primary_key = Some(PrimaryKey::new(vec![column_name]));
    }
    Ok(())
}

/// Load secondary indexes for `table`.
pub fn get_indexes(connection: &mut dyn BackendConnection, table: &mut Table) -> Result<()> {
    let sql = "select index_col(o.name, i.indid, 1), i.keycnt, (i.status & 2) from sysindexes i \
               join sysobjects o on o.id = i.id \
               where o.name = @p1 and i.keycnt > 1 and i.status & 2048 = 0";
    let results = connection.execute_reader(sql, &[table_name_parameter(&table.name)])?;
    let data = first_result(results);

    for row in &data.rows {
        // keycnt counts the row pointer on these indexes; 2 means one
        // declared column
        if int_at(row, 1, "sysindexes")? != 2 {
            return Err(AseError::MultiColumnUnsupported(table.name.clone()));
        }
        table.indexes.push(Index {
            columns: vec![text_at(row, 0, "sysindexes")?],
            is_unique: int_at(row, 2, "sysindexes")? == 2,
        });
    }

    debug!("Loaded {} indexes for {}", table.indexes.len(), table.name);
    Ok(())
}

/// Load foreign keys for `table` from sysreferences.
pub fn get_foreign_keys(connection: &mut dyn BackendConnection, table: &mut Table) -> Result<()> {
    let sql = r#"select f.keycnt, fc.name, pc.name, r.name from sysreferences f
join sysobjects o on o.id = f.tableid
join sysobjects r on r.id = f.reftabid
join syscolumns fc on f.fokey1 = fc.colid and fc.id = o.id
join syscolumns pc on f.refkey1 = pc.colid and pc.id = r.id
where o.name = @p1"#;
    let results = connection.execute_reader(sql, &[table_name_parameter(&table.name)])?;
    let data = first_result(results);

    for row in &data.rows {
        if int_at(row, 0, "sysreferences")? != 1 {
            return Err(AseError::MultiColumnUnsupported(table.name.clone()));
        }
        table.foreign_keys.push(ForeignKey {
            columns: vec![text_at(row, 1, "sysreferences")?],
            ref_table: text_at(row, 3, "sysreferences")?,
            ref_columns: vec![text_at(row, 2, "sysreferences")?],
        });
    }

    debug!("Loaded {} foreign keys for {}", table.foreign_keys.len(), table.name);
    Ok(())
}

/// Load the full schema for `table`: columns, primary key, and optionally
/// indexes and foreign keys.
pub fn get_table_schema(
    connection: &mut dyn BackendConnection,
    table: &mut Table,
    check_indexes: bool,
    check_foreign_keys: bool,
) -> Result<()> {
    get_columns(connection, table)?;
    get_primary_key(connection, table)?;
    if check_indexes {
        get_indexes(connection, table)?;
    }
    if check_foreign_keys {
        get_foreign_keys(connection, table)?;
    }
    Ok(())
}

/// Decide which of `tables` are missing from the database.
///
/// Existing objects get their `is_view` flag set from the catalog; the
/// returned indices are the tables that still need creation.
pub fn collect_tables_to_create(
    connection: &mut dyn BackendConnection,
    tables: &mut [Table],
) -> Result<Vec<usize>> {
    if tables.is_empty() {
        return Ok(Vec::new());
    }

    let mut placeholders = Vec::with_capacity(tables.len());
    let mut parameters = Vec::with_capacity(tables.len());
    for (index, table) in tables.iter().enumerate() {
        let placeholder = format!("@p{}", index);
        parameters.push(BoundParameter::new(
            placeholder.clone(),
            PortableValue::text_owned(compose_safe_name(&table.name)),
        ));
        placeholders.push(placeholder);
    }
    let sql = format!(
        "select name,type from sysobjects where name in ({}) and type in ('U', 'V')",
        placeholders.join(",")
    );
    let results = connection.execute_reader(&sql, &parameters)?;
    let data = first_result(results);

    let mut existing = HashMap::new();
    for row in &data.rows {
        let name = text_at(row, 0, "sysobjects")?;
        let object_type = text_at(row, 1, "sysobjects")?;
        existing.insert(name, object_type.trim() == "V");
    }

    let mut missing = Vec::new();
    for (index, table) in tables.iter_mut().enumerate() {
        match existing.get(compose_safe_name(&table.name).as_str()) {
            Some(&is_view) => table.is_view = is_view,
            None => missing.push(index),
        }
    }

    debug!("{} of {} tables need creation", missing.len(), tables.len());
    Ok(missing)
}

/// List user table names, optionally including views.
pub fn storage_tables(
    connection: &mut dyn BackendConnection,
    include_views: bool,
) -> Result<Vec<String>> {
    let sql = format!(
        "select name from sysobjects where type in ('U'{})",
        if include_views { ", 'V'" } else { "" }
    );
    let results = connection.execute_reader(&sql, &[])?;
    let data = first_result(results);

    let mut names = Vec::with_capacity(data.rows.len());
    for row in &data.rows {
        names.push(text_at(row, 0, "sysobjects")?);
    }
    Ok(names)
}

/// Drop every user table, removing foreign-key constraints first so drop
/// order does not matter.
pub fn clear_database(connection: &mut dyn BackendConnection) -> Result<()> {
    let sql = "select o.name, t.name from sysreferences f \
               join sysobjects o on f.constrid = o.id \
               join sysobjects t on f.tableid = t.id";
    let results = connection.execute_reader(sql, &[])?;
    let constraints = first_result(results);
    for row in &constraints.rows {
        let constraint = text_at(row, 0, "sysreferences")?;
        let table = text_at(row, 1, "sysreferences")?;
        connection.execute_non_query(
            &format!("alter table [{}] drop constraint [{}]", table, constraint),
            &[],
        )?;
    }

    let tables = storage_tables(connection, false)?;
    for table in &tables {
        connection.execute_non_query(&format!("drop table [{}]", table), &[])?;
    }

    info!(
        "Cleared database: {} constraints, {} tables dropped",
        constraints.rows.len(),
        tables.len()
    );
    Ok(())
}

/// Discover stored procedures: names, derived arguments, and the shape of
/// their first result set.
///
/// Argument metadata comes from the driver; result-set shapes come from a
/// metadata-only execution under `set fmtonly on` with null arguments.
pub fn stored_procedures(connection: &mut dyn BackendConnection) -> Result<Vec<StoredProcedure>> {
    let results = connection.execute_reader("select * from sysobjects where type = 'P'", &[])?;
    let data = first_result(results);
    let mut procedures = Vec::with_capacity(data.rows.len());
    for row in &data.rows {
        procedures.push(StoredProcedure::new(text_at(row, 0, "sysobjects")?));
    }

    for procedure in &mut procedures {
        let derived = connection.derive_parameters(&procedure.name)?;
        let mut fake_parameters = Vec::with_capacity(derived.len());
        for parameter in derived {
            let direction = match parameter.direction {
                ParameterDirection::InputOutput => ArgumentDirection::InOut,
                ParameterDirection::Output => ArgumentDirection::Out,
                // Return values bind like plain inputs here
                ParameterDirection::Input | ParameterDirection::ReturnValue => {
                    ArgumentDirection::In
                }
            };
            procedure.arguments.push(SprocArgument {
                name: parameter.name,
                argument_type: db_type_to_portable(parameter.db_type),
                direction,
            });
            fake_parameters.push("null");
        }

        let batch = format!(
            "set showplan on\nset fmtonly on\nexec [{}] {}\nset fmtonly off\nset showplan off",
            compose_safe_name(&procedure.name),
            fake_parameters.join(", ")
        );
        let results = connection.execute_reader(&batch, &[])?;
        let shape = first_result(results);
        procedure.result_sets.push(SprocResultSet {
            columns: shape.columns,
        });
    }

    debug!("Discovered {} stored procedures", procedures.len());
    Ok(procedures)
}
