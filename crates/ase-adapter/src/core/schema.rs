//! Schema metadata for tables, columns, keys, indexes, and stored procedures.
//!
//! These types are the adapter's portable description of backend objects.
//! The schema introspector populates them from the system catalog; the
//! dialect turns them back into DDL fragments.

use serde::{Deserialize, Serialize};

use crate::core::value::{PortableType, PortableValue};

/// Column metadata.
///
/// Identity is by name; ordinal position is not part of the model. `size`
/// holds the string/byte length where that matters (0 = unbounded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Portable column type.
    pub column_type: PortableType,

    /// String/byte length; 0 means unbounded.
    pub size: i32,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Whether the column participates in the table's primary key.
    pub is_key: bool,

    /// Whether the column is an identity column.
    pub is_identity: bool,

    /// Resolved typed default value, if the catalog carried a usable one.
    ///
    /// Runtime-only; not part of serialized schema snapshots.
    #[serde(skip)]
    pub default_value: Option<PortableValue<'static>>,

    /// The backend's raw default-expression text, if any.
    pub db_default_value: Option<String>,
}

impl Column {
    /// Create a column with the given name and type; everything else defaults
    /// to a plain nullable non-key column of unbounded size.
    pub fn new(name: impl Into<String>, column_type: PortableType) -> Self {
        Self {
            name: name.into(),
            column_type,
            size: 0,
            is_nullable: true,
            is_key: false,
            is_identity: false,
            default_value: None,
            db_default_value: None,
        }
    }
}

/// Primary key metadata: an ordered set of column names.
///
/// This dialect supports only single-column keys; discovery fails rather than
/// truncating a multi-column key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Key column names, in key order.
    pub columns: Vec<String>,
}

impl PrimaryKey {
    /// Create a primary key over the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

/// Secondary index metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    /// Indexed column names, in key order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub is_unique: bool,
}

/// Foreign key metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Local column names.
    pub columns: Vec<String>,

    /// Referenced table name.
    pub ref_table: String,

    /// Referenced column names.
    pub ref_columns: Vec<String>,
}

/// Table metadata.
///
/// Built during schema discovery: the introspector appends columns, then keys,
/// indexes, and foreign keys. Treated as immutable once discovery completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Column definitions, unique by name, in catalog order.
    pub columns: Vec<Column>,

    /// Primary key, if the table has one.
    pub primary_key: Option<PrimaryKey>,

    /// Non-primary indexes.
    pub indexes: Vec<Index>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,

    /// Whether the catalog reports this object as a view.
    pub is_view: bool,
}

impl Table {
    /// Create an empty table entity with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            is_view: false,
        }
    }

    /// Append a column, keeping columns unique by name.
    ///
    /// A duplicate name is ignored; the first definition wins.
    pub fn add_column(&mut self, column: Column) {
        if self.get_column(&column.name).is_none() {
            self.columns.push(column);
        }
    }

    /// Find a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Find a column by name, mutably.
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Check if the table has a primary key.
    pub fn has_primary_key(&self) -> bool {
        self.primary_key.is_some()
    }

    /// Whether `column_name` is the sole column of this table's primary key.
    ///
    /// The DDL identity rule depends on this: IDENTITY is emitted only for an
    /// Int32/Int64 column that is a single-column primary key.
    pub fn is_single_column_pk(&self, column_name: &str) -> bool {
        match &self.primary_key {
            Some(pk) => pk.columns.len() == 1 && pk.columns[0] == column_name,
            None => false,
        }
    }
}

/// Direction of a stored-procedure argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgumentDirection {
    In,
    Out,
    InOut,
}

/// One stored-procedure argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprocArgument {
    /// Parameter name as reported by the backend.
    pub name: String,

    /// Portable type of the argument.
    pub argument_type: PortableType,

    /// Argument direction.
    pub direction: ArgumentDirection,
}

/// A name/type pair describing one column of a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultColumn {
    /// Column name.
    pub name: String,

    /// Portable column type.
    pub column_type: PortableType,
}

/// One result set shape of a stored procedure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SprocResultSet {
    /// Result columns in projection order.
    pub columns: Vec<ResultColumn>,
}

/// Stored-procedure metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProcedure {
    /// Procedure name.
    pub name: String,

    /// Arguments in declaration order.
    pub arguments: Vec<SprocArgument>,

    /// Result set shapes recovered from metadata-only execution.
    pub result_sets: Vec<SprocResultSet>,
}

impl StoredProcedure {
    /// Create an empty procedure entity with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            result_sets: Vec::new(),
        }
    }
}
