//! Core traits for driver-agnostic statement execution.
//!
//! This module defines the seam between the dialect adapter and the concrete
//! ASE client library:
//!
//! - [`BackendDriver`]: Opens connections and resolves native type codes
//! - [`BackendConnection`]: Executes statements over one open connection
//!
//! The adapter never talks to a client library directly; drivers are
//! registered by name and every statement flows through these traits. The
//! data carriers here ([`Query`], [`BoundParameter`], [`SelectResult`]) are
//! the portable shapes both sides agree on.

use crate::core::schema::ResultColumn;
use crate::core::value::PortableValue;
use crate::error::NativeError;

/// A generated SQL statement plus its positional parameter values.
///
/// `parameter_names` holds the placeholder names in the same order as
/// `parameters`; both are empty for parameterless statements.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Statement text.
    pub sql: String,
    /// Parameter values, in placeholder order.
    pub parameters: Vec<PortableValue<'static>>,
    /// Placeholder names matching `parameters` by index.
    pub parameter_names: Vec<String>,
}

impl Query {
    /// Create a parameterless query.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
            parameter_names: Vec::new(),
        }
    }

    /// Create a query with positional parameters.
    pub fn with_parameters(
        sql: impl Into<String>,
        parameters: Vec<PortableValue<'static>>,
        parameter_names: Vec<String>,
    ) -> Self {
        Self {
            sql: sql.into(),
            parameters,
            parameter_names,
        }
    }
}

/// An opaque driver-native type code.
///
/// The adapter never interprets the value; it only caches codes resolved by
/// name through [`BackendDriver::resolve_type_tag`] and hands them back when
/// binding parameters that need an explicit native type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTypeTag(pub i32);

/// One parameter bound for execution: name, converted value, and an optional
/// explicit native type the driver must use instead of inferring one.
#[derive(Debug, Clone)]
pub struct BoundParameter {
    /// Placeholder name (e.g. `@p0`).
    pub name: String,
    /// Converted parameter value.
    pub value: PortableValue<'static>,
    /// Explicit native type code, when inference would pick the wrong one.
    pub native_type: Option<NativeTypeTag>,
}

impl BoundParameter {
    /// Bind a value under the given placeholder name, leaving the native
    /// type to driver inference.
    pub fn new(name: impl Into<String>, value: PortableValue<'static>) -> Self {
        Self {
            name: name.into(),
            value,
            native_type: None,
        }
    }
}

/// One result set returned by a reader execution.
#[derive(Debug, Clone, Default)]
pub struct SelectResult {
    /// Column names and portable types, in projection order.
    pub columns: Vec<ResultColumn>,
    /// Row data; each row has one value per column.
    pub rows: Vec<Vec<PortableValue<'static>>>,
}

/// Generic parameter type reported by the driver when deriving
/// stored-procedure parameters.
///
/// This mirrors the provider-neutral type codes ADO-style drivers report;
/// the type mapper folds them into [`crate::core::value::PortableType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    AnsiString,
    AnsiStringFixedLength,
    Binary,
    Boolean,
    Byte,
    Currency,
    Date,
    DateTime,
    DateTime2,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    Object,
    SByte,
    Single,
    String,
    StringFixedLength,
    Time,
    UInt16,
    UInt32,
    UInt64,
    VarNumeric,
    Xml,
}

/// Parameter direction reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterDirection {
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

/// One stored-procedure parameter as derived by the driver.
#[derive(Debug, Clone)]
pub struct DerivedParameter {
    /// Parameter name as reported by the backend (e.g. `@customer_id`).
    pub name: String,
    /// Generic parameter type.
    pub db_type: DbType,
    /// Parameter direction.
    pub direction: ParameterDirection,
}

/// Factory for backend connections.
///
/// One driver is registered per client library; the provider looks it up by
/// the `Provider` marker in the connection string and uses it both to open
/// connections and to resolve the native type codes the binder caches.
pub trait BackendDriver: Send + Sync {
    /// Driver identifier used as the registry key (e.g. "AseClient").
    fn name(&self) -> &str;

    /// Open a connection. The connection string has already had the
    /// `Provider` marker stripped.
    ///
    /// Opening is eager: a returned connection is open and usable.
    fn create_connection(
        &self,
        connection_string: &str,
    ) -> Result<Box<dyn BackendConnection>, NativeError>;

    /// Resolve a native type code by its driver-side name
    /// (e.g. "Decimal", "Image", "Unitext", "UniVarChar").
    ///
    /// Returns None if the driver does not expose such a type.
    fn resolve_type_tag(&self, type_name: &str) -> Option<NativeTypeTag>;
}

impl std::fmt::Debug for dyn BackendDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendDriver")
            .field("name", &self.name())
            .finish()
    }
}

/// One open backend connection.
///
/// Executions are synchronous and serial; the provider owns the connection
/// exclusively and never shares it across threads mid-statement.
pub trait BackendConnection: Send {
    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;

    /// Close the connection. Closing an already-closed connection is a no-op.
    fn close(&mut self);

    /// Execute a statement and return every result set it produces.
    fn execute_reader(
        &mut self,
        sql: &str,
        parameters: &[BoundParameter],
    ) -> Result<Vec<SelectResult>, NativeError>;

    /// Execute a statement and return the first column of the first row of
    /// the first result set, or None if there is no row.
    fn execute_scalar(
        &mut self,
        sql: &str,
        parameters: &[BoundParameter],
    ) -> Result<Option<PortableValue<'static>>, NativeError>;

    /// Execute a statement and return the affected row count.
    fn execute_non_query(
        &mut self,
        sql: &str,
        parameters: &[BoundParameter],
    ) -> Result<u64, NativeError>;

    /// Ask the backend for the declared parameters of a stored procedure.
    fn derive_parameters(&mut self, procedure: &str)
        -> Result<Vec<DerivedParameter>, NativeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_constructors() {
        let q = Query::new("select 1");
        assert_eq!(q.sql, "select 1");
        assert!(q.parameters.is_empty());
        assert!(q.parameter_names.is_empty());

        let q = Query::with_parameters(
            "select * from t where id = @p0",
            vec![PortableValue::Int32(7)],
            vec!["@p0".to_string()],
        );
        assert_eq!(q.parameters.len(), 1);
        assert_eq!(q.parameter_names[0], "@p0");
    }

    #[test]
    fn test_native_type_tag_is_comparable() {
        assert_eq!(NativeTypeTag(10), NativeTypeTag(10));
        assert_ne!(NativeTypeTag(10), NativeTypeTag(11));
    }
}
