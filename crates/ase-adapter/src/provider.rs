//! Connection lifecycle and statement execution.
//!
//! [`AseProvider`] owns one backend connection resolved through the driver
//! registry. It prepares outgoing parameters (widening values and attaching
//! native type tags), routes every driver error through the classifier
//! exactly once, and creates a missing database on first open when the
//! options allow it.

use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::config::{AdapterOptions, ConnectionStringParser, PROVIDER_KEY};
use crate::core::registry::DriverRegistry;
use crate::core::schema::{StoredProcedure, Table};
use crate::core::traits::{
    BackendConnection, BackendDriver, BoundParameter, NativeTypeTag, Query, SelectResult,
};
use crate::core::value::PortableValue;
use crate::dialect::format_constant;
use crate::error::{classify_native, AseError, NativeError, Result};
use crate::introspect;
use crate::typemap::{native_tag_kind, widen_for_binding, NativeTagKind};

/// Server error raised when the target database does not exist.
const MISSING_DATABASE: i32 = 911;

/// Native type codes resolved from the driver, cached for the provider's
/// lifetime.
#[derive(Debug, Clone, Copy)]
struct NativeTags {
    decimal: NativeTypeTag,
    image: NativeTypeTag,
    unitext: NativeTypeTag,
    univarchar: NativeTypeTag,
}

impl NativeTags {
    fn tag(&self, kind: NativeTagKind) -> NativeTypeTag {
        match kind {
            NativeTagKind::Decimal => self.decimal,
            NativeTagKind::Image => self.image,
            NativeTagKind::Unitext => self.unitext,
            NativeTagKind::UniVarChar => self.univarchar,
        }
    }
}

/// The ASE dialect provider: one open backend connection plus the statement
/// and catalog services built on it.
pub struct AseProvider {
    driver: Arc<dyn BackendDriver>,
    connection: Box<dyn BackendConnection>,
    options: AdapterOptions,
    tags: OnceLock<NativeTags>,
}

impl std::fmt::Debug for AseProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AseProvider")
            .field("driver", &self.driver)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl AseProvider {
    /// Open a provider for the given connection string.
    ///
    /// The string's `Provider` part selects the driver from the registry and
    /// is stripped before the string reaches the driver. Pooling is forced
    /// off; the provider owns its connection exclusively. A missing database
    /// (server error 911) is created on the fly when the options allow it;
    /// any other open failure becomes [`AseError::UnableToOpenDatabase`].
    pub fn open(
        registry: &DriverRegistry,
        connection_string: &str,
        options: AdapterOptions,
    ) -> Result<Self> {
        let mut parser = ConnectionStringParser::parse(connection_string);
        let marker = parser.remove_part(PROVIDER_KEY).ok_or_else(|| {
            AseError::ConnectionString(format!(
                "Missing {} part: {}",
                PROVIDER_KEY,
                without_password(connection_string)
            ))
        })?;
        let driver = registry.require(&marker)?;

        parser.remove_part("Pooling");
        let probe_string = format!("{};Pooling=false", parser.compose());

        let connection = match driver.create_connection(&probe_string) {
            Ok(connection) => connection,
            Err(error) => {
                if error.first_error_number() == Some(MISSING_DATABASE)
                    && options.auto_create.can_create_database()
                {
                    create_missing_database(driver.as_ref(), &probe_string)?;
                    driver.create_connection(&probe_string).map_err(|source| {
                        AseError::UnableToOpenDatabase {
                            connection_string: without_password(connection_string),
                            source,
                        }
                    })?
                } else {
                    return Err(AseError::UnableToOpenDatabase {
                        connection_string: without_password(connection_string),
                        source: error,
                    });
                }
            }
        };
        info!("Opened connection through {} driver", marker);

        Ok(Self {
            driver,
            connection,
            options,
            tags: OnceLock::new(),
        })
    }

    /// Whether the underlying connection is open.
    pub fn is_open(&self) -> bool {
        self.connection.is_open()
    }

    /// Close the underlying connection.
    pub fn close(&mut self) {
        self.connection.close();
    }

    /// The options this provider was opened with.
    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Whether schema DDL must run inside an explicit transaction.
    pub fn schema_update_runs_in_transaction(&self) -> bool {
        self.options.schema_update_runs_in_transaction()
    }

    /// Execute a query and return every result set it produces.
    pub fn execute_reader(&mut self, query: &Query) -> Result<Vec<SelectResult>> {
        let parameters = self.prepare_parameters(query)?;
        debug!("Executing reader: {}", query.sql);
        let result = self.connection.execute_reader(&query.sql, &parameters);
        result.map_err(|e| self.wrap_native(e, &query.sql, &parameters))
    }

    /// Execute a query and return the first scalar, if any.
    pub fn execute_scalar(&mut self, query: &Query) -> Result<Option<PortableValue<'static>>> {
        let parameters = self.prepare_parameters(query)?;
        debug!("Executing scalar: {}", query.sql);
        let result = self.connection.execute_scalar(&query.sql, &parameters);
        result.map_err(|e| self.wrap_native(e, &query.sql, &parameters))
    }

    /// Execute a statement and return the affected row count.
    pub fn execute_non_query(&mut self, query: &Query) -> Result<u64> {
        let parameters = self.prepare_parameters(query)?;
        debug!("Executing statement: {}", query.sql);
        let result = self.connection.execute_non_query(&query.sql, &parameters);
        result.map_err(|e| self.wrap_native(e, &query.sql, &parameters))
    }

    /// Execute an insert and read back the identity value it generated.
    ///
    /// The identity select is appended to the statement so both run in the
    /// same batch, against the same session state.
    pub fn execute_with_identity(&mut self, query: &Query) -> Result<i64> {
        let batch = Query::with_parameters(
            format!("{}\nselect @@Identity", query.sql),
            query.parameters.clone(),
            query.parameter_names.clone(),
        );
        let value = self.execute_scalar(&batch)?;
        value
            .as_ref()
            .and_then(PortableValue::to_i64)
            .ok_or_else(|| AseError::catalog("Identity select returned no value"))
    }

    /// Load full schema metadata for `table` from the catalog.
    pub fn get_table_schema(
        &mut self,
        table: &mut Table,
        check_indexes: bool,
        check_foreign_keys: bool,
    ) -> Result<()> {
        let result = introspect::get_table_schema(
            self.connection.as_mut(),
            table,
            check_indexes,
            check_foreign_keys,
        );
        result.map_err(|e| self.classify_catalog(e))
    }

    /// Report which of `tables` do not exist yet, flagging existing views.
    pub fn collect_tables_to_create(&mut self, tables: &mut [Table]) -> Result<Vec<usize>> {
        let result = introspect::collect_tables_to_create(self.connection.as_mut(), tables);
        result.map_err(|e| self.classify_catalog(e))
    }

    /// List the storage object names visible in this database.
    pub fn storage_tables(&mut self, include_views: bool) -> Result<Vec<String>> {
        let result = introspect::storage_tables(self.connection.as_mut(), include_views);
        result.map_err(|e| self.classify_catalog(e))
    }

    /// Drop every foreign-key constraint, then every user table.
    pub fn clear_database(&mut self) -> Result<()> {
        let result = introspect::clear_database(self.connection.as_mut());
        result.map_err(|e| self.classify_catalog(e))
    }

    /// Discover stored procedures with their arguments and result shapes.
    pub fn stored_procedures(&mut self) -> Result<Vec<StoredProcedure>> {
        let result = introspect::stored_procedures(self.connection.as_mut());
        result.map_err(|e| self.classify_catalog(e))
    }

    /// Convert query values into driver-bindable parameters.
    ///
    /// Values are widened to shapes the wire protocol can carry, and decimal,
    /// binary, and string values get an explicit native type tag so the
    /// driver does not infer the wrong one.
    fn prepare_parameters(&mut self, query: &Query) -> Result<Vec<BoundParameter>> {
        let mut bound = Vec::with_capacity(query.parameters.len());
        for (index, value) in query.parameters.iter().enumerate() {
            let name = match query.parameter_names.get(index) {
                Some(name) => name.clone(),
                None => format!("@p{}", index),
            };
            let value = widen_for_binding(value.clone());
            let native_type = match native_tag_kind(&value) {
                Some(kind) => Some(self.native_tags()?.tag(kind)),
                None => None,
            };
            bound.push(BoundParameter {
                name,
                value,
                native_type,
            });
        }
        Ok(bound)
    }

    /// Resolve the native type tags once; later calls reuse the cached set.
    ///
    /// A tag the driver cannot resolve is a binding error: the driver cannot
    /// bind the parameter shapes this dialect produces.
    fn native_tags(&self) -> Result<NativeTags> {
        if let Some(tags) = self.tags.get() {
            return Ok(*tags);
        }
        let tags = NativeTags {
            decimal: self.resolve_tag(NativeTagKind::Decimal)?,
            image: self.resolve_tag(NativeTagKind::Image)?,
            unitext: self.resolve_tag(NativeTagKind::Unitext)?,
            univarchar: self.resolve_tag(NativeTagKind::UniVarChar)?,
        };
        Ok(*self.tags.get_or_init(|| tags))
    }

    fn resolve_tag(&self, kind: NativeTagKind) -> Result<NativeTypeTag> {
        self.driver
            .resolve_type_tag(kind.type_name())
            .ok_or_else(|| {
                AseError::binding(format!(
                    "Driver {} does not expose native type {}",
                    self.driver.name(),
                    kind.type_name()
                ))
            })
    }

    /// Classify a driver error, closing the connection when the
    /// classification says it is broken.
    fn wrap_native(
        &mut self,
        error: NativeError,
        statement: &str,
        parameters: &[BoundParameter],
    ) -> AseError {
        let classified = classify_native(error, statement, &describe_parameters(parameters));
        if classified.is_connection_broken() {
            self.connection.close();
        }
        classified
    }

    /// Catalog helpers return unclassified driver errors; classify them at
    /// the boundary like any other statement failure.
    fn classify_catalog(&mut self, error: AseError) -> AseError {
        match error {
            AseError::Native(native) => {
                let classified = classify_native(native, "", "");
                if classified.is_connection_broken() {
                    self.connection.close();
                }
                classified
            }
            other => other,
        }
    }
}

/// Connect at server level and create the missing database, enabling the
/// server option that allows DDL inside transactions for it. The transient
/// connection is closed on every path.
fn create_missing_database(driver: &dyn BackendDriver, probe_string: &str) -> Result<()> {
    let mut parser = ConnectionStringParser::parse(probe_string);
    let database = parser
        .remove_part("Initial Catalog")
        .ok_or_else(|| AseError::ConnectionString("Missing Initial Catalog part".to_string()))?;
    info!("Creating missing database {}", database);

    let mut server = driver.create_connection(&parser.compose())?;
    let created = server
        .execute_non_query(&format!("Create Database {}", database), &[])
        .and_then(|_| {
            server.execute_non_query(
                &format!(
                    "exec master.dbo.sp_dboption {}, 'ddl in tran', true",
                    database
                ),
                &[],
            )
        });
    server.close();
    created?;
    Ok(())
}

/// Redact the password part for error text and logs.
fn without_password(connection_string: &str) -> String {
    let mut parser = ConnectionStringParser::parse(connection_string);
    parser.remove_part("Password");
    parser.compose()
}

/// Render bound parameters as `name = literal` pairs for error text.
fn describe_parameters(parameters: &[BoundParameter]) -> String {
    parameters
        .iter()
        .map(|p| {
            let value = format_constant(&p.value).unwrap_or_else(|_| "<binary>".to_string());
            format!("{} = {}", p.name, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
