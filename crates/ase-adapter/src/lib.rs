//! # ase-adapter
//!
//! SAP ASE (Sybase) dialect adapter for a generic data-access engine.
//!
//! The adapter owns everything that is specific to the ASE product so the
//! engine above it never has to know the backend:
//!
//! - **Dialect SQL generation** for DDL column clauses, DML skeletons,
//!   operators, and the canonical function catalog
//! - **Schema introspection** over the `sysobjects`/`syscolumns` catalog,
//!   including stored-procedure argument and result-set shapes
//! - **Type mapping** between portable column types and native type codes,
//!   with parameter widening and native tag selection
//! - **Driver binding** through an explicit registry, so no client library
//!   is referenced at compile time
//! - **Error classification** of server error codes into the semantic
//!   categories the engine acts on
//!
//! ## Example
//!
//! ```rust,no_run
//! use ase_adapter::{AdapterOptions, AseProvider, ConnectionSettings, DriverRegistry, Table};
//!
//! fn main() -> ase_adapter::Result<()> {
//!     let registry = DriverRegistry::new();
//!     // registry.register(...) the client binding for the AseClient marker
//!
//!     let settings = ConnectionSettings::new("dbhost", "Northwind", "sa", "secret");
//!     let mut provider = AseProvider::open(
//!         &registry,
//!         &settings.connection_string(),
//!         AdapterOptions::default(),
//!     )?;
//!
//!     let mut table = Table::new("Customers");
//!     provider.get_table_schema(&mut table, true, true)?;
//!     println!("{} has {} columns", table.name, table.columns.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod error;
pub mod introspect;
pub mod provider;
pub mod typemap;

// Re-exports for convenient access
pub use crate::core::{
    ArgumentDirection, BackendConnection, BackendDriver, BoundParameter, Column, DriverRegistry,
    ForeignKey, Index, NativeTypeTag, Operand, PortableType, PortableValue, PrimaryKey, Query,
    SelectResult, SprocArgument, SprocResultSet, StoredProcedure, Table,
};
pub use config::{AdapterOptions, AutoCreateOption, ConnectionSettings, ConnectionStringParser};
pub use error::{AseError, NativeError, Result};
pub use provider::AseProvider;
