//! Core abstractions for the dialect adapter.
//!
//! This module provides the foundational types and traits used throughout
//! the adapter:
//!
//! - [`schema`]: Table, column, key, and stored-procedure metadata types
//! - [`value`]: Portable value representation with efficient memory usage
//! - [`traits`]: Driver-facing traits and execution data carriers
//! - [`registry`]: Driver registry for dependency injection
//!
//! # Architecture
//!
//! The core module defines driver-agnostic abstractions that concrete client
//! bindings implement. This separation enables:
//!
//! - **Extensibility**: New client libraries can be added without modifying core code
//! - **Testability**: Adapter logic can be tested with mock connections
//! - **Maintainability**: Clear boundaries between dialect and driver code

pub mod registry;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use registry::DriverRegistry;
pub use schema::{
    ArgumentDirection, Column, ForeignKey, Index, PrimaryKey, ResultColumn, SprocArgument,
    SprocResultSet, StoredProcedure, Table,
};
pub use traits::{
    BackendConnection, BackendDriver, BoundParameter, DbType, DerivedParameter, NativeTypeTag,
    ParameterDirection, Query, SelectResult,
};
pub use value::{Operand, PortableType, PortableValue};
