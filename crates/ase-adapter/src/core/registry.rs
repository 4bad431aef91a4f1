//! Driver registry for explicit dependency injection.
//!
//! The [`DriverRegistry`] maps provider marker values (the `Provider=` key of
//! a connection string) to [`BackendDriver`] implementations. Unlike global
//! singletons, it is explicitly constructed and handed to the provider,
//! enabling better testability and deterministic initialization.
//!
//! # Design Rationale
//!
//! - **No global state**: Avoids linkme/inventory crate magic
//! - **Explicit registration**: Clear, deterministic initialization order
//! - **Testable**: Easy to create mock registries for testing

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AseError, Result};

use super::traits::BackendDriver;

/// Registry of backend drivers keyed by provider marker.
///
/// The registry is explicitly constructed and passed to the provider rather
/// than discovered through global singletons. The key for each driver is its
/// own [`BackendDriver::name`], which must match the `Provider` value of the
/// connection strings meant for it.
///
/// # Example
///
/// ```rust,ignore
/// let mut registry = DriverRegistry::new();
/// registry.register(AseClientDriver::new());
///
/// let provider = AseProvider::open(&registry, connection_string, options)?;
/// ```
#[derive(Default)]
pub struct DriverRegistry {
    /// Registered drivers by provider marker.
    drivers: HashMap<String, Arc<dyn BackendDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under its own name.
    pub fn register(&mut self, driver: impl BackendDriver + 'static) {
        let key = driver.name().to_string();
        self.drivers.insert(key, Arc::new(driver));
    }

    /// Register a driver as an Arc (for sharing).
    pub fn register_arc(&mut self, driver: Arc<dyn BackendDriver>) {
        let key = driver.name().to_string();
        self.drivers.insert(key, driver);
    }

    /// Get a driver by provider marker.
    pub fn get(&self, name: &str) -> Option<Arc<dyn BackendDriver>> {
        self.drivers.get(name).cloned()
    }

    /// Get a driver by provider marker, returning an error if not found.
    pub fn require(&self, name: &str) -> Result<Arc<dyn BackendDriver>> {
        self.get(name)
            .ok_or_else(|| AseError::Binding(format!("Unknown provider: {}", name)))
    }

    /// Check if a driver is registered.
    pub fn has(&self, name: &str) -> bool {
        self.drivers.contains_key(name)
    }

    /// Get all registered provider markers.
    pub fn driver_names(&self) -> Vec<&str> {
        self.drivers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}
